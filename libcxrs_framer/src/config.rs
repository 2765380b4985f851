use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::aligner::TimeBase;
use super::constants::{
    DEFAULT_NUM_SAMPLES, DEFAULT_SEED, PROFILE_SIGNALS, STORE_DIR_NAME, VOLUME_SIGNALS,
    WAVELENGTH_SIGNAL,
};
use super::error::ConfigError;
use super::sampler::SampleMethod;

/// A variable name paired with the source signal it is loaded from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSpec {
    pub name: String,
    pub signal: String,
}

impl SignalSpec {
    pub fn new(name: &str, signal: &str) -> Self {
        Self {
            name: name.to_string(),
            signal: signal.to_string(),
        }
    }
}

/// Structure representing the application configuration. Contains pathing, shot range
/// and sampling information.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub output_path: PathBuf,
    pub source_path: PathBuf,
    pub first_shot: i64,
    pub last_shot: i64,
    pub sample_method: SampleMethod,
    pub num_samples: usize,
    pub seed: u64,
    pub overwrite: bool,
    pub time_base: TimeBase,
    pub wavelength_signal: String,
    pub profiles: Vec<SignalSpec>,
    pub volumes: Vec<SignalSpec>,
}

impl Default for Config {
    /// Generate a new Config object with the standard time base and signal catalogue.
    /// The source path and shot range are empty/invalid
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("."),
            source_path: PathBuf::from("None"),
            first_shot: 0,
            last_shot: 0,
            sample_method: SampleMethod::default(),
            num_samples: DEFAULT_NUM_SAMPLES,
            seed: DEFAULT_SEED,
            overwrite: false,
            time_base: TimeBase::default(),
            wavelength_signal: String::from(WAVELENGTH_SIGNAL),
            profiles: PROFILE_SIGNALS
                .iter()
                .map(|(name, signal)| SignalSpec::new(name, signal))
                .collect(),
            volumes: VOLUME_SIGNALS
                .iter()
                .map(|(name, signal)| SignalSpec::new(name, signal))
                .collect(),
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Write the configuration to a YAML file
    pub fn write_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        let yaml_str = serde_yaml::to_string(self)?;
        std::fs::write(config_path, yaml_str)?;
        Ok(())
    }

    /// Check the shot range, sample count and time base
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.first_shot > self.last_shot || self.shot_count().is_none() {
            return Err(ConfigError::BadShotRange(self.first_shot, self.last_shot));
        }
        if self.num_samples < 1 {
            return Err(ConfigError::BadSampleCount);
        }
        self.time_base.validate()
    }

    /// Shots to process, inclusive on both ends
    pub fn shots(&self) -> std::ops::RangeInclusive<i64> {
        self.first_shot..=self.last_shot
    }

    /// None when the range is inverted or its length does not fit in a usize
    fn shot_count(&self) -> Option<usize> {
        let span = self.last_shot.checked_sub(self.first_shot)?;
        usize::try_from(span).ok()?.checked_add(1)
    }

    /// Number of shots in the range; 0 for a range which does not validate
    pub fn n_shots(&self) -> usize {
        self.shot_count().unwrap_or(0)
    }

    /// Get the path to the append store
    pub fn get_store_path(&self) -> PathBuf {
        self.output_path.join(STORE_DIR_NAME)
    }
}
