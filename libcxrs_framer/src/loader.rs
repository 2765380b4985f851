use ndarray::{Array1, Axis, Ix1};
use rand::Rng;

use super::aligner::align;
use super::config::{Config, SignalSpec};
use super::dataset::Dataset;
use super::error::{DatasetError, LoaderError};
use super::merger::{merge, ShotDataset};
use super::sampler::subsample;
use super::signal::{SampledSignal, SignalSource};

/// Loads every configured signal of a shot and assembles the merged shot dataset
#[derive(Debug)]
pub struct ShotLoader<'a, S: SignalSource + ?Sized> {
    source: &'a S,
    config: &'a Config,
}

impl<'a, S: SignalSource + ?Sized> ShotLoader<'a, S> {
    pub fn new(source: &'a S, config: &'a Config) -> Self {
        Self { source, config }
    }

    /// Load a radial profile, time x major_radius
    pub fn radial_profile(&self, entry: &SignalSpec, shot_id: i64) -> Result<Dataset, LoaderError> {
        spdlog::info!("Loading {} for shot {shot_id}", entry.name);
        let signal = self.source.fetch(&entry.signal, shot_id)?;
        Ok(Dataset::profile(&entry.name, signal)?)
    }

    /// The wavelength coordinate of the spectrometer; the first row when stored per channel
    pub fn wavelength(&self, shot_id: i64) -> Result<Array1<f64>, LoaderError> {
        let signal = self.source.fetch(&self.config.wavelength_signal, shot_id)?;
        let shape_error = |detail: String| DatasetError::ShapeMismatch {
            name: String::from("wavelength"),
            detail,
        };
        match signal.value.ndim() {
            1 => Ok(signal
                .value
                .into_dimensionality::<Ix1>()
                .map_err(|e| shape_error(e.to_string()))?),
            2 => {
                if signal.value.shape()[0] == 0 {
                    return Err(shape_error(String::from("wavelength signal has no rows")).into());
                }
                Ok(signal
                    .value
                    .index_axis(Axis(0), 0)
                    .to_owned()
                    .into_dimensionality::<Ix1>()
                    .map_err(|e| shape_error(e.to_string()))?)
            }
            n => Err(shape_error(format!("expected rank 1 or 2, got rank {n}")).into()),
        }
    }

    /// Load a volume, time x major_radius x wavelength, with the given wavelength coordinate
    pub fn volume_data(
        &self,
        entry: &SignalSpec,
        shot_id: i64,
        wavelength: &Array1<f64>,
    ) -> Result<Dataset, LoaderError> {
        spdlog::info!("Loading {} for shot {shot_id}", entry.name);
        let mut signal: SampledSignal = self.source.fetch(&entry.signal, shot_id)?;
        if let Some(coord) = signal.dims.get_mut(2) {
            *coord = wavelength.clone();
        }
        Ok(Dataset::volume(&entry.name, signal)?)
    }

    /// All profiles of a shot on the configured time base
    pub fn profiles(&self, shot_id: i64) -> Result<Dataset, LoaderError> {
        if self.config.profiles.is_empty() {
            return Err(LoaderError::EmptyCatalogue("profile"));
        }
        let datasets = self
            .config
            .profiles
            .iter()
            .map(|entry| self.radial_profile(entry, shot_id))
            .collect::<Result<Vec<Dataset>, LoaderError>>()?;
        Ok(align(datasets, &self.config.time_base.points())?)
    }

    /// All volumes of a shot on the configured time base
    pub fn volumes(&self, shot_id: i64) -> Result<Dataset, LoaderError> {
        if self.config.volumes.is_empty() {
            return Err(LoaderError::EmptyCatalogue("volume"));
        }
        let wavelength = self.wavelength(shot_id)?;
        let datasets = self
            .config
            .volumes
            .iter()
            .map(|entry| self.volume_data(entry, shot_id, &wavelength))
            .collect::<Result<Vec<Dataset>, LoaderError>>()?;
        Ok(align(datasets, &self.config.time_base.points())?)
    }

    /// Load, align, subsample and merge one shot
    pub fn load_dataset<R: Rng + ?Sized>(
        &self,
        shot_id: i64,
        rng: &mut R,
    ) -> Result<ShotDataset, LoaderError> {
        let profiles = self.profiles(shot_id)?;
        let volumes = self.volumes(shot_id)?;
        let volumes = subsample(
            &volumes,
            self.config.sample_method,
            self.config.num_samples,
            rng,
        )?;
        Ok(merge(profiles, volumes, shot_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aligner::TimeBase;
    use crate::error::SourceError;
    use crate::sampler::SampleMethod;
    use crate::signal::MemorySource;
    use ndarray::{array, ArrayD, IxDyn};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SHOT: i64 = 30421;

    fn config() -> Config {
        Config {
            time_base: TimeBase::new(0.0, 0.4, 0.1).unwrap(),
            num_samples: 2,
            profiles: vec![SignalSpec::new("velocity", "PVB/VELOCITY")],
            volumes: vec![SignalSpec::new("ss_counts", "SS/COUNTS")],
            wavelength_signal: String::from("/ss/wavelength"),
            ..Default::default()
        }
    }

    fn source() -> MemorySource {
        let time = array![0.0, 0.2, 0.4];
        let profile = ArrayD::from_shape_fn(IxDyn(&[3, 2]), |idx| (idx[0] * 10 + idx[1]) as f64);
        let volume = ArrayD::from_elem(IxDyn(&[3, 2, 3]), 1.0);
        MemorySource::new()
            .with_signal(
                "PVB/VELOCITY",
                SHOT,
                SampledSignal::new(
                    profile.clone(),
                    profile,
                    vec![time.clone(), array![0.8, 0.9]],
                ),
            )
            .with_signal(
                "SS/COUNTS",
                SHOT,
                SampledSignal::new(
                    volume.clone(),
                    volume,
                    vec![time.clone(), array![0.8, 0.9], array![0.0, 1.0, 2.0]],
                ),
            )
            .with_signal(
                "/ss/wavelength",
                SHOT,
                SampledSignal::new(
                    array![[529.0, 529.1, 529.2], [530.0, 530.1, 530.2]].into_dyn(),
                    ArrayD::zeros(IxDyn(&[2, 3])),
                    vec![array![0.0, 1.0], array![0.0, 1.0, 2.0]],
                ),
            )
    }

    #[test]
    fn test_wavelength_first_row() {
        let config = config();
        let source = source();
        let loader = ShotLoader::new(&source, &config);
        assert_eq!(loader.wavelength(SHOT).unwrap(), array![529.0, 529.1, 529.2]);
    }

    #[test]
    fn test_load_dataset() {
        let config = config();
        let source = source();
        let loader = ShotLoader::new(&source, &config);
        let mut rng = StdRng::seed_from_u64(42);
        let shot = loader.load_dataset(SHOT, &mut rng).unwrap();

        assert_eq!(shot.shot_id, SHOT);
        assert_eq!(shot.dataset.time(), &config.time_base.points());
        assert_eq!(shot.dataset.wavelength(), Some(&array![529.0, 529.1, 529.2]));

        let velocity = shot.dataset.measurement("velocity").unwrap();
        assert_eq!(velocity.value().shape(), &[5, 2]);
        assert_eq!(velocity.value()[[0, 1]], 1.0);

        // 5 usable points, 2 samples: stride 2 keeps t = 0.0 and t = 0.2
        let counts = shot.dataset.measurement("ss_counts").unwrap();
        assert_eq!(counts.value().shape(), &[5, 2, 3]);
        assert_eq!(counts.value()[[0, 0, 0]], 1.0);
        assert!(counts.value()[[1, 0, 0]].is_nan());
        assert_eq!(counts.value()[[2, 1, 2]], 1.0);
        assert!(counts.value()[[4, 0, 0]].is_nan());
    }

    #[test]
    fn test_random_load_is_reproducible() {
        let config = Config {
            sample_method: SampleMethod::Random,
            ..config()
        };
        let source = source();
        let loader = ShotLoader::new(&source, &config);
        let a = loader.load_dataset(SHOT, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = loader.load_dataset(SHOT, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(
            a.dataset.measurement("ss_counts").unwrap().value().mapv(f64::to_bits),
            b.dataset.measurement("ss_counts").unwrap().value().mapv(f64::to_bits)
        );
    }

    #[test]
    fn test_missing_signal() {
        let config = config();
        let source = source();
        let loader = ShotLoader::new(&source, &config);
        let mut rng = StdRng::seed_from_u64(42);
        assert!(matches!(
            loader.load_dataset(SHOT + 1, &mut rng),
            Err(LoaderError::SourceError(SourceError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_wavelength_length_mismatch() {
        let config = config();
        let mut source = source();
        source.insert(
            "/ss/wavelength",
            SHOT,
            SampledSignal::new(
                array![529.0, 529.1].into_dyn(),
                ArrayD::zeros(IxDyn(&[2])),
                vec![array![0.0, 1.0]],
            ),
        );
        let loader = ShotLoader::new(&source, &config);
        let mut rng = StdRng::seed_from_u64(42);
        assert!(matches!(
            loader.load_dataset(SHOT, &mut rng),
            Err(LoaderError::DatasetError(DatasetError::ShapeMismatch { .. }))
        ));
    }

    #[test]
    fn test_empty_catalogue() {
        let config = Config {
            volumes: Vec::new(),
            ..config()
        };
        let source = source();
        let loader = ShotLoader::new(&source, &config);
        assert!(matches!(
            loader.volumes(SHOT),
            Err(LoaderError::EmptyCatalogue("volume"))
        ));
    }
}
