// Archive layout
// <root>/
// |---- <shot_id>.h5
// |    |---- act
// |    |    |---- cel3
// |    |    |    |---- ss
// |    |    |    |    |---- counts
// |    |    |    |    |    |---- data(dset)
// |    |    |    |    |    |---- errors(dset), optional
// |    |    |    |    |    |---- dim_0(dset) ... dim_<rank-1>(dset)
//
// Signal ids are case-insensitive and a leading slash is ignored, so
// ACT/CEL3/SS/COUNTS and /act/cel3/ss/counts name the same group.
use hdf5::{File, Group};
use ndarray::ArrayD;
use std::path::{Path, PathBuf};

use super::error::SourceError;
use super::signal::{SampledSignal, SignalSource};

const DATA_NAME: &str = "data";
const ERRORS_NAME: &str = "errors";

/// A signal source backed by a local archive of per-shot HDF5 files
#[derive(Debug, Clone)]
pub struct Hdf5Source {
    root: PathBuf,
}

fn unavailable(signal_id: &str, shot_id: i64, reason: String) -> SourceError {
    SourceError::Unavailable {
        signal: signal_id.to_string(),
        shot: shot_id,
        reason,
    }
}

fn group_path(signal_id: &str) -> Vec<String> {
    signal_id
        .trim_start_matches('/')
        .split('/')
        .filter(|part| !part.is_empty())
        .map(|part| part.to_lowercase())
        .collect()
}

impl Hdf5Source {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Path to the archive file of a shot
    pub fn shot_file(&self, shot_id: i64) -> PathBuf {
        self.root.join(format!("{shot_id}.h5"))
    }

    /// Walk to the group of a signal; None if any part of the path is missing
    fn find_group(
        file: &File,
        signal_id: &str,
        shot_id: i64,
    ) -> Result<Option<Group>, SourceError> {
        let mut group: Group = file.group("/")?;
        for part in group_path(signal_id) {
            if !group.link_exists(&part) {
                return Ok(None);
            }
            group = group.group(&part).map_err(|e| {
                unavailable(signal_id, shot_id, format!("{part} is not a group: {e}"))
            })?;
        }
        Ok(Some(group))
    }

    fn read_group(
        group: &Group,
        signal_id: &str,
        shot_id: i64,
    ) -> Result<SampledSignal, SourceError> {
        let malformed = |what: &str, e: hdf5::Error| {
            unavailable(signal_id, shot_id, format!("bad {what}: {e}"))
        };
        if !group.link_exists(DATA_NAME) {
            return Err(unavailable(
                signal_id,
                shot_id,
                String::from("signal group has no data"),
            ));
        }
        let value = group
            .dataset(DATA_NAME)
            .and_then(|dset| dset.read_dyn::<f64>())
            .map_err(|e| malformed(DATA_NAME, e))?;
        let error = if group.link_exists(ERRORS_NAME) {
            group
                .dataset(ERRORS_NAME)
                .and_then(|dset| dset.read_dyn::<f64>())
                .map_err(|e| malformed(ERRORS_NAME, e))?
        } else {
            ArrayD::zeros(value.raw_dim())
        };

        let mut dims = Vec::with_capacity(value.ndim());
        for axis in 0..value.ndim() {
            let dim_name = format!("dim_{axis}");
            if !group.link_exists(&dim_name) {
                return Err(unavailable(
                    signal_id,
                    shot_id,
                    format!("signal group has no {dim_name}"),
                ));
            }
            let coord = group
                .dataset(&dim_name)
                .and_then(|dset| dset.read_1d::<f64>())
                .map_err(|e| malformed(&dim_name, e))?;
            dims.push(coord);
        }
        Ok(SampledSignal::new(value, error, dims))
    }

    /// Store a signal in the archive, creating the shot file and groups as needed
    pub fn write_signal(
        &self,
        signal_id: &str,
        shot_id: i64,
        signal: &SampledSignal,
    ) -> Result<(), SourceError> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.shot_file(shot_id);
        let file = if path.exists() {
            File::open_rw(&path)?
        } else {
            File::create(&path)?
        };
        let mut group: Group = file.group("/")?;
        for part in group_path(signal_id) {
            group = match group.link_exists(&part) {
                true => group.group(&part)?,
                false => group.create_group(&part)?,
            };
        }
        group
            .new_dataset_builder()
            .with_data(&signal.value)
            .create(DATA_NAME)?;
        group
            .new_dataset_builder()
            .with_data(&signal.error)
            .create(ERRORS_NAME)?;
        for (axis, coord) in signal.dims.iter().enumerate() {
            group
                .new_dataset_builder()
                .with_data(coord)
                .create(format!("dim_{axis}").as_str())?;
        }
        Ok(())
    }
}

impl SignalSource for Hdf5Source {
    fn fetch(&self, signal_id: &str, shot_id: i64) -> Result<SampledSignal, SourceError> {
        let not_found = || SourceError::NotFound {
            signal: signal_id.to_string(),
            shot: shot_id,
        };
        let path = self.shot_file(shot_id);
        if !path.exists() {
            return Err(not_found());
        }
        let file = File::open(&path)?;
        match Self::find_group(&file, signal_id, shot_id)? {
            Some(group) => Self::read_group(&group, signal_id, shot_id),
            None => Err(not_found()),
        }
    }
}
