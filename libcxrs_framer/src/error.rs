use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Signal {signal} does not exist for shot {shot}")]
    NotFound { signal: String, shot: i64 },
    #[error("Signal {signal} for shot {shot} is unavailable: {reason}")]
    Unavailable {
        signal: String,
        shot: i64,
        reason: String,
    },
    #[error("Signal source failed due to HDF5 error: {0}")]
    HDF5Error(#[from] hdf5::Error),
    #[error("Signal source failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Clone, Error)]
pub enum DatasetError {
    #[error("Shape mismatch in {name}: {detail}")]
    ShapeMismatch { name: String, detail: String },
    #[error("Coordinate conflict on axis {axis}: {detail}")]
    CoordinateConflict { axis: &'static str, detail: String },
    #[error("No datasets were given to align")]
    NoDatasets,
}

#[derive(Debug, Clone, Error)]
pub enum SamplerError {
    #[error("Cannot select {requested} time points when only {available} are usable")]
    InsufficientSamples { requested: usize, available: usize },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store schema mismatch: {0}")]
    SchemaMismatch(String),
    #[error("Shot {0} is already present in the store")]
    DuplicateShot(i64),
    #[error("Could not open store because {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Variable {0} is not part of the store")]
    UnknownVariable(String),
    #[error("Store failed to encode a string attribute: {0}")]
    StringError(#[from] hdf5::types::StringError),
    #[error("Store failed due to HDF5 error: {0}")]
    HDF5Error(#[from] hdf5::Error),
    #[error("Store failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Store failed to convert schema to/from yaml: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Store failed to reshape an array: {0}")]
    ShapeError(#[from] ndarray::ShapeError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Invalid time base -- min: {min} max: {max} dt: {dt}")]
    BadTimeBase { min: f64, max: f64, dt: f64 },
    #[error("Invalid shot range {0} to {1}")]
    BadShotRange(i64, i64),
    #[error("Number of samples must be at least 1")]
    BadSampleCount,
    #[error("Unknown sample method {0}; expected grid or random")]
    BadSampleMethod(String),
}

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Loader failed due to source error: {0}")]
    SourceError(#[from] SourceError),
    #[error("Loader failed due to dataset error: {0}")]
    DatasetError(#[from] DatasetError),
    #[error("Loader failed due to sampler error: {0}")]
    SamplerError(#[from] SamplerError),
    #[error("Loader has no {0} signals configured")]
    EmptyCatalogue(&'static str),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Loader error: {0}")]
    LoaderError(#[from] LoaderError),
    #[error("Processor failed due to Store error: {0}")]
    StoreError(#[from] StoreError),
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to IO error: {0}")]
    IoError(#[from] std::io::Error),
}
