// Store layout
// <destination>/
// |---- schema.yml         StoreSchema, written once the first shot is complete
// |---- data.h5            version
// |    |---- shot_id(dset)             [shot], resizable
// |    |---- time(dset)                [time]
// |    |---- major_radius(dset)        [major_radius]
// |    |---- wavelength(dset)          [wavelength], only with volume variables
// |    |---- <name>_value(dset) - dims [shot, time, major_radius(, wavelength)], resizable
// |    |---- <name>_error(dset) - dims
//
// Variables are chunked one shot per chunk. The shot_id dataset is extended last, so its
// length is the number of complete shots.
use hdf5::types::VarLenUnicode;
use hdf5::File;
use ndarray::{s, Array1, ArrayD, ArrayView1, ArrayViewD, Axis, Ix3, Ix4, Slice};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::constants::{
    ERROR_SUFFIX, FORMAT_VERSION, RADIUS_AXIS, SHOT_AXIS, SHOT_CHUNK, STORE_DATA_NAME,
    STORE_SCHEMA_NAME, TIME_AXIS, VALUE_SUFFIX, WAVELENGTH_AXIS,
};
use super::dataset::{same_coordinates, Dataset, Layout, Measurement};
use super::error::StoreError;
use super::merger::ShotDataset;

/// Name and layout of one measurement in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSchema {
    pub name: String,
    pub layout: Layout,
}

impl VariableSchema {
    pub fn value_name(&self) -> String {
        format!("{}_{}", self.name, VALUE_SUFFIX)
    }

    pub fn error_name(&self) -> String {
        format!("{}_{}", self.name, ERROR_SUFFIX)
    }
}

/// Everything about a store which must be identical for every shot appended to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSchema {
    pub version: String,
    pub time: Vec<f64>,
    pub major_radius: Vec<f64>,
    pub wavelength: Option<Vec<f64>>,
    pub variables: Vec<VariableSchema>,
}

fn describe(variables: &[VariableSchema]) -> String {
    variables
        .iter()
        .map(|v| format!("{}({:?})", v.name, v.layout))
        .collect::<Vec<String>>()
        .join(", ")
}

impl StoreSchema {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut variables: Vec<VariableSchema> = dataset
            .measurements()
            .iter()
            .map(|m| VariableSchema {
                name: m.name().to_string(),
                layout: m.layout(),
            })
            .collect();
        variables.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            version: String::from(FORMAT_VERSION),
            time: dataset.time().to_vec(),
            major_radius: dataset.major_radius().to_vec(),
            wavelength: dataset.wavelength().map(|w| w.to_vec()),
            variables,
        }
    }

    /// Check that a shot with schema `incoming` can be appended to a store with this
    /// schema. Variable sets and layouts must match and every coordinate must be
    /// bit-identical.
    pub fn check_compatible(&self, incoming: &StoreSchema) -> Result<(), StoreError> {
        if self.version != incoming.version {
            return Err(StoreError::SchemaMismatch(format!(
                "store format {} cannot take data of format {}",
                self.version, incoming.version
            )));
        }
        if self.variables != incoming.variables {
            return Err(StoreError::SchemaMismatch(format!(
                "store has variables [{}] but shot has [{}]",
                describe(&self.variables),
                describe(&incoming.variables)
            )));
        }
        check_axis(TIME_AXIS, &self.time, &incoming.time)?;
        check_axis(RADIUS_AXIS, &self.major_radius, &incoming.major_radius)?;
        match (&self.wavelength, &incoming.wavelength) {
            (Some(ours), Some(theirs)) => check_axis(WAVELENGTH_AXIS, ours, theirs),
            (None, None) => Ok(()),
            _ => Err(StoreError::SchemaMismatch(String::from(
                "wavelength axis present on only one side",
            ))),
        }
    }

    pub fn variable(&self, name: &str) -> Option<&VariableSchema> {
        self.variables.iter().find(|v| v.name == name)
    }

    fn dims_of(&self, layout: Layout) -> Vec<usize> {
        let mut dims = vec![self.time.len(), self.major_radius.len()];
        if layout == Layout::Volume {
            dims.push(self.wavelength.as_ref().map(|w| w.len()).unwrap_or_default());
        }
        dims
    }
}

fn check_axis(axis: &str, ours: &[f64], theirs: &[f64]) -> Result<(), StoreError> {
    if same_coordinates(ours, theirs) {
        Ok(())
    } else {
        Err(StoreError::SchemaMismatch(format!(
            "{axis} coordinate differs from the store ({} points in store, {} in shot)",
            ours.len(),
            theirs.len()
        )))
    }
}

/// Result of the single existence check of a destination
#[derive(Debug, Clone, PartialEq)]
pub enum StoreState {
    Absent,
    Present(StoreSchema),
}

/// The cumulative, append-only store of merged shots.
///
/// Not transactional: a crash during an append can leave variables extended without the
/// matching shot_id entry. Such a slot is not counted as a shot and is overwritten by
/// the next append.
#[derive(Debug)]
pub struct AppendStore {
    path: PathBuf,
    schema: StoreSchema,
    file_handle: File,
}

impl AppendStore {
    /// Classify a destination as Absent or Present. Only the schema file decides.
    pub fn inspect(path: &Path) -> Result<StoreState, StoreError> {
        let schema_path = path.join(STORE_SCHEMA_NAME);
        if !schema_path.exists() {
            return Ok(StoreState::Absent);
        }
        let yaml_str = std::fs::read_to_string(schema_path)?;
        Ok(StoreState::Present(serde_yaml::from_str::<StoreSchema>(
            &yaml_str,
        )?))
    }

    /// Open an existing store read-only
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        match Self::inspect(path)? {
            StoreState::Absent => Err(StoreError::BadFilePath(path.to_path_buf())),
            StoreState::Present(schema) => Ok(Self {
                path: path.to_path_buf(),
                schema,
                file_handle: File::open(path.join(STORE_DATA_NAME))?,
            }),
        }
    }

    fn open_rw(path: &Path, schema: StoreSchema) -> Result<Self, StoreError> {
        Ok(Self {
            path: path.to_path_buf(),
            schema,
            file_handle: File::open_rw(path.join(STORE_DATA_NAME))?,
        })
    }

    /// Create a new store laid out for the schema of `shot` and write `shot` into it
    pub fn create(path: &Path, shot: &ShotDataset) -> Result<Self, StoreError> {
        std::fs::create_dir_all(path)?;
        let schema = StoreSchema::from_dataset(&shot.dataset);
        let file_handle = File::create(path.join(STORE_DATA_NAME))?;

        let version = format!("{}:{}", env!("CARGO_PKG_NAME"), FORMAT_VERSION);
        file_handle
            .new_attr::<VarLenUnicode>()
            .create("version")?
            .write_scalar(&VarLenUnicode::from_str(&version)?)?;

        file_handle
            .new_dataset::<i64>()
            .shape((0..,))
            .chunk((SHOT_CHUNK,))
            .create(SHOT_AXIS)?;
        file_handle
            .new_dataset_builder()
            .with_data(shot.dataset.time())
            .create(TIME_AXIS)?;
        file_handle
            .new_dataset_builder()
            .with_data(shot.dataset.major_radius())
            .create(RADIUS_AXIS)?;
        if let Some(wavelength) = shot.dataset.wavelength() {
            file_handle
                .new_dataset_builder()
                .with_data(wavelength)
                .create(WAVELENGTH_AXIS)?;
        }

        for variable in schema.variables.iter() {
            let dims = schema.dims_of(variable.layout);
            let names = [variable.value_name(), variable.error_name()];
            for name in names.iter() {
                create_variable(&file_handle, name, variable.layout, &dims)?;
            }
        }

        let mut store = Self {
            path: path.to_path_buf(),
            schema,
            file_handle,
        };
        store.append(shot)?;

        std::fs::write(
            path.join(STORE_SCHEMA_NAME),
            serde_yaml::to_string(&store.schema)?,
        )?;
        spdlog::info!("Created store at {}", path.to_string_lossy());
        Ok(store)
    }

    /// Append one shot along the shot_id axis.
    ///
    /// Schema compatibility and shot uniqueness are checked before anything is written.
    pub fn append(&mut self, shot: &ShotDataset) -> Result<(), StoreError> {
        self.schema
            .check_compatible(&StoreSchema::from_dataset(&shot.dataset))?;
        let shots = self.shot_ids()?;
        if shots.contains(&shot.shot_id) {
            return Err(StoreError::DuplicateShot(shot.shot_id));
        }
        let index = shots.len();

        for measurement in shot.dataset.measurements() {
            self.append_array(
                &measurement.value_name(),
                measurement,
                shot.value_with_shot_axis(measurement),
                index,
            )?;
            self.append_array(
                &measurement.error_name(),
                measurement,
                shot.error_with_shot_axis(measurement),
                index,
            )?;
        }

        let shot_dset = self.file_handle.dataset(SHOT_AXIS)?;
        shot_dset.resize((index + 1,))?;
        let ids = [shot.shot_id];
        shot_dset.write_slice(ArrayView1::from(&ids[..]), s![index..index + 1])?;
        self.file_handle.flush()?;
        Ok(())
    }

    fn append_array(
        &self,
        name: &str,
        measurement: &Measurement,
        data: ArrayViewD<f64>,
        index: usize,
    ) -> Result<(), StoreError> {
        let dset = self.file_handle.dataset(name)?;
        let shape = dset.shape();
        match measurement.layout() {
            Layout::Profile => {
                let data = data.into_dimensionality::<Ix3>()?;
                dset.resize((index + 1, shape[1], shape[2]))?;
                dset.write_slice(data, s![index..index + 1, .., ..])?;
            }
            Layout::Volume => {
                let data = data.into_dimensionality::<Ix4>()?;
                dset.resize((index + 1, shape[1], shape[2], shape[3]))?;
                dset.write_slice(data, s![index..index + 1, .., .., ..])?;
            }
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> &StoreSchema {
        &self.schema
    }

    /// Shot ids of all complete shots, in append order
    pub fn shot_ids(&self) -> Result<Vec<i64>, StoreError> {
        Ok(self.file_handle.dataset(SHOT_AXIS)?.read_raw::<i64>()?)
    }

    pub fn time(&self) -> Array1<f64> {
        Array1::from_vec(self.schema.time.clone())
    }

    pub fn major_radius(&self) -> Array1<f64> {
        Array1::from_vec(self.schema.major_radius.clone())
    }

    pub fn wavelength(&self) -> Option<Array1<f64>> {
        self.schema.wavelength.clone().map(Array1::from_vec)
    }

    /// Read the value and error arrays of a measurement, shot_id axis first
    pub fn read_measurement(&self, name: &str) -> Result<(ArrayD<f64>, ArrayD<f64>), StoreError> {
        let variable = self
            .schema
            .variable(name)
            .ok_or_else(|| StoreError::UnknownVariable(name.to_string()))?;
        let n_shots = self.shot_ids()?.len();
        let read = |dset_name: String| -> Result<ArrayD<f64>, StoreError> {
            let data = self.file_handle.dataset(&dset_name)?.read_dyn::<f64>()?;
            Ok(data
                .slice_axis(Axis(0), Slice::from(0..n_shots))
                .to_owned())
        };
        Ok((read(variable.value_name())?, read(variable.error_name())?))
    }

    /// Size of the data file on disk
    pub fn size_bytes(&self) -> Result<u64, StoreError> {
        Ok(std::fs::metadata(self.path.join(STORE_DATA_NAME))?.len())
    }
}

fn create_variable(
    file: &File,
    name: &str,
    layout: Layout,
    dims: &[usize],
) -> Result<(), StoreError> {
    let builder = file.new_dataset::<f64>();
    let dset = match layout {
        Layout::Profile => builder
            .shape((0.., dims[0], dims[1]))
            .chunk((1, dims[0], dims[1]))
            .create(name)?,
        Layout::Volume => builder
            .shape((0.., dims[0], dims[1], dims[2]))
            .chunk((1, dims[0], dims[1], dims[2]))
            .create(name)?,
    };
    let axes: Vec<VarLenUnicode> = std::iter::once(SHOT_AXIS)
        .chain(layout.dims().iter().copied())
        .map(VarLenUnicode::from_str)
        .collect::<Result<Vec<_>, _>>()?;
    dset.new_attr::<VarLenUnicode>()
        .shape((axes.len(),))
        .create("dims")?
        .write(ArrayView1::from(axes.as_slice()))?;
    Ok(())
}

/// Persist one merged shot, creating the store on first use and appending otherwise
pub fn write(shot: &ShotDataset, destination: &Path) -> Result<(), StoreError> {
    let store = match AppendStore::inspect(destination)? {
        StoreState::Absent => AppendStore::create(destination, shot)?,
        StoreState::Present(schema) => {
            let mut store = AppendStore::open_rw(destination, schema)?;
            store.append(shot)?;
            store
        }
    };
    spdlog::info!(
        "Store now holds {} shots ({})",
        store.shot_ids()?.len(),
        human_bytes::human_bytes(store.size_bytes()? as f64)
    );
    Ok(())
}
