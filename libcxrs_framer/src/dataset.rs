use fxhash::FxHashMap;
use ndarray::{Array1, ArrayD, Axis, IxDyn};
use serde::{Deserialize, Serialize};

use super::constants::{
    ERROR_SUFFIX, RADIUS_AXIS, TIME_AXIS, VALUE_SUFFIX, WAVELENGTH_AXIS,
};
use super::error::DatasetError;
use super::signal::SampledSignal;

const PROFILE_DIMS: [&str; 2] = [TIME_AXIS, RADIUS_AXIS];
const VOLUME_DIMS: [&str; 3] = [TIME_AXIS, RADIUS_AXIS, WAVELENGTH_AXIS];

/// The axis layout of a measurement. Time is always the first axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// (time, major_radius)
    Profile,
    /// (time, major_radius, wavelength)
    Volume,
}

impl Layout {
    pub fn dims(&self) -> &'static [&'static str] {
        match self {
            Self::Profile => &PROFILE_DIMS,
            Self::Volume => &VOLUME_DIMS,
        }
    }

    pub fn rank(&self) -> usize {
        self.dims().len()
    }
}

/// A named value array together with its uncertainty array. Both always have the same
/// shape and are indexed by the coordinates of the owning Dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    name: String,
    layout: Layout,
    value: ArrayD<f64>,
    error: ArrayD<f64>,
}

impl Measurement {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn value(&self) -> &ArrayD<f64> {
        &self.value
    }

    pub fn error(&self) -> &ArrayD<f64> {
        &self.error
    }

    /// Name of the value variable in the store, `<name>_value`
    pub fn value_name(&self) -> String {
        format!("{}_{}", self.name, VALUE_SUFFIX)
    }

    /// Name of the error variable in the store, `<name>_error`
    pub fn error_name(&self) -> String {
        format!("{}_{}", self.name, ERROR_SUFFIX)
    }

    fn select_time(&self, indices: &[usize]) -> Self {
        self.with_arrays(
            self.value.select(Axis(0), indices),
            self.error.select(Axis(0), indices),
        )
    }

    /// Same name and layout with new arrays along time. Both arrays must come from the
    /// same time mapping so their shapes agree.
    pub(crate) fn with_arrays(&self, value: ArrayD<f64>, error: ArrayD<f64>) -> Self {
        Self {
            name: self.name.clone(),
            layout: self.layout,
            value,
            error,
        }
    }

    /// True if the value or the error variable is NaN everywhere at time index `t`
    fn is_missing_at(&self, t: usize) -> bool {
        let all_nan = |array: &ArrayD<f64>| array.index_axis(Axis(0), t).iter().all(|v| v.is_nan());
        all_nan(&self.value) || all_nan(&self.error)
    }
}

/// Bit-level equality of two coordinate vectors
pub(crate) fn same_coordinates(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits())
}

fn check_coordinates(
    axis: &'static str,
    ours: &Array1<f64>,
    theirs: &Array1<f64>,
) -> Result<(), DatasetError> {
    let equal = match (ours.as_slice(), theirs.as_slice()) {
        (Some(a), Some(b)) => same_coordinates(a, b),
        _ => same_coordinates(&ours.to_vec(), &theirs.to_vec()),
    };
    if equal {
        Ok(())
    } else {
        Err(DatasetError::CoordinateConflict {
            axis,
            detail: format!(
                "coordinate values differ ({} points vs {} points)",
                ours.len(),
                theirs.len()
            ),
        })
    }
}

fn shape_mismatch(name: &str, detail: String) -> DatasetError {
    DatasetError::ShapeMismatch {
        name: name.to_string(),
        detail,
    }
}

/// A set of measurements sharing one coordinate system.
///
/// Coordinates are never modified in place; selecting, resampling, or joining always
/// produces a new Dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    time: Array1<f64>,
    major_radius: Array1<f64>,
    wavelength: Option<Array1<f64>>,
    measurements: Vec<Measurement>,
}

impl Dataset {
    /// Wrap a rank-2 (time, major_radius) signal as a profile dataset
    pub fn profile(name: &str, signal: SampledSignal) -> Result<Self, DatasetError> {
        Self::build(name, signal, Layout::Profile)
    }

    /// Wrap a rank-3 (time, major_radius, wavelength) signal as a volume dataset
    pub fn volume(name: &str, signal: SampledSignal) -> Result<Self, DatasetError> {
        Self::build(name, signal, Layout::Volume)
    }

    fn build(name: &str, signal: SampledSignal, layout: Layout) -> Result<Self, DatasetError> {
        let shape = signal.value.shape().to_vec();
        if shape.len() != layout.rank() {
            return Err(shape_mismatch(
                name,
                format!("expected rank {} but signal has rank {}", layout.rank(), shape.len()),
            ));
        }
        if signal.error.shape() != shape.as_slice() {
            return Err(shape_mismatch(
                name,
                format!(
                    "error shape {:?} differs from value shape {:?}",
                    signal.error.shape(),
                    shape
                ),
            ));
        }
        if signal.dims.len() != layout.rank() {
            return Err(shape_mismatch(
                name,
                format!(
                    "expected {} coordinate vectors but got {}",
                    layout.rank(),
                    signal.dims.len()
                ),
            ));
        }
        for (axis, (coord, len)) in signal.dims.iter().zip(shape.iter()).enumerate() {
            if coord.len() != *len {
                return Err(shape_mismatch(
                    name,
                    format!(
                        "coordinate {} has {} values for an axis of length {}",
                        layout.dims()[axis],
                        coord.len(),
                        len
                    ),
                ));
            }
        }
        if signal.dims[0]
            .windows(2)
            .into_iter()
            .any(|pair| !(pair[0] < pair[1]))
        {
            return Err(shape_mismatch(
                name,
                String::from("time coordinate is not strictly increasing"),
            ));
        }

        let mut dims = signal.dims.into_iter();
        let time = dims.next().unwrap_or_default();
        let major_radius = dims.next().unwrap_or_default();
        let wavelength = dims.next();

        Ok(Self {
            time,
            major_radius,
            wavelength,
            measurements: vec![Measurement {
                name: name.to_string(),
                layout,
                value: signal.value,
                error: signal.error,
            }],
        })
    }

    /// Assemble a dataset from parts whose shapes are already known to agree
    pub(crate) fn from_parts(
        time: Array1<f64>,
        major_radius: Array1<f64>,
        wavelength: Option<Array1<f64>>,
        measurements: Vec<Measurement>,
    ) -> Self {
        Self {
            time,
            major_radius,
            wavelength,
            measurements,
        }
    }

    pub fn time(&self) -> &Array1<f64> {
        &self.time
    }

    pub fn major_radius(&self) -> &Array1<f64> {
        &self.major_radius
    }

    pub fn wavelength(&self) -> Option<&Array1<f64>> {
        self.wavelength.as_ref()
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    pub fn measurement(&self, name: &str) -> Option<&Measurement> {
        self.measurements.iter().find(|m| m.name == name)
    }

    /// Coordinate-aligned union of two datasets.
    ///
    /// Time and major_radius must be identical; wavelength must be identical when both
    /// sides carry one. A variable name present on both sides is also a conflict.
    pub fn join(self, other: Dataset) -> Result<Dataset, DatasetError> {
        check_coordinates(TIME_AXIS, &self.time, &other.time)?;
        check_coordinates(RADIUS_AXIS, &self.major_radius, &other.major_radius)?;
        let wavelength = match (self.wavelength, other.wavelength) {
            (Some(ours), Some(theirs)) => {
                check_coordinates(WAVELENGTH_AXIS, &ours, &theirs)?;
                Some(ours)
            }
            (ours, theirs) => ours.or(theirs),
        };

        let mut measurements = self.measurements;
        for measurement in other.measurements {
            if measurements.iter().any(|m| m.name == measurement.name) {
                return Err(DatasetError::CoordinateConflict {
                    axis: "variable",
                    detail: format!("variable {} is defined twice", measurement.name),
                });
            }
            measurements.push(measurement);
        }

        Ok(Self {
            time: self.time,
            major_radius: self.major_radius,
            wavelength,
            measurements,
        })
    }

    /// A new dataset restricted to the given time indices, in the given order
    pub fn select_time(&self, indices: &[usize]) -> Dataset {
        Self {
            time: self.time.select(Axis(0), indices),
            major_radius: self.major_radius.clone(),
            wavelength: self.wavelength.clone(),
            measurements: self
                .measurements
                .iter()
                .map(|m| m.select_time(indices))
                .collect(),
        }
    }

    /// Indices of the time points at which no measurement is entirely missing
    pub fn usable_time_indices(&self) -> Vec<usize> {
        (0..self.time.len())
            .filter(|t| !self.measurements.iter().any(|m| m.is_missing_at(*t)))
            .collect()
    }

    /// Place this dataset onto a time grid which contains all of its time points.
    ///
    /// Grid points without a matching time point are filled with NaN. A time point
    /// which is not bit-identical to a grid point is a conflict.
    pub fn reindex_time(&self, grid: &Array1<f64>) -> Result<Dataset, DatasetError> {
        let positions: FxHashMap<u64, usize> = grid
            .iter()
            .enumerate()
            .map(|(idx, t)| (t.to_bits(), idx))
            .collect();
        let mut targets = Vec::with_capacity(self.time.len());
        for t in self.time.iter() {
            match positions.get(&t.to_bits()) {
                Some(idx) => targets.push(*idx),
                None => {
                    return Err(DatasetError::CoordinateConflict {
                        axis: TIME_AXIS,
                        detail: format!("time point {t} is not on the shared time grid"),
                    })
                }
            }
        }

        let measurements = self
            .measurements
            .iter()
            .map(|m| {
                let mut shape = m.value.shape().to_vec();
                shape[0] = grid.len();
                let mut value = ArrayD::from_elem(IxDyn(&shape), f64::NAN);
                let mut error = ArrayD::from_elem(IxDyn(&shape), f64::NAN);
                for (source, target) in targets.iter().enumerate() {
                    value
                        .index_axis_mut(Axis(0), *target)
                        .assign(&m.value.index_axis(Axis(0), source));
                    error
                        .index_axis_mut(Axis(0), *target)
                        .assign(&m.error.index_axis(Axis(0), source));
                }
                m.with_arrays(value, error)
            })
            .collect();

        Ok(Self {
            time: grid.clone(),
            major_radius: self.major_radius.clone(),
            wavelength: self.wavelength.clone(),
            measurements,
        })
    }
}
