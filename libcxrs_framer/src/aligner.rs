use ndarray::{Array1, ArrayD, Axis, IxDyn};
use serde::{Deserialize, Serialize};

use super::constants::{DEFAULT_DT, DEFAULT_MAX_TIME, DEFAULT_MIN_TIME, TIME_BASE_EPSILON};
use super::dataset::Dataset;
use super::error::{ConfigError, DatasetError};

/// The shared, regularly spaced time axis every shot is resampled onto.
///
/// This is pipeline-wide policy: every shot must land on bit-identical time values, so
/// the grid is always generated as `min_time + i * dt` and never inferred from a shot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeBase {
    pub min_time: f64,
    pub max_time: f64,
    pub dt: f64,
}

impl Default for TimeBase {
    fn default() -> Self {
        Self {
            min_time: DEFAULT_MIN_TIME,
            max_time: DEFAULT_MAX_TIME,
            dt: DEFAULT_DT,
        }
    }
}

#[allow(clippy::len_without_is_empty)]
impl TimeBase {
    pub fn new(min_time: f64, max_time: f64, dt: f64) -> Result<Self, ConfigError> {
        let time_base = Self {
            min_time,
            max_time,
            dt,
        };
        time_base.validate()?;
        Ok(time_base)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = self.min_time.is_finite() && self.max_time.is_finite() && self.dt.is_finite();
        if !finite || self.dt <= 0.0 || self.max_time < self.min_time {
            return Err(ConfigError::BadTimeBase {
                min: self.min_time,
                max: self.max_time,
                dt: self.dt,
            });
        }
        Ok(())
    }

    /// Number of grid points, `ceil((max - min) / dt) + 1`
    pub fn len(&self) -> usize {
        let steps = ((self.max_time - self.min_time) / self.dt - TIME_BASE_EPSILON).ceil();
        steps.max(0.0) as usize + 1
    }

    pub fn points(&self) -> Array1<f64> {
        Array1::from_iter((0..self.len()).map(|i| self.min_time + i as f64 * self.dt))
    }
}

/// Where a query time falls relative to the source samples
#[derive(Debug, Clone, Copy, PartialEq)]
enum Bracket {
    Exact(usize),
    Between(usize, f64),
    Outside,
}

fn bracket(time: &Array1<f64>, query: f64) -> Bracket {
    let n = time.len();
    // Number of samples at or before the query; NaN queries land on 0
    let upper = time
        .as_slice()
        .map(|t| t.partition_point(|v| *v <= query))
        .unwrap_or_else(|| time.iter().take_while(|v| **v <= query).count());
    if upper == 0 {
        return Bracket::Outside;
    }
    let left = upper - 1;
    if time[left] == query {
        Bracket::Exact(left)
    } else if upper == n {
        Bracket::Outside
    } else {
        let weight = (query - time[left]) / (time[upper] - time[left]);
        Bracket::Between(left, weight)
    }
}

fn resample(array: &ArrayD<f64>, brackets: &[Bracket]) -> ArrayD<f64> {
    let mut shape = array.shape().to_vec();
    shape[0] = brackets.len();
    let mut out = ArrayD::from_elem(IxDyn(&shape), f64::NAN);
    for (idx, b) in brackets.iter().enumerate() {
        match *b {
            Bracket::Exact(src) => out
                .index_axis_mut(Axis(0), idx)
                .assign(&array.index_axis(Axis(0), src)),
            Bracket::Between(left, weight) => {
                let lo = array.index_axis(Axis(0), left);
                let hi = array.index_axis(Axis(0), left + 1);
                let row = &lo + &((&hi - &lo) * weight);
                out.index_axis_mut(Axis(0), idx).assign(&row);
            }
            Bracket::Outside => (),
        }
    }
    out
}

/// Linearly interpolate every measurement of a dataset onto `time_base`.
///
/// Grid points outside the source time range are NaN, grid points equal to a source
/// time take that sample unchanged.
pub fn interpolate(dataset: &Dataset, time_base: &Array1<f64>) -> Dataset {
    let brackets: Vec<Bracket> = time_base
        .iter()
        .map(|q| bracket(dataset.time(), *q))
        .collect();
    let measurements = dataset
        .measurements()
        .iter()
        .map(|m| m.with_arrays(resample(m.value(), &brackets), resample(m.error(), &brackets)))
        .collect();
    Dataset::from_parts(
        time_base.clone(),
        dataset.major_radius().clone(),
        dataset.wavelength().cloned(),
        measurements,
    )
}

/// Interpolate each dataset onto the shared grid and join them on it
pub fn align(datasets: Vec<Dataset>, time_base: &Array1<f64>) -> Result<Dataset, DatasetError> {
    let mut aligned = datasets.iter().map(|d| interpolate(d, time_base));
    let first = aligned.next().ok_or(DatasetError::NoDatasets)?;
    aligned.try_fold(first, |merged, next| merged.join(next))
}
