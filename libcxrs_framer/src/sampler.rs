use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use super::dataset::Dataset;
use super::error::{ConfigError, SamplerError};

/// Strategy used to reduce the time axis of the volume data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleMethod {
    /// Every k-th usable time point, k = max(1, T / num_samples)
    #[default]
    Grid,
    /// Distinct usable time points drawn uniformly without replacement
    Random,
}

impl FromStr for SampleMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grid" => Ok(Self::Grid),
            "random" => Ok(Self::Random),
            _ => Err(ConfigError::BadSampleMethod(s.to_string())),
        }
    }
}

impl Display for SampleMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Grid => write!(f, "grid"),
            Self::Random => write!(f, "random"),
        }
    }
}

/// Pick positions out of `usable` (sorted time indices). The result is in time order.
///
/// Grid selection never returns more than `num_samples` points and ignores the rng.
fn select_indices<R: Rng + ?Sized>(
    usable: &[usize],
    method: SampleMethod,
    num_samples: usize,
    rng: &mut R,
) -> Result<Vec<usize>, SamplerError> {
    if num_samples == 0 || usable.is_empty() {
        return Err(SamplerError::InsufficientSamples {
            requested: num_samples,
            available: usable.len(),
        });
    }

    match method {
        SampleMethod::Grid => {
            let stride = (usable.len() / num_samples).max(1);
            Ok(usable
                .iter()
                .step_by(stride)
                .take(num_samples)
                .copied()
                .collect())
        }
        SampleMethod::Random => {
            if usable.len() < num_samples {
                return Err(SamplerError::InsufficientSamples {
                    requested: num_samples,
                    available: usable.len(),
                });
            }
            let mut picked: Vec<usize> =
                rand::seq::index::sample(rng, usable.len(), num_samples)
                    .into_iter()
                    .map(|pos| usable[pos])
                    .collect();
            picked.sort_unstable();
            Ok(picked)
        }
    }
}

/// Reduce a dataset to a bounded number of usable time points
pub fn subsample<R: Rng + ?Sized>(
    dataset: &Dataset,
    method: SampleMethod,
    num_samples: usize,
    rng: &mut R,
) -> Result<Dataset, SamplerError> {
    let usable = dataset.usable_time_indices();
    let selected = select_indices(&usable, method, num_samples, rng)?;
    spdlog::debug!(
        "Subsampled {} of {} usable time points using {} sampling",
        selected.len(),
        usable.len(),
        method
    );
    Ok(dataset.select_time(&selected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SampledSignal;
    use ndarray::{Array1, ArrayD, IxDyn};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn dataset(n_time: usize) -> Dataset {
        let time = Array1::from_iter((0..n_time).map(|i| i as f64 * 0.1));
        let value = ArrayD::from_shape_fn(IxDyn(&[n_time, 2, 3]), |idx| idx[0] as f64);
        let error = value.clone();
        Dataset::volume(
            "ss_fits",
            SampledSignal::new(
                value,
                error,
                vec![time, Array1::from_vec(vec![0.8, 0.9]), Array1::from_vec(vec![1.0, 2.0, 3.0])],
            ),
        )
        .unwrap()
    }

    #[test]
    fn test_grid_stride() {
        let mut rng = StdRng::seed_from_u64(0);
        let sampled = subsample(&dataset(10), SampleMethod::Grid, 5, &mut rng).unwrap();
        assert_eq!(
            sampled.time().to_vec(),
            vec![0.0, 2.0 * 0.1, 4.0 * 0.1, 6.0 * 0.1, 8.0 * 0.1]
        );
        let m = sampled.measurement("ss_fits").unwrap();
        assert_eq!(m.value().shape(), &[5, 2, 3]);
        assert_eq!(m.value()[[3, 1, 2]], 6.0);
    }

    #[test]
    fn test_grid_never_exceeds_request() {
        let mut rng = StdRng::seed_from_u64(0);
        let sampled = subsample(&dataset(11), SampleMethod::Grid, 5, &mut rng).unwrap();
        assert_eq!(sampled.time().len(), 5);
        let sampled = subsample(&dataset(3), SampleMethod::Grid, 5, &mut rng).unwrap();
        assert_eq!(sampled.time().len(), 3);
    }

    #[test]
    fn test_grid_ignores_rng() {
        let data = dataset(37);
        let a = subsample(&data, SampleMethod::Grid, 7, &mut StdRng::seed_from_u64(1)).unwrap();
        let b = subsample(&data, SampleMethod::Grid, 7, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_random_distinct_and_reproducible() {
        let data = dataset(50);
        let a = subsample(&data, SampleMethod::Random, 10, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = subsample(&data, SampleMethod::Random, 10, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a.time(), b.time());

        let times = a.time().to_vec();
        assert_eq!(times.len(), 10);
        assert!(times.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_missing_time_points_are_skipped() {
        let mut data = dataset(4);
        let value = data.measurements()[0].value();
        let mut value = value.clone();
        value.index_axis_mut(ndarray::Axis(0), 1).fill(f64::NAN);
        data = Dataset::volume(
            "ss_fits",
            SampledSignal::new(
                value.clone(),
                value,
                vec![
                    data.time().clone(),
                    data.major_radius().clone(),
                    data.wavelength().unwrap().clone(),
                ],
            ),
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let sampled = subsample(&data, SampleMethod::Random, 3, &mut rng).unwrap();
        assert_eq!(sampled.time().to_vec(), vec![0.0, 2.0 * 0.1, 3.0 * 0.1]);
        assert!(matches!(
            subsample(&data, SampleMethod::Random, 4, &mut rng),
            Err(SamplerError::InsufficientSamples {
                requested: 4,
                available: 3
            })
        ));
    }

    #[test]
    fn test_no_usable_time_points() {
        let data = dataset(4);
        let value = data.measurements()[0].value().mapv(|_| f64::NAN);
        let empty = Dataset::volume(
            "ss_fits",
            SampledSignal::new(
                value.clone(),
                value,
                vec![
                    data.time().clone(),
                    data.major_radius().clone(),
                    data.wavelength().unwrap().clone(),
                ],
            ),
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        for method in [SampleMethod::Grid, SampleMethod::Random] {
            assert!(matches!(
                subsample(&empty, method, 2, &mut rng),
                Err(SamplerError::InsufficientSamples {
                    requested: 2,
                    available: 0
                })
            ));
        }
    }

    #[test]
    fn test_zero_samples_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(subsample(&dataset(4), SampleMethod::Grid, 0, &mut rng).is_err());
    }

    #[test]
    fn test_parse_method() {
        assert_eq!("grid".parse::<SampleMethod>().unwrap(), SampleMethod::Grid);
        assert_eq!("random".parse::<SampleMethod>().unwrap(), SampleMethod::Random);
        assert!("every".parse::<SampleMethod>().is_err());
    }
}
