use ndarray::{ArrayViewD, Axis};

use super::constants::SHOT_AXIS;
use super::dataset::{Dataset, Measurement};
use super::error::DatasetError;

/// All measurements of one shot on the shared time grid, tagged with the shot id.
///
/// Every variable conceptually carries a leading `shot_id` axis of length 1; the
/// `*_with_shot_axis` views expose it.
#[derive(Debug, Clone, PartialEq)]
pub struct ShotDataset {
    pub shot_id: i64,
    pub dataset: Dataset,
}

impl ShotDataset {
    /// Dimension names of a measurement including the shot axis
    pub fn dims(measurement: &Measurement) -> Vec<&'static str> {
        std::iter::once(SHOT_AXIS)
            .chain(measurement.layout().dims().iter().copied())
            .collect()
    }

    pub fn value_with_shot_axis<'a>(&self, measurement: &'a Measurement) -> ArrayViewD<'a, f64> {
        measurement.value().view().insert_axis(Axis(0))
    }

    pub fn error_with_shot_axis<'a>(&self, measurement: &'a Measurement) -> ArrayViewD<'a, f64> {
        measurement.error().view().insert_axis(Axis(0))
    }
}

/// Join the aligned profiles with the subsampled volumes and tag the result with a shot.
///
/// The volume time points must lie on the profile time grid; the volumes are placed
/// onto that grid with missing values at the time points which were not sampled.
pub fn merge(
    profiles: Dataset,
    volumes: Dataset,
    shot_id: i64,
) -> Result<ShotDataset, DatasetError> {
    let volumes = volumes.reindex_time(profiles.time())?;
    let dataset = profiles.join(volumes)?;
    Ok(ShotDataset { shot_id, dataset })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SampledSignal;
    use ndarray::{array, Array1, ArrayD, IxDyn};

    fn profiles(time: Array1<f64>) -> Dataset {
        let n = time.len();
        let value = ArrayD::from_elem(IxDyn(&[n, 2]), 1.5);
        Dataset::profile(
            "velocity",
            SampledSignal::new(value.clone(), value, vec![time, array![0.8, 0.9]]),
        )
        .unwrap()
    }

    fn volumes(time: Array1<f64>, radius: Array1<f64>) -> Dataset {
        let n = time.len();
        let value = ArrayD::from_elem(IxDyn(&[n, 2, 3]), 7.0);
        Dataset::volume(
            "ss_counts",
            SampledSignal::new(value.clone(), value, vec![time, radius, array![1.0, 2.0, 3.0]]),
        )
        .unwrap()
    }

    #[test]
    fn test_merge_places_volumes_on_grid() {
        let grid = array![0.0, 0.1, 0.2, 0.3];
        let shot = merge(
            profiles(grid.clone()),
            volumes(array![0.1, 0.3], array![0.8, 0.9]),
            30420,
        )
        .unwrap();
        assert_eq!(shot.shot_id, 30420);
        assert_eq!(shot.dataset.time(), &grid);
        assert_eq!(shot.dataset.wavelength(), Some(&array![1.0, 2.0, 3.0]));

        let counts = shot.dataset.measurement("ss_counts").unwrap();
        assert_eq!(counts.value().shape(), &[4, 2, 3]);
        assert!(counts.value()[[0, 0, 0]].is_nan());
        assert_eq!(counts.value()[[1, 1, 2]], 7.0);
        assert!(counts.value()[[2, 0, 1]].is_nan());
        assert_eq!(counts.error()[[3, 0, 0]], 7.0);

        assert_eq!(
            ShotDataset::dims(counts),
            vec!["shot_id", "time", "major_radius", "wavelength"]
        );
        assert_eq!(shot.value_with_shot_axis(counts).shape(), &[1, 4, 2, 3]);
    }

    #[test]
    fn test_merge_rejects_off_grid_volume() {
        let grid = array![0.0, 0.1, 0.2];
        let result = merge(
            profiles(grid),
            volumes(array![0.05], array![0.8, 0.9]),
            1,
        );
        assert!(matches!(result, Err(DatasetError::CoordinateConflict { .. })));
    }

    #[test]
    fn test_merge_rejects_radius_conflict() {
        let grid = array![0.0, 0.1];
        let result = merge(
            profiles(grid),
            volumes(array![0.1], array![0.8, 1.1]),
            1,
        );
        assert!(matches!(
            result,
            Err(DatasetError::CoordinateConflict { axis: "major_radius", .. })
        ));
    }
}
