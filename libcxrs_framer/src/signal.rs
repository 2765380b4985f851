use fxhash::FxHashMap;
use ndarray::{Array1, ArrayD};

use super::error::SourceError;

/// Raw output of a signal fetch: values, same-shaped uncertainties, and one coordinate
/// vector per array axis (time first).
#[derive(Debug, Clone, PartialEq)]
pub struct SampledSignal {
    pub value: ArrayD<f64>,
    pub error: ArrayD<f64>,
    pub dims: Vec<Array1<f64>>,
}

impl SampledSignal {
    pub fn new(value: ArrayD<f64>, error: ArrayD<f64>, dims: Vec<Array1<f64>>) -> Self {
        Self { value, error, dims }
    }
}

/// Anything which can hand out the sampled signals of a shot.
///
/// A signal or shot which does not exist must be reported as `SourceError::NotFound`;
/// any other failure to deliver as `SourceError::Unavailable`.
pub trait SignalSource {
    fn fetch(&self, signal_id: &str, shot_id: i64) -> Result<SampledSignal, SourceError>;
}

/// In-memory signal source keyed by (signal id, shot)
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    signals: FxHashMap<(String, i64), SampledSignal>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, signal_id: &str, shot_id: i64, signal: SampledSignal) {
        self.signals.insert((signal_id.to_string(), shot_id), signal);
    }

    pub fn with_signal(mut self, signal_id: &str, shot_id: i64, signal: SampledSignal) -> Self {
        self.insert(signal_id, shot_id, signal);
        self
    }
}

impl SignalSource for MemorySource {
    fn fetch(&self, signal_id: &str, shot_id: i64) -> Result<SampledSignal, SourceError> {
        self.signals
            .get(&(signal_id.to_string(), shot_id))
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                signal: signal_id.to_string(),
                shot: shot_id,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, IxDyn};

    #[test]
    fn test_memory_source_fetch() {
        let signal = SampledSignal::new(
            ArrayD::zeros(IxDyn(&[2, 1])),
            ArrayD::zeros(IxDyn(&[2, 1])),
            vec![array![0.0, 1.0], array![0.5]],
        );
        let source = MemorySource::new().with_signal("A/B", 7, signal.clone());
        assert_eq!(source.fetch("A/B", 7).unwrap(), signal);
        match source.fetch("A/B", 8) {
            Err(SourceError::NotFound { signal, shot }) => {
                assert_eq!(signal, "A/B");
                assert_eq!(shot, 8);
            }
            _ => panic!("expected NotFound"),
        }
    }
}
