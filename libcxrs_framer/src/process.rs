use rand::Rng;
use std::sync::mpsc::Sender;

use super::config::Config;
use super::error::ProcessorError;
use super::loader::ShotLoader;
use super::shot_status::{ShotOutcome, ShotStatus};
use super::signal::SignalSource;
use super::store;

/// Outcome of a batch: the shots which made it into the store and the ones which did not
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub written: Vec<i64>,
    pub failed: Vec<(i64, String)>,
}

/// Send a status; a closed receiver is logged and otherwise ignored
fn report(tx: &Sender<ShotStatus>, status: ShotStatus) {
    if let Err(e) = tx.send(status) {
        spdlog::warn!("Could not report progress: {e}");
    }
}

/// Load a single shot and append it to the store
pub fn process_shot<S: SignalSource + ?Sized, R: Rng + ?Sized>(
    source: &S,
    config: &Config,
    shot_id: i64,
    rng: &mut R,
) -> Result<(), ProcessorError> {
    let loader = ShotLoader::new(source, config);
    let shot = loader.load_dataset(shot_id, rng)?;
    let store_path = config.get_store_path();
    store::write(&shot, &store_path)?;
    spdlog::info!(
        "Saved dataset for shot {shot_id} to {}",
        store_path.to_string_lossy()
    );
    Ok(())
}

/// The main loop of cxrs_framer.
///
/// Processes every shot of the configured range in order. A failing shot is logged and
/// skipped; only a failure to set up the output directory ends the batch early.
pub fn process_range<S: SignalSource + ?Sized, R: Rng + ?Sized>(
    source: &S,
    config: &Config,
    rng: &mut R,
    tx: &Sender<ShotStatus>,
) -> Result<BatchSummary, ProcessorError> {
    config.validate()?;
    std::fs::create_dir_all(&config.output_path)?;
    if config.overwrite && config.get_store_path().exists() {
        spdlog::warn!(
            "Overwrite was requested but shots are always appended to the existing store at {}",
            config.get_store_path().to_string_lossy()
        );
    }

    let total_shots = config.n_shots();
    let mut summary = BatchSummary::default();
    for (shot_index, shot_id) in config.shots().enumerate() {
        spdlog::info!("Processing shot {shot_id}...");
        report(
            tx,
            ShotStatus::new(shot_id, shot_index, total_shots, ShotOutcome::Started),
        );
        match process_shot(source, config, shot_id, rng) {
            Ok(()) => {
                summary.written.push(shot_id);
                report(
                    tx,
                    ShotStatus::new(shot_id, shot_index, total_shots, ShotOutcome::Written),
                );
            }
            Err(e) => {
                spdlog::error!("Failed to process shot {shot_id}: {e}");
                summary.failed.push((shot_id, e.to_string()));
                report(
                    tx,
                    ShotStatus::new(shot_id, shot_index, total_shots, ShotOutcome::Failed),
                );
            }
        }
    }
    spdlog::info!(
        "Finished shots {} to {}: {} written, {} failed",
        config.first_shot,
        config.last_shot,
        summary.written.len(),
        summary.failed.len()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aligner::TimeBase;
    use crate::config::SignalSpec;
    use crate::error::ConfigError;
    use crate::signal::{MemorySource, SampledSignal};
    use crate::store::AppendStore;
    use ndarray::{array, ArrayD, IxDyn};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::mpsc::channel;

    fn add_shot(source: &mut MemorySource, shot_id: i64) {
        let time = array![0.0, 0.1, 0.2];
        let profile = ArrayD::from_elem(IxDyn(&[3, 2]), shot_id as f64);
        let volume = ArrayD::from_elem(IxDyn(&[3, 2, 2]), shot_id as f64);
        source.insert(
            "VELOCITY",
            shot_id,
            SampledSignal::new(profile.clone(), profile, vec![time.clone(), array![0.8, 0.9]]),
        );
        source.insert(
            "COUNTS",
            shot_id,
            SampledSignal::new(
                volume.clone(),
                volume,
                vec![time, array![0.8, 0.9], array![0.0, 0.0]],
            ),
        );
        source.insert(
            "WAVELENGTH",
            shot_id,
            SampledSignal::new(array![529.0, 530.0].into_dyn(), ArrayD::zeros(IxDyn(&[2])), vec![
                array![0.0, 1.0],
            ]),
        );
    }

    fn config(output: &std::path::Path, first_shot: i64, last_shot: i64) -> Config {
        Config {
            output_path: output.to_path_buf(),
            first_shot,
            last_shot,
            num_samples: 2,
            time_base: TimeBase::new(0.0, 0.2, 0.1).unwrap(),
            wavelength_signal: String::from("WAVELENGTH"),
            profiles: vec![SignalSpec::new("velocity", "VELOCITY")],
            volumes: vec![SignalSpec::new("ss_counts", "COUNTS")],
            ..Default::default()
        }
    }

    #[test]
    fn test_failed_shots_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = MemorySource::new();
        add_shot(&mut source, 100);
        add_shot(&mut source, 102);
        let config = config(&dir.path().join("out"), 100, 102);
        let (tx, rx) = channel();
        let mut rng = StdRng::seed_from_u64(42);

        let summary = process_range(&source, &config, &mut rng, &tx).unwrap();
        assert_eq!(summary.written, vec![100, 102]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, 101);

        let store = AppendStore::open(&config.get_store_path()).unwrap();
        assert_eq!(store.shot_ids().unwrap(), vec![100, 102]);

        drop(tx);
        let statuses: Vec<ShotStatus> = rx.iter().collect();
        assert_eq!(statuses.len(), 6);
        assert_eq!(statuses[3].outcome, ShotOutcome::Failed);
        assert_eq!(statuses[5].progress(), 1.0);
    }

    #[test]
    fn test_rerun_rejects_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = MemorySource::new();
        add_shot(&mut source, 7);
        let config = config(dir.path(), 7, 7);
        let (tx, _rx) = channel();
        let mut rng = StdRng::seed_from_u64(42);

        let first = process_range(&source, &config, &mut rng, &tx).unwrap();
        assert_eq!(first.written, vec![7]);
        let second = process_range(&source, &config, &mut rng, &tx).unwrap();
        assert!(second.written.is_empty());
        assert_eq!(second.failed[0].0, 7);

        let store = AppendStore::open(&config.get_store_path()).unwrap();
        assert_eq!(store.shot_ids().unwrap(), vec![7]);
    }

    #[test]
    fn test_closed_status_channel() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = MemorySource::new();
        add_shot(&mut source, 1);
        let config = config(dir.path(), 1, 1);
        let (tx, rx) = channel();
        drop(rx);
        let mut rng = StdRng::seed_from_u64(42);
        let summary = process_range(&source, &config, &mut rng, &tx).unwrap();
        assert_eq!(summary.written, vec![1]);
    }

    #[test]
    fn test_bad_range() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), 5, 1);
        let (tx, _rx) = channel();
        let mut rng = StdRng::seed_from_u64(42);
        assert!(matches!(
            process_range(&MemorySource::new(), &config, &mut rng, &tx),
            Err(ProcessorError::ConfigError(ConfigError::BadShotRange(5, 1)))
        ));
    }
}
