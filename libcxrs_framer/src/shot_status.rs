#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ShotOutcome {
    #[default]
    Started,
    Written,
    Failed,
}

/// Progress message sent by the batch driver once per shot transition
#[derive(Debug, Clone, Default)]
pub struct ShotStatus {
    pub shot_id: i64,
    pub shot_index: usize,
    pub total_shots: usize,
    pub outcome: ShotOutcome,
}

impl ShotStatus {
    pub fn new(shot_id: i64, shot_index: usize, total_shots: usize, outcome: ShotOutcome) -> Self {
        Self {
            shot_id,
            shot_index,
            total_shots,
            outcome,
        }
    }

    /// Fraction of the batch finished once this shot is done
    pub fn progress(&self) -> f32 {
        if self.total_shots == 0 {
            return 1.0;
        }
        let done = match self.outcome {
            ShotOutcome::Started => self.shot_index,
            _ => self.shot_index + 1,
        };
        done as f32 / self.total_shots as f32
    }
}
