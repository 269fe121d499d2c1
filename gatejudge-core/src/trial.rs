use serde::{Deserialize, Serialize};

use crate::TrialDescriptor;

/// Readiness progress of the trial on screen
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum TrialStage {
    /// Required plays not yet watched to the end.
    Watching,
    /// Rating slider unlocked.
    Rating,
    /// Rating locked in; the full clip has to finish.
    FullClip,
    /// Advance action enabled.
    Ready,
}

/// Recorded result per trial, handed to the host once and never changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub id: u32,
    pub name: String,
    pub gate_pass: u8,
    /// Slider position, 0..=100.
    pub response: u8,
    /// Milliseconds from trial start to the advance action.
    pub time: f64,
    pub replay_times: u32,
}

impl ResponseRecord {
    pub fn new(trial: &TrialDescriptor, response: u8, time: f64, replay_times: u32) -> Self {
        Self {
            id: trial.id,
            name: trial.name.clone(),
            gate_pass: trial.gate_pass,
            response,
            time,
            replay_times,
        }
    }
}
