use gatejudge_core::ResponseRecord;

use crate::error::HostError;

/// The experiment-hosting collaborator that stores data and closes the task
pub trait Host {
    fn record_trial(&mut self, record: &ResponseRecord);
    fn record_unstructured(&mut self, key: &str, value: &str);
    fn save_data(&mut self) -> Result<(), HostError>;
    fn complete_task(&mut self) -> Result<(), HostError>;
}

/// In-memory host; can be told to fail upcoming saves
#[derive(Debug, Default, Clone)]
pub struct MemoryHost {
    pub trials: Vec<ResponseRecord>,
    pub unstructured: Vec<(String, String)>,
    pub save_attempts: u32,
    pub fail_next_saves: u32,
    pub saved: bool,
    pub completed: bool,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(saves: u32) -> Self {
        Self {
            fail_next_saves: saves,
            ..Self::default()
        }
    }

    pub fn unstructured_value(&self, key: &str) -> Option<&str> {
        self.unstructured
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl Host for MemoryHost {
    fn record_trial(&mut self, record: &ResponseRecord) {
        self.trials.push(record.clone());
    }

    fn record_unstructured(&mut self, key: &str, value: &str) {
        self.unstructured.push((key.to_owned(), value.to_owned()));
    }

    fn save_data(&mut self) -> Result<(), HostError> {
        self.save_attempts += 1;
        if self.fail_next_saves > 0 {
            self.fail_next_saves -= 1;
            return Err(HostError::Rejected("save unavailable".into()));
        }
        self.saved = true;
        Ok(())
    }

    fn complete_task(&mut self) -> Result<(), HostError> {
        if !self.saved {
            return Err(HostError::Rejected("nothing saved yet".into()));
        }
        self.completed = true;
        Ok(())
    }
}
