use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use gatejudge_core::ResponseRecord;
use gatejudge_experiment::{Host, HostError};
use serde::Serialize;
use tracing::info;

/// On-disk layout of a saved session
#[derive(Serialize)]
struct SessionFile<'a> {
    participant: &'a str,
    condition: Option<u32>,
    counterbalance: Option<u32>,
    trialdata: &'a [ResponseRecord],
    questiondata: BTreeMap<&'a str, &'a str>,
}

/// Writes `<dir>/<participant>.json` on every save and a
/// `<participant>.complete` marker once the task is closed.
pub struct FileHost {
    dir: PathBuf,
    participant: String,
    trials: Vec<ResponseRecord>,
    questions: BTreeMap<String, String>,
    saved: bool,
}

impl FileHost {
    pub fn new(dir: impl Into<PathBuf>, participant: &str) -> Result<Self, HostError> {
        let valid = !participant.is_empty()
            && participant
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(HostError::Rejected(format!(
                "participant id {participant:?} may only contain letters, digits, '-' and '_'"
            )));
        }
        Ok(Self {
            dir: dir.into(),
            participant: participant.to_owned(),
            trials: Vec::new(),
            questions: BTreeMap::new(),
            saved: false,
        })
    }

    pub fn data_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.participant))
    }

    pub fn marker_path(&self) -> PathBuf {
        self.dir.join(format!("{}.complete", self.participant))
    }

    fn number(&self, key: &str) -> Option<u32> {
        self.questions.get(key).and_then(|v| v.parse().ok())
    }

    fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), HostError> {
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl Host for FileHost {
    fn record_trial(&mut self, record: &ResponseRecord) {
        self.trials.push(record.clone());
    }

    fn record_unstructured(&mut self, key: &str, value: &str) {
        self.questions.insert(key.to_owned(), value.to_owned());
    }

    fn save_data(&mut self) -> Result<(), HostError> {
        fs::create_dir_all(&self.dir)?;
        let file = SessionFile {
            participant: &self.participant,
            condition: self.number("condition"),
            counterbalance: self.number("counterbalance"),
            trialdata: &self.trials,
            questiondata: self
                .questions
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
        };
        let bytes = serde_json::to_vec_pretty(&file)?;
        let path = self.data_path();
        Self::write_atomically(&path, &bytes)?;
        self.saved = true;
        info!(path = %path.display(), trials = self.trials.len(), "session data saved");
        Ok(())
    }

    fn complete_task(&mut self) -> Result<(), HostError> {
        if !self.saved {
            return Err(HostError::Rejected(
                "task cannot complete before its data is saved".into(),
            ));
        }
        fs::write(self.marker_path(), format!("{}\n", self.trials.len()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn record(id: u32, response: u8) -> ResponseRecord {
        ResponseRecord {
            id,
            name: format!("v{id}"),
            gate_pass: 1,
            response,
            time: 1234.5,
            replay_times: 0,
        }
    }

    #[test]
    fn save_writes_trials_and_questions() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = FileHost::new(dir.path().join("out"), "p01").unwrap();
        host.record_unstructured("condition", "1");
        host.record_unstructured("counterbalance", "3");
        host.record_trial(&record(1, 70));
        host.record_trial(&record(2, 30));
        host.record_unstructured("race", "NA");
        host.save_data().unwrap();

        let json: Value =
            serde_json::from_str(&std::fs::read_to_string(host.data_path()).unwrap()).unwrap();
        assert_eq!(json["participant"], "p01");
        assert_eq!(json["condition"], 1);
        assert_eq!(json["counterbalance"], 3);
        assert_eq!(json["trialdata"][1]["response"], 30);
        assert_eq!(json["trialdata"][0]["replay_times"], 0);
        assert_eq!(json["questiondata"]["race"], "NA");
        assert!(!host.marker_path().exists());
    }

    #[test]
    fn completion_requires_a_save() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = FileHost::new(dir.path(), "p02").unwrap();
        assert!(matches!(host.complete_task(), Err(HostError::Rejected(_))));
        host.save_data().unwrap();
        host.complete_task().unwrap();
        assert_eq!(
            std::fs::read_to_string(host.marker_path()).unwrap(),
            "0\n"
        );
    }

    #[test]
    fn resaving_overwrites_the_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = FileHost::new(dir.path(), "p03").unwrap();
        host.save_data().unwrap();
        host.record_trial(&record(5, 55));
        host.save_data().unwrap();
        let json: Value =
            serde_json::from_str(&std::fs::read_to_string(host.data_path()).unwrap()).unwrap();
        assert_eq!(json["trialdata"].as_array().unwrap().len(), 1);
        assert!(!dir.path().join("p03.json.tmp").exists());
    }

    #[test]
    fn unsafe_participant_ids_are_rejected() {
        assert!(FileHost::new("data", "../escape").is_err());
        assert!(FileHost::new("data", "").is_err());
        assert!(FileHost::new("data", "abc-12_x").is_ok());
    }
}
