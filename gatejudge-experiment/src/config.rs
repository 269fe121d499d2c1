use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use gatejudge_core::{PromptStyle, TrialDescriptor};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::comprehension::{self, ComprehensionQuestion};
use crate::error::ConfigError;
use crate::trial::ReadinessPolicy;

/// Which of the two trial presentations a session runs
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    #[default]
    FullPlays,
    PartialThenFull,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub title: String,
    pub lines: Vec<String>,
}

impl Page {
    fn new(title: &str, lines: &[&str]) -> Self {
        Self {
            title: title.to_owned(),
            lines: lines.iter().map(|l| (*l).to_owned()).collect(),
        }
    }
}

/// Text of the static screens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pages {
    pub instructions: Page,
    pub comprehension_fail: Page,
    pub reminder: Page,
    pub submitting: Page,
    pub submit_error: Page,
    pub resubmitting: Page,
    pub completed: Page,
    pub abandoned: Page,
}

impl Default for Pages {
    fn default() -> Self {
        Self {
            instructions: Page::new(
                "Instructions",
                &[
                    "In this study you will watch short videos of two balls, A and B.",
                    "Ball B moves towards a gate. Ball A may collide with it along the way.",
                    "Grey blocks are solid: balls bounce off them.",
                    "After each video you will rate a statement about what happened.",
                    "Use the slider to say how much you agree with the statement.",
                ],
            ),
            comprehension_fail: Page::new(
                "Not quite",
                &[
                    "At least one of your answers was incorrect.",
                    "Please read the instructions again and retry the questions.",
                ],
            ),
            reminder: Page::new(
                "Ready?",
                &[
                    "You answered all questions correctly.",
                    "Watch each video carefully before giving your rating.",
                ],
            ),
            submitting: Page::new("Submitting", &["Saving your responses, please wait."]),
            submit_error: Page::new(
                "Submission failed",
                &[
                    "We could not save your responses.",
                    "Please make sure you are online and try again.",
                ],
            ),
            resubmitting: Page::new("Resubmitting", &["Trying to save your responses again."]),
            completed: Page::new(
                "Thank you!",
                &["Your responses have been saved. You may close this window."],
            ),
            abandoned: Page::new(
                "Submission could not be completed",
                &[
                    "Your responses could not be saved after several attempts.",
                    "Please contact the requester so that you can be compensated.",
                ],
            ),
        }
    }
}

/// Option lists of the survey
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemographicsOptions {
    pub genders: Vec<String>,
    pub races: Vec<String>,
    pub ethnicities: Vec<String>,
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_owned()).collect()
}

impl Default for DemographicsOptions {
    fn default() -> Self {
        Self {
            genders: owned(&["Female", "Male", "Non-binary", "Prefer not to say"]),
            races: owned(&[
                "American Indian or Alaska Native",
                "Asian",
                "Black or African American",
                "Native Hawaiian or Other Pacific Islander",
                "White",
                "Multiracial",
            ]),
            ethnicities: owned(&["Hispanic or Latino", "Not Hispanic or Latino", "Prefer not to say"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub condition: u32,
    pub counterbalance: u32,
    pub trials: Vec<TrialDescriptor>,
    pub shuffle_trials: bool,
    /// Seed for the trial shuffle; the counterbalance is used when absent.
    pub shuffle_seed: Option<u64>,
    pub skip_instructions: bool,
    pub variant: Variant,
    /// Overrides the variant's number of required plays.
    pub required_plays: Option<u32>,
    /// Overrides the variant's prompt.
    pub prompt: Option<PromptStyle>,
    /// Empty means the variant's default questions.
    pub comprehension: Vec<ComprehensionQuestion>,
    pub demographics: DemographicsOptions,
    pub pages: Pages,
    pub resubmit_delay_ms: u64,
    pub max_resubmit_attempts: u32,
    pub media_root: PathBuf,
    pub fps: f32,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            condition: 0,
            counterbalance: 0,
            trials: Vec::new(),
            shuffle_trials: false,
            shuffle_seed: None,
            skip_instructions: false,
            variant: Variant::FullPlays,
            required_plays: None,
            prompt: None,
            comprehension: Vec::new(),
            demographics: DemographicsOptions::default(),
            pages: Pages::default(),
            resubmit_delay_ms: 10_000,
            max_resubmit_attempts: 5,
            media_root: PathBuf::from("static/videos"),
            fps: 30.0,
        }
    }
}

impl ExperimentConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        let config = config.resolve();
        config.validate()?;
        Ok(config)
    }

    /// Fill variant defaults left empty by the configuration file.
    pub fn resolve(mut self) -> Self {
        if self.comprehension.is_empty() {
            self.comprehension = match self.variant {
                Variant::FullPlays => comprehension::full_plays_questions(),
                Variant::PartialThenFull => comprehension::partial_then_full_questions(),
            };
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.readiness().required_plays() == 0 {
            return Err(ConfigError::Invalid(
                "required_plays must be at least 1".into(),
            ));
        }
        if self.comprehension.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one comprehension question is required".into(),
            ));
        }
        for q in &self.comprehension {
            if !q.options.iter().any(|o| o.value == q.expected) {
                return Err(ConfigError::Invalid(format!(
                    "expected answer {:?} of question {:?} is not one of its options",
                    q.expected, q.name
                )));
            }
        }
        // race has its own opt-out, these two do not
        if self.demographics.genders.is_empty() || self.demographics.ethnicities.is_empty() {
            return Err(ConfigError::Invalid(
                "gender and ethnicity need at least one option each".into(),
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.trials.iter().find(|t| !seen.insert(t.id)) {
            return Err(ConfigError::Invalid(format!(
                "trial id {} appears more than once",
                dup.id
            )));
        }
        if self.max_resubmit_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_resubmit_attempts must be at least 1".into(),
            ));
        }
        if !(self.fps > 0.0) {
            return Err(ConfigError::Invalid("fps must be positive".into()));
        }
        Ok(())
    }

    pub fn readiness(&self) -> ReadinessPolicy {
        match self.variant {
            Variant::FullPlays => ReadinessPolicy::FullPlays {
                required_plays: self.required_plays.unwrap_or(2),
            },
            Variant::PartialThenFull => ReadinessPolicy::PartialThenFull {
                required_partial_plays: self.required_plays.unwrap_or(2),
            },
        }
    }

    pub fn prompt_style(&self) -> PromptStyle {
        self.prompt.unwrap_or(match self.variant {
            Variant::FullPlays => PromptStyle::Framed,
            Variant::PartialThenFull => PromptStyle::Hypothetical,
        })
    }

    /// Trial list in presentation order.
    pub fn trial_order(&self) -> Vec<TrialDescriptor> {
        let mut trials = self.trials.clone();
        if self.shuffle_trials {
            let seed = self
                .shuffle_seed
                .unwrap_or(u64::from(self.counterbalance));
            trials.shuffle(&mut StdRng::seed_from_u64(seed));
        }
        trials
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_uses_full_plays_defaults() {
        let config = ExperimentConfig::from_json_str("{}").unwrap();
        assert_eq!(config.variant, Variant::FullPlays);
        assert_eq!(
            config.readiness(),
            ReadinessPolicy::FullPlays { required_plays: 2 }
        );
        assert_eq!(config.prompt_style(), PromptStyle::Framed);
        let key: Vec<&str> = config
            .comprehension
            .iter()
            .map(|q| q.expected.as_str())
            .collect();
        assert_eq!(key, ["A", "C", "C"]);
    }

    #[test]
    fn partial_variant_switches_gate_prompt_and_key() {
        let config =
            ExperimentConfig::from_json_str(r#"{"variant":"partial_then_full","required_plays":3}"#)
                .unwrap();
        assert_eq!(
            config.readiness(),
            ReadinessPolicy::PartialThenFull {
                required_partial_plays: 3
            }
        );
        assert_eq!(config.prompt_style(), PromptStyle::Hypothetical);
        assert_eq!(config.comprehension[2].expected, "D");
    }

    #[test]
    fn duplicate_trial_ids_are_rejected() {
        let err = ExperimentConfig::from_json_str(
            r#"{"trials":[{"id":1,"name":"a","gate_pass":1},{"id":1,"name":"b","gate_pass":0}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unanswerable_survey_lists_are_rejected() {
        for json in [
            r#"{"demographics":{"genders":[]}}"#,
            r#"{"demographics":{"ethnicities":[]}}"#,
        ] {
            let err = ExperimentConfig::from_json_str(json).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{json}");
        }
        let config = ExperimentConfig::from_json_str(r#"{"demographics":{"races":[]}}"#).unwrap();
        assert!(config.demographics.races.is_empty());
    }

    #[test]
    fn zero_required_plays_is_rejected() {
        assert!(ExperimentConfig::from_json_str(r#"{"required_plays":0}"#).is_err());
    }

    #[test]
    fn unknown_expected_answer_is_rejected() {
        let json = r#"{"comprehension":[{"name":"q","prompt":"?","options":[{"value":"A","label":"a"}],"expected":"B"}]}"#;
        assert!(ExperimentConfig::from_json_str(json).is_err());
    }

    #[test]
    fn shuffle_is_reproducible_per_seed() {
        let trials = (0..20)
            .map(|id| TrialDescriptor {
                id,
                name: format!("clip_{id}"),
                gate_pass: (id % 2) as u8,
            })
            .collect();
        let config = ExperimentConfig {
            trials,
            shuffle_trials: true,
            shuffle_seed: Some(7),
            ..ExperimentConfig::default()
        };
        let first = config.trial_order();
        assert_eq!(first, config.trial_order());
        assert_eq!(first.len(), 20);
        assert_ne!(first, config.trials);
    }

    #[test]
    fn demo_configs_are_valid() {
        let full = ExperimentConfig::from_json_str(include_str!("../../demos/full_plays.json"))
            .unwrap();
        assert_eq!(full.trial_order().len(), 4);
        let partial =
            ExperimentConfig::from_json_str(include_str!("../../demos/partial_then_full.json"))
                .unwrap();
        assert_eq!(partial.variant, Variant::PartialThenFull);
        assert_eq!(partial.condition, 1);
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"condition":1,"counterbalance":2,"trials":[{{"id":1,"name":"v1","gate_pass":1}}]}}"#
        )
        .unwrap();
        let config = ExperimentConfig::load(file.path()).unwrap();
        assert_eq!(config.condition, 1);
        assert_eq!(config.trials.len(), 1);

        let missing = ExperimentConfig::load(Path::new("/nonexistent/experiment.json"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
