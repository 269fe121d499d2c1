use serde::{Deserialize, Serialize};

/// One entry of the preloaded trial list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialDescriptor {
    pub id: u32,
    /// Clip name, resolved against the media root.
    pub name: String,
    /// 1 when ball B went through the gate ("caused" framing).
    pub gate_pass: u8,
}

impl TrialDescriptor {
    pub fn framing(&self) -> Framing {
        if self.gate_pass == 1 {
            Framing::Caused
        } else {
            Framing::Prevented
        }
    }
}

#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum Framing {
    Caused,
    Prevented,
}

impl Framing {
    pub fn statement(&self) -> &'static str {
        match self {
            Framing::Caused => "Ball A has caused Ball B to go through the gate.",
            Framing::Prevented => "Ball A has prevented Ball B from going through the gate.",
        }
    }
}

/// Which judgment prompt a trial shows above the rating scale
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStyle {
    /// Caused/prevented statement chosen by the trial's outcome.
    #[default]
    Framed,
    /// The same counterfactual statement on every trial.
    Hypothetical,
}

impl PromptStyle {
    pub fn statement(&self, framing: Framing) -> &'static str {
        match self {
            PromptStyle::Framed => framing.statement(),
            PromptStyle::Hypothetical => "Ball B would go through the gate if ball A wasn't there.",
        }
    }
}

/// End labels of the rating slider, ordered by the participant's condition
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub struct ScaleLabels {
    pub left: &'static str,
    pub right: &'static str,
}

impl ScaleLabels {
    pub fn for_condition(condition: u32) -> Self {
        if condition == 0 {
            Self {
                left: "not at all",
                right: "very much",
            }
        } else {
            Self {
                left: "very much",
                right: "not at all",
            }
        }
    }
}

/// Video clips a trial can show
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash)]
pub enum Clip {
    Partial,
    Full,
}

impl Clip {
    /// Directory under the media root holding this kind of clip.
    pub fn dir(&self) -> &'static str {
        match self {
            Clip::Partial => "part",
            Clip::Full => "full",
        }
    }
}
