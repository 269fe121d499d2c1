//! Read-only snapshots of the live screen, handed to the renderer each frame.

use crate::{Clip, ScaleLabels, TrialStage};

#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub struct ButtonView {
    pub label: &'static str,
    pub visible: bool,
    pub enabled: bool,
}

impl ButtonView {
    pub const fn hidden(label: &'static str) -> Self {
        Self {
            label,
            visible: false,
            enabled: false,
        }
    }

    pub const fn shown(label: &'static str, enabled: bool) -> Self {
        Self {
            label,
            visible: true,
            enabled,
        }
    }
}

/// Static text page with a single action
#[derive(Debug, Clone)]
pub struct PageView<'a> {
    pub title: &'a str,
    pub lines: &'a [String],
    pub action: ButtonView,
}

#[derive(Debug, Clone)]
pub struct QuestionView<'a> {
    pub prompt: &'a str,
    /// `(value, label)` pairs.
    pub options: Vec<(&'a str, &'a str)>,
    pub selected: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct TrialView<'a> {
    pub prompt: &'static str,
    pub labels: ScaleLabels,
    pub clip: Clip,
    pub clip_name: &'a str,
    pub playing: bool,
    pub stage: TrialStage,
    pub play: ButtonView,
    pub slider_visible: bool,
    pub rating: Option<u8>,
    /// "Full video" button of the two-stage gate.
    pub rate: ButtonView,
    pub advance: ButtonView,
    pub replay_hint: bool,
}

/// Survey rows, in keyboard focus order
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum DemographicsField {
    Gender,
    Age,
    Race,
    Ethnicity,
    Feedback,
    Finish,
}

impl DemographicsField {
    pub const ALL: [DemographicsField; 6] = [
        DemographicsField::Gender,
        DemographicsField::Age,
        DemographicsField::Race,
        DemographicsField::Ethnicity,
        DemographicsField::Feedback,
        DemographicsField::Finish,
    ];

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone)]
pub struct DemographicsView<'a> {
    pub genders: &'a [String],
    pub gender: Option<usize>,
    pub age_text: &'a str,
    pub age_prefer_not: bool,
    pub races: &'a [String],
    pub race: Option<usize>,
    pub race_prefer_not: bool,
    pub ethnicities: &'a [String],
    pub ethnicity: Option<usize>,
    pub feedback: &'a str,
    pub finish: ButtonView,
}

#[derive(Debug, Clone)]
pub enum ScreenView<'a> {
    Page(PageView<'a>),
    Comprehension {
        questions: Vec<QuestionView<'a>>,
        submit: ButtonView,
    },
    Trial(TrialView<'a>),
    Demographics(DemographicsView<'a>),
}
