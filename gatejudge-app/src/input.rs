use gatejudge_core::{
    DemographicsField, DemographicsView, QuestionView, Screen, ScreenView, SubmissionStage,
    TrialView,
};
use gatejudge_experiment::ExperimentEvent;
use gatejudge_render::Focus;
use winit::event::KeyEvent;
use winit::keyboard::{Key as LogicalKey, NamedKey};

/// First slider move lands here.
const SLIDER_START: u8 = 50;
const SLIDER_STEP: u8 = 5;

/// Keys the experiment reacts to
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Enter,
    Space,
    Up,
    Down,
    Left,
    Right,
    Tab,
    Backspace,
    Escape,
    Char(char),
}

impl Key {
    pub fn from_winit(event: &KeyEvent) -> Option<Self> {
        match &event.logical_key {
            LogicalKey::Named(named) => match named {
                NamedKey::Enter => Some(Key::Enter),
                NamedKey::Space => Some(Key::Space),
                NamedKey::ArrowUp => Some(Key::Up),
                NamedKey::ArrowDown => Some(Key::Down),
                NamedKey::ArrowLeft => Some(Key::Left),
                NamedKey::ArrowRight => Some(Key::Right),
                NamedKey::Tab => Some(Key::Tab),
                NamedKey::Backspace => Some(Key::Backspace),
                NamedKey::Escape => Some(Key::Escape),
                _ => None,
            },
            LogicalKey::Character(s) => s
                .chars()
                .next()
                .map(|c| if c == ' ' { Key::Space } else { Key::Char(c) }),
            _ => None,
        }
    }
}

/// Keyboard focus within the current screen; reset on every screen change
#[derive(Debug, Default)]
pub struct InputState {
    question: usize,
    field: Option<DemographicsField>,
}

impl InputState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn focus(&self, view: &ScreenView<'_>) -> Focus {
        match view {
            ScreenView::Comprehension { .. } => Focus::Question(self.question),
            ScreenView::Demographics(_) => Focus::Field(self.field()),
            _ => Focus::None,
        }
    }

    fn field(&self) -> DemographicsField {
        self.field.unwrap_or(DemographicsField::Gender)
    }

    /// Translate a key press into the event the current screen accepts, if any.
    pub fn map(&mut self, key: Key, screen: Screen, view: &ScreenView<'_>) -> Option<ExperimentEvent> {
        match view {
            ScreenView::Page(page) => {
                if !matches!(key, Key::Enter | Key::Space) || !page.action.enabled {
                    return None;
                }
                match screen {
                    Screen::Submitting(SubmissionStage::Failed { .. }) => {
                        Some(ExperimentEvent::Resubmit)
                    }
                    Screen::Instructions | Screen::ComprehensionFail | Screen::Reminder => {
                        Some(ExperimentEvent::Continue)
                    }
                    _ => None,
                }
            }
            ScreenView::Comprehension { questions, .. } => self.comprehension(key, questions),
            ScreenView::Trial(trial) => trial_key(key, trial),
            ScreenView::Demographics(d) => self.demographics(key, d),
        }
    }

    fn comprehension(&mut self, key: Key, questions: &[QuestionView<'_>]) -> Option<ExperimentEvent> {
        let count = questions.len();
        if count == 0 {
            return None;
        }
        self.question = self.question.min(count - 1);
        let q = &questions[self.question];
        match key {
            Key::Up => {
                self.question = (self.question + count - 1) % count;
                None
            }
            Key::Down | Key::Tab => {
                self.question = (self.question + 1) % count;
                None
            }
            Key::Left | Key::Right => {
                let option = step(q.options.len(), q.selected, key == Key::Right, false)?;
                Some(ExperimentEvent::SelectAnswer {
                    question: self.question,
                    option,
                })
            }
            Key::Char(c) => {
                let mut buf = [0u8; 4];
                let typed: &str = c.encode_utf8(&mut buf);
                let option = q
                    .options
                    .iter()
                    .position(|(value, _)| value.eq_ignore_ascii_case(typed))?;
                let question = self.question;
                self.question = (self.question + 1).min(count - 1);
                Some(ExperimentEvent::SelectAnswer { question, option })
            }
            Key::Enter => Some(ExperimentEvent::SubmitComprehension),
            _ => None,
        }
    }

    fn demographics(&mut self, key: Key, d: &DemographicsView<'_>) -> Option<ExperimentEvent> {
        use DemographicsField as F;

        let field = self.field();
        match (key, field) {
            (Key::Tab | Key::Down, _) => {
                self.field = Some(field.next());
                None
            }
            (Key::Up, _) => {
                self.field = Some(field.prev());
                None
            }
            (Key::Enter | Key::Space, F::Finish) => Some(ExperimentEvent::FinishSurvey),
            (Key::Enter, _) => {
                self.field = Some(field.next());
                None
            }
            (Key::Left | Key::Right, F::Gender) => {
                step(d.genders.len(), d.gender, key == Key::Right, true)
                    .map(ExperimentEvent::SelectGender)
            }
            (Key::Left | Key::Right, F::Race) => {
                step(d.races.len(), d.race, key == Key::Right, true).map(ExperimentEvent::SelectRace)
            }
            (Key::Left | Key::Right, F::Ethnicity) => {
                step(d.ethnicities.len(), d.ethnicity, key == Key::Right, true)
                    .map(ExperimentEvent::SelectEthnicity)
            }
            (Key::Char('p' | 'P'), F::Age) => Some(ExperimentEvent::ToggleAgePreferNot),
            (Key::Char('p' | 'P'), F::Race) => Some(ExperimentEvent::ToggleRacePreferNot),
            (Key::Char(c), F::Age) if c.is_ascii_digit() => {
                Some(ExperimentEvent::SetAge(format!("{}{c}", d.age_text)))
            }
            (Key::Backspace, F::Age) => {
                let mut text = d.age_text.to_owned();
                text.pop()?;
                Some(ExperimentEvent::SetAge(text))
            }
            (Key::Char(c), F::Feedback) => {
                Some(ExperimentEvent::SetFeedback(format!("{}{c}", d.feedback)))
            }
            (Key::Space, F::Feedback) => {
                Some(ExperimentEvent::SetFeedback(format!("{} ", d.feedback)))
            }
            (Key::Backspace, F::Feedback) => {
                let mut text = d.feedback.to_owned();
                text.pop()?;
                Some(ExperimentEvent::SetFeedback(text))
            }
            _ => None,
        }
    }
}

fn trial_key(key: Key, trial: &TrialView<'_>) -> Option<ExperimentEvent> {
    match key {
        Key::Space => Some(ExperimentEvent::PlayPressed),
        Key::Left | Key::Right if trial.slider_visible => {
            let value = match trial.rating {
                None => SLIDER_START,
                Some(v) if key == Key::Right => v.saturating_add(SLIDER_STEP).min(100),
                Some(v) => v.saturating_sub(SLIDER_STEP),
            };
            Some(ExperimentEvent::SliderMoved(value))
        }
        Key::Enter if trial.rate.visible => Some(ExperimentEvent::SubmitRating),
        Key::Enter => Some(ExperimentEvent::NextTrial),
        _ => None,
    }
}

/// Next option index in a list of `len`; unselected lists start at the first.
fn step(len: usize, current: Option<usize>, forward: bool, wrap: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match current {
        None => 0,
        Some(i) if forward => {
            if wrap {
                (i + 1) % len
            } else {
                (i + 1).min(len - 1)
            }
        }
        Some(i) => {
            if wrap {
                (i + len - 1) % len
            } else {
                i.saturating_sub(1)
            }
        }
    })
}
