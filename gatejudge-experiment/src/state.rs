use super::comprehension::{ComprehensionForm, Grade};
use super::config::ExperimentConfig;
use super::demographics::DemographicsForm;
use super::trial::{TrialInput, TrialRun};
use gatejudge_core::{
    ButtonView, Clip, Limits, PageView, QuestionView, ResponseRecord, ScaleLabels, Screen,
    ScreenView, Signal, SubmissionStage, TrialDescriptor,
};
use gatejudge_timing::Timer;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Participant input and collaborator callbacks
#[derive(Debug, Clone, PartialEq)]
pub enum ExperimentEvent {
    Continue,
    SelectAnswer { question: usize, option: usize },
    SubmitComprehension,
    PlayPressed,
    ClipEnded(Clip),
    SliderMoved(u8),
    SubmitRating,
    NextTrial,
    SelectGender(usize),
    SetAge(String),
    ToggleAgePreferNot,
    SelectRace(usize),
    ToggleRacePreferNot,
    SelectEthnicity(usize),
    SetFeedback(String),
    FinishSurvey,
    SaveSucceeded,
    SaveFailed,
    Resubmit,
    ResubmitPromptDue,
}

/// Calls the caller must make on the hosting collaborator, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    RecordTrial(ResponseRecord),
    RecordUnstructured { key: String, value: String },
    SaveData,
    CompleteTask,
    ScheduleResubmitPrompt(Duration),
    CancelResubmitPrompt,
}

impl Effect {
    fn unstructured(key: &str, value: impl Into<String>) -> Self {
        Effect::RecordUnstructured {
            key: key.to_owned(),
            value: value.into(),
        }
    }
}

/// Screen-local state; dropped when the screen is left
enum Active<Ts> {
    Static,
    Comprehension(ComprehensionForm),
    Trial(TrialRun<Ts>),
    Demographics(DemographicsForm),
}

enum Routed {
    Ignored,
    Handled,
    Signal(Signal),
}

fn handled_if(applied: bool) -> Routed {
    if applied {
        Routed::Handled
    } else {
        Routed::Ignored
    }
}

pub struct ExperimentStateMachine<T: Timer> {
    pub timer: T,
    config: ExperimentConfig,
    trials: Vec<TrialDescriptor>,
    screen: Screen,
    active: Active<T::Timestamp>,
    completed_trials: usize,
    results: Vec<ResponseRecord>,
    started: bool,
}

impl<T: Timer> ExperimentStateMachine<T> {
    pub fn new(config: ExperimentConfig, timer: T) -> Self {
        let config = config.resolve();
        let trials = config.trial_order();
        Self {
            timer,
            config,
            trials,
            screen: Screen::Instructions,
            active: Active::Static,
            completed_trials: 0,
            results: Vec::new(),
            started: false,
        }
    }

    fn limits(&self) -> Limits {
        Limits {
            trial_count: self.trials.len(),
            max_resubmit_attempts: self.config.max_resubmit_attempts,
        }
    }

    /// Records the assignment and shows the first screen.
    pub fn start(&mut self) -> Vec<Effect> {
        if self.started {
            warn!("session already started");
            return Vec::new();
        }
        self.started = true;
        info!(
            condition = self.config.condition,
            counterbalance = self.config.counterbalance,
            trials = self.trials.len(),
            "starting session"
        );
        let mut effects = vec![
            Effect::unstructured("condition", self.config.condition.to_string()),
            Effect::unstructured("counterbalance", self.config.counterbalance.to_string()),
        ];
        let first = if self.config.skip_instructions {
            Screen::first_trial(self.limits())
        } else {
            Screen::Instructions
        };
        self.enter(first, &mut effects);
        effects
    }

    pub fn handle_event(&mut self, event: ExperimentEvent) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !self.started {
            debug!(?event, "session not started yet");
            return effects;
        }
        match self.route(&event, &mut effects) {
            Routed::Ignored => debug!(?event, screen = %self.screen, "ignoring event"),
            Routed::Handled => {}
            Routed::Signal(signal) => self.apply_signal(signal, &mut effects),
        }
        effects
    }

    fn route(&mut self, event: &ExperimentEvent, effects: &mut Vec<Effect>) -> Routed {
        use ExperimentEvent as E;

        let screen = self.screen;
        match (&mut self.active, event) {
            (Active::Static, E::Continue)
                if matches!(
                    screen,
                    Screen::Instructions | Screen::ComprehensionFail | Screen::Reminder
                ) =>
            {
                Routed::Signal(Signal::Continue)
            }

            (Active::Comprehension(form), E::SelectAnswer { question, option }) => {
                handled_if(form.select(&self.config.comprehension, *question, *option))
            }
            (Active::Comprehension(form), E::SubmitComprehension) => {
                match form.grade(&self.config.comprehension) {
                    Some(Grade::Pass) => Routed::Signal(Signal::ComprehensionPassed),
                    Some(Grade::Fail) => Routed::Signal(Signal::ComprehensionFailed),
                    None => Routed::Ignored,
                }
            }

            (Active::Trial(run), E::PlayPressed) => handled_if(run.apply(TrialInput::Play)),
            (Active::Trial(run), E::ClipEnded(clip)) => {
                handled_if(run.apply(TrialInput::ClipEnded(*clip)))
            }
            (Active::Trial(run), E::SliderMoved(value)) => {
                handled_if(run.apply(TrialInput::Rate(*value)))
            }
            (Active::Trial(run), E::SubmitRating) => {
                handled_if(run.apply(TrialInput::SubmitRating))
            }
            (Active::Trial(run), E::NextTrial) => {
                let elapsed = self.timer.elapsed(run.started_at());
                match run.finish(elapsed) {
                    Some(record) => {
                        info!(
                            id = record.id,
                            response = record.response,
                            time_ms = record.time,
                            replays = record.replay_times,
                            "trial completed"
                        );
                        self.completed_trials += 1;
                        self.results.push(record.clone());
                        effects.push(Effect::RecordTrial(record));
                        Routed::Signal(Signal::TrialCompleted)
                    }
                    None => Routed::Ignored,
                }
            }

            (Active::Demographics(form), E::SelectGender(i)) => {
                handled_if(form.select_gender(&self.config.demographics, *i))
            }
            (Active::Demographics(form), E::SetAge(text)) => {
                form.set_age_text(text);
                Routed::Handled
            }
            (Active::Demographics(form), E::ToggleAgePreferNot) => {
                form.toggle_age_prefer_not();
                Routed::Handled
            }
            (Active::Demographics(form), E::SelectRace(i)) => {
                handled_if(form.select_race(&self.config.demographics, *i))
            }
            (Active::Demographics(form), E::ToggleRacePreferNot) => {
                form.toggle_race_prefer_not();
                Routed::Handled
            }
            (Active::Demographics(form), E::SelectEthnicity(i)) => {
                handled_if(form.select_ethnicity(&self.config.demographics, *i))
            }
            (Active::Demographics(form), E::SetFeedback(text)) => {
                form.set_feedback(text);
                Routed::Handled
            }
            (Active::Demographics(form), E::FinishSurvey) => {
                match form.answers(&self.config.demographics) {
                    Some(answers) => {
                        effects.extend(
                            answers
                                .into_iter()
                                .map(|(key, value)| Effect::unstructured(key, value)),
                        );
                        Routed::Signal(Signal::DemographicsFinished)
                    }
                    None => Routed::Ignored,
                }
            }

            (Active::Static, E::SaveSucceeded) => Routed::Signal(Signal::SaveSucceeded),
            (Active::Static, E::SaveFailed) => Routed::Signal(Signal::SaveFailed),
            (Active::Static, E::Resubmit) => Routed::Signal(Signal::Resubmit),
            (Active::Static, E::ResubmitPromptDue) => Routed::Signal(Signal::ResubmitPromptDue),

            _ => Routed::Ignored,
        }
    }

    fn apply_signal(&mut self, signal: Signal, effects: &mut Vec<Effect>) {
        let Some(next) = self.screen.next(signal, self.limits()) else {
            debug!(?signal, screen = %self.screen, "signal does not apply");
            return;
        };
        if matches!(
            self.screen,
            Screen::Submitting(SubmissionStage::Resubmitting { .. })
        ) && signal != Signal::ResubmitPromptDue
        {
            effects.push(Effect::CancelResubmitPrompt);
        }
        self.enter(next, effects);
    }

    /// Install the state of `next`; whatever the previous screen held is dropped here.
    fn enter(&mut self, next: Screen, effects: &mut Vec<Effect>) {
        info!("screen {} -> {}", self.screen, next);
        self.screen = next;
        self.active = match next {
            Screen::Comprehension => {
                Active::Comprehension(ComprehensionForm::new(self.config.comprehension.len()))
            }
            Screen::Trial(index) => match self.trials.get(index) {
                Some(trial) => {
                    let now = self.timer.now();
                    info!(index, id = trial.id, name = %trial.name, "trial started at {:?}", now);
                    Active::Trial(TrialRun::new(trial.clone(), self.config.readiness(), now))
                }
                None => {
                    warn!(index, "no trial at index, moving on to the survey");
                    self.screen = Screen::Demographics;
                    Active::Demographics(DemographicsForm::new())
                }
            },
            Screen::Demographics => Active::Demographics(DemographicsForm::new()),
            Screen::Submitting(stage) => {
                match stage {
                    SubmissionStage::Saving => effects.push(Effect::SaveData),
                    SubmissionStage::Resubmitting { attempt } => {
                        info!(attempt, "resubmitting session data");
                        effects.push(Effect::ScheduleResubmitPrompt(Duration::from_millis(
                            self.config.resubmit_delay_ms,
                        )));
                        effects.push(Effect::SaveData);
                    }
                    SubmissionStage::Completed => effects.push(Effect::CompleteTask),
                    SubmissionStage::Failed { attempts } => {
                        warn!(attempts, "submission failed, waiting for resubmit")
                    }
                    SubmissionStage::Abandoned => {
                        warn!("giving up on submission after repeated failures")
                    }
                }
                Active::Static
            }
            Screen::Instructions | Screen::ComprehensionFail | Screen::Reminder => Active::Static,
        };
    }

    pub fn view(&self) -> ScreenView<'_> {
        match &self.active {
            Active::Comprehension(form) => ScreenView::Comprehension {
                questions: self
                    .config
                    .comprehension
                    .iter()
                    .enumerate()
                    .map(|(i, q)| QuestionView {
                        prompt: &q.prompt,
                        options: q
                            .options
                            .iter()
                            .map(|o| (o.value.as_str(), o.label.as_str()))
                            .collect(),
                        selected: form.selected(i),
                    })
                    .collect(),
                submit: ButtonView::shown("Continue", form.all_answered()),
            },
            Active::Trial(run) => ScreenView::Trial(run.view(
                self.config.prompt_style(),
                ScaleLabels::for_condition(self.config.condition),
            )),
            Active::Demographics(form) => {
                ScreenView::Demographics(form.view(&self.config.demographics))
            }
            Active::Static => ScreenView::Page(self.page_view()),
        }
    }

    fn page_view(&self) -> PageView<'_> {
        use SubmissionStage::*;

        let pages = &self.config.pages;
        let (page, action) = match self.screen {
            Screen::Instructions => (&pages.instructions, ButtonView::shown("Next", true)),
            Screen::ComprehensionFail => (
                &pages.comprehension_fail,
                ButtonView::shown("Back to instructions", true),
            ),
            Screen::Reminder => (&pages.reminder, ButtonView::shown("Begin", true)),
            Screen::Submitting(Failed { .. }) => {
                (&pages.submit_error, ButtonView::shown("Resubmit", true))
            }
            Screen::Submitting(Resubmitting { .. }) => {
                (&pages.resubmitting, ButtonView::hidden("Resubmit"))
            }
            Screen::Submitting(Completed) => (&pages.completed, ButtonView::hidden("")),
            Screen::Submitting(Abandoned) => (&pages.abandoned, ButtonView::hidden("")),
            Screen::Submitting(Saving)
            | Screen::Comprehension
            | Screen::Trial(_)
            | Screen::Demographics => (&pages.submitting, ButtonView::hidden("")),
        };
        PageView {
            title: &page.title,
            lines: &page.lines,
            action,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Trial list in presentation order
    pub fn trials(&self) -> &[TrialDescriptor] {
        &self.trials
    }

    pub fn results(&self) -> &[ResponseRecord] {
        &self.results
    }

    pub fn completed_trials(&self) -> usize {
        self.completed_trials
    }

    pub fn current_trial(&self) -> Option<&TrialRun<T::Timestamp>> {
        match &self.active {
            Active::Trial(run) => Some(run),
            _ => None,
        }
    }

    /// `(completed, total)` while a trial is on screen.
    pub fn trial_progress(&self) -> Option<(usize, usize)> {
        self.screen
            .is_trial()
            .then_some((self.completed_trials, self.trials.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatejudge_core::TrialStage;
    use gatejudge_timing::ManualTimer;

    fn config(trials: usize) -> ExperimentConfig {
        ExperimentConfig {
            trials: (0..trials as u32)
                .map(|id| TrialDescriptor {
                    id,
                    name: format!("clip_{id}"),
                    gate_pass: 1,
                })
                .collect(),
            ..ExperimentConfig::default()
        }
    }

    fn started(config: ExperimentConfig) -> ExperimentStateMachine<ManualTimer> {
        let mut machine = ExperimentStateMachine::new(config, ManualTimer::new());
        machine.start();
        machine
    }

    fn pass_comprehension(machine: &mut ExperimentStateMachine<ManualTimer>) {
        for (question, option) in [(0, 0), (1, 2), (2, 2)] {
            machine.handle_event(ExperimentEvent::SelectAnswer { question, option });
        }
        machine.handle_event(ExperimentEvent::SubmitComprehension);
    }

    #[test]
    fn start_records_assignment() {
        let mut machine = ExperimentStateMachine::new(
            ExperimentConfig {
                condition: 1,
                counterbalance: 3,
                ..config(1)
            },
            ManualTimer::new(),
        );
        let effects = machine.start();
        assert_eq!(
            effects,
            vec![
                Effect::unstructured("condition", "1"),
                Effect::unstructured("counterbalance", "3"),
            ]
        );
        assert_eq!(machine.screen(), Screen::Instructions);
        assert!(machine.start().is_empty());
    }

    #[test]
    fn events_before_start_are_ignored() {
        let mut machine = ExperimentStateMachine::new(config(1), ManualTimer::new());
        assert!(machine.handle_event(ExperimentEvent::Continue).is_empty());
        assert_eq!(machine.screen(), Screen::Instructions);
    }

    #[test]
    fn comprehension_continue_needs_all_answers() {
        let mut machine = started(config(1));
        machine.handle_event(ExperimentEvent::Continue);
        assert_eq!(machine.screen(), Screen::Comprehension);
        machine.handle_event(ExperimentEvent::SelectAnswer {
            question: 0,
            option: 0,
        });
        match machine.view() {
            ScreenView::Comprehension { submit, .. } => assert!(!submit.enabled),
            other => panic!("unexpected view {other:?}"),
        }
        machine.handle_event(ExperimentEvent::SubmitComprehension);
        assert_eq!(machine.screen(), Screen::Comprehension);
    }

    #[test]
    fn failed_comprehension_starts_over_with_fresh_selections() {
        let mut machine = started(config(1));
        machine.handle_event(ExperimentEvent::Continue);
        for question in 0..3 {
            machine.handle_event(ExperimentEvent::SelectAnswer {
                question,
                option: 1,
            });
        }
        machine.handle_event(ExperimentEvent::SubmitComprehension);
        assert_eq!(machine.screen(), Screen::ComprehensionFail);
        machine.handle_event(ExperimentEvent::Continue);
        assert_eq!(machine.screen(), Screen::Instructions);
        machine.handle_event(ExperimentEvent::Continue);
        match machine.view() {
            ScreenView::Comprehension { questions, .. } => {
                assert!(questions.iter().all(|q| q.selected.is_none()))
            }
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[test]
    fn stale_inputs_do_not_reach_other_screens() {
        let mut machine = started(config(1));
        assert!(machine.handle_event(ExperimentEvent::PlayPressed).is_empty());
        assert!(machine.handle_event(ExperimentEvent::FinishSurvey).is_empty());
        assert!(machine.handle_event(ExperimentEvent::SaveSucceeded).is_empty());
        assert_eq!(machine.screen(), Screen::Instructions);
    }

    #[test]
    fn response_time_comes_from_the_timer() {
        let mut machine = started(config(1));
        machine.handle_event(ExperimentEvent::Continue);
        pass_comprehension(&mut machine);
        assert_eq!(machine.screen(), Screen::Reminder);
        machine.handle_event(ExperimentEvent::Continue);
        assert_eq!(machine.trial_progress(), Some((0, 1)));

        for _ in 0..2 {
            machine.handle_event(ExperimentEvent::PlayPressed);
            machine.timer.advance(Duration::from_millis(1000));
            machine.handle_event(ExperimentEvent::ClipEnded(Clip::Full));
        }
        assert_eq!(
            machine.current_trial().map(|r| r.stage()),
            Some(TrialStage::Rating)
        );
        machine.handle_event(ExperimentEvent::SliderMoved(55));
        machine.timer.advance(Duration::from_millis(500));
        let effects = machine.handle_event(ExperimentEvent::NextTrial);
        match effects.as_slice() {
            [Effect::RecordTrial(record)] => {
                assert_eq!(record.response, 55);
                assert!((record.time - 2500.0).abs() < 1e-6);
            }
            other => panic!("unexpected effects {other:?}"),
        }
        assert_eq!(machine.screen(), Screen::Demographics);
        assert_eq!(machine.trial_progress(), None);
    }

    #[test]
    fn skip_instructions_starts_with_first_trial() {
        let machine = started(ExperimentConfig {
            skip_instructions: true,
            ..config(2)
        });
        assert_eq!(machine.screen(), Screen::Trial(0));
        assert!(machine.current_trial().is_some());
    }

    #[test]
    fn survey_answers_are_recorded_before_saving() {
        let mut machine = started(ExperimentConfig {
            skip_instructions: true,
            ..config(0)
        });
        assert_eq!(machine.screen(), Screen::Demographics);
        machine.handle_event(ExperimentEvent::SelectGender(1));
        machine.handle_event(ExperimentEvent::SetAge("29".into()));
        machine.handle_event(ExperimentEvent::ToggleRacePreferNot);
        assert!(machine.handle_event(ExperimentEvent::FinishSurvey).is_empty());
        machine.handle_event(ExperimentEvent::SelectEthnicity(0));
        let effects = machine.handle_event(ExperimentEvent::FinishSurvey);
        assert_eq!(effects.len(), 6);
        assert_eq!(effects[3], Effect::unstructured("race", "NA"));
        assert_eq!(effects[5], Effect::SaveData);
        assert_eq!(
            machine.screen(),
            Screen::Submitting(SubmissionStage::Saving)
        );
    }

    #[test]
    fn resubmission_schedules_and_cancels_prompt() {
        let mut machine = started(ExperimentConfig {
            skip_instructions: true,
            resubmit_delay_ms: 2000,
            ..config(0)
        });
        machine.handle_event(ExperimentEvent::SelectGender(0));
        machine.handle_event(ExperimentEvent::ToggleAgePreferNot);
        machine.handle_event(ExperimentEvent::SelectRace(0));
        machine.handle_event(ExperimentEvent::SelectEthnicity(0));
        machine.handle_event(ExperimentEvent::FinishSurvey);

        machine.handle_event(ExperimentEvent::SaveFailed);
        assert_eq!(
            machine.screen(),
            Screen::Submitting(SubmissionStage::Failed { attempts: 0 })
        );
        let effects = machine.handle_event(ExperimentEvent::Resubmit);
        assert_eq!(
            effects,
            vec![
                Effect::ScheduleResubmitPrompt(Duration::from_millis(2000)),
                Effect::SaveData
            ]
        );
        let effects = machine.handle_event(ExperimentEvent::SaveSucceeded);
        assert_eq!(
            effects,
            vec![Effect::CancelResubmitPrompt, Effect::CompleteTask]
        );
        assert!(machine.screen().is_terminal());
    }
}
