use std::collections::VecDeque;
use std::time::Duration;

use gatejudge_core::Screen;
use gatejudge_timing::Timer;
use tracing::{info, warn};

use crate::config::ExperimentConfig;
use crate::host::Host;
use crate::state::{Effect, ExperimentEvent, ExperimentStateMachine};

/// Drives a state machine against a host: runs effects, feeds save outcomes
/// back in and fires the resubmit prompt once its delay has passed.
pub struct Session<T: Timer, H: Host> {
    machine: ExperimentStateMachine<T>,
    host: H,
    resubmit_prompt: Option<(T::Timestamp, Duration)>,
}

impl<T: Timer, H: Host> Session<T, H> {
    pub fn new(config: ExperimentConfig, timer: T, host: H) -> Self {
        Self {
            machine: ExperimentStateMachine::new(config, timer),
            host,
            resubmit_prompt: None,
        }
    }

    pub fn start(&mut self) {
        let effects = self.machine.start();
        self.run(effects);
    }

    /// Returns true when the event moved the session to another screen.
    pub fn dispatch(&mut self, event: ExperimentEvent) -> bool {
        let before = self.machine.screen();
        let effects = self.machine.handle_event(event);
        self.run(effects);
        self.machine.screen() != before
    }

    /// Call regularly from the event loop.
    pub fn poll(&mut self) {
        if let Some((scheduled_at, delay)) = self.resubmit_prompt {
            if self.machine.timer.elapsed(scheduled_at) >= delay {
                self.resubmit_prompt = None;
                info!("resubmission still pending after {:?}", delay);
                self.dispatch(ExperimentEvent::ResubmitPromptDue);
            }
        }
    }

    fn run(&mut self, effects: Vec<Effect>) {
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            let outcome = match effect {
                Effect::RecordTrial(record) => {
                    self.host.record_trial(&record);
                    None
                }
                Effect::RecordUnstructured { key, value } => {
                    self.host.record_unstructured(&key, &value);
                    None
                }
                Effect::SaveData => match self.host.save_data() {
                    Ok(()) => Some(ExperimentEvent::SaveSucceeded),
                    Err(e) => {
                        warn!(error = %e, "saving session data failed");
                        Some(ExperimentEvent::SaveFailed)
                    }
                },
                Effect::CompleteTask => {
                    if let Err(e) = self.host.complete_task() {
                        warn!(error = %e, "host did not accept task completion");
                    }
                    None
                }
                Effect::ScheduleResubmitPrompt(delay) => {
                    self.resubmit_prompt = Some((self.machine.timer.now(), delay));
                    None
                }
                Effect::CancelResubmitPrompt => {
                    self.resubmit_prompt = None;
                    None
                }
            };
            if let Some(event) = outcome {
                queue.extend(self.machine.handle_event(event));
            }
        }
    }

    pub fn screen(&self) -> Screen {
        self.machine.screen()
    }

    pub fn machine(&self) -> &ExperimentStateMachine<T> {
        &self.machine
    }

    pub fn timer(&self) -> &T {
        &self.machine.timer
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn resubmit_pending(&self) -> bool {
        self.resubmit_prompt.is_some()
    }
}
