use std::fmt;

/// Where the submission sequence currently stands
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionStage {
    Saving,
    Failed { attempts: u32 },
    Resubmitting { attempt: u32 },
    Completed,
    Abandoned,
}

/// The single live screen of a session
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Instructions,
    Comprehension,
    ComprehensionFail,
    Reminder,
    Trial(usize),
    Demographics,
    Submitting(SubmissionStage),
}

/// Coarse outcomes that move a session from one screen to the next
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Continue,
    ComprehensionPassed,
    ComprehensionFailed,
    TrialCompleted,
    DemographicsFinished,
    SaveSucceeded,
    SaveFailed,
    Resubmit,
    ResubmitPromptDue,
}

/// Session-wide bounds the transition function needs
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    pub trial_count: usize,
    pub max_resubmit_attempts: u32,
}

impl Screen {
    /// First screen of the trial phase; an empty trial list skips straight to the survey.
    pub fn first_trial(limits: Limits) -> Screen {
        if limits.trial_count == 0 {
            Screen::Demographics
        } else {
            Screen::Trial(0)
        }
    }

    /// Pure transition function. `None` means the signal does not apply here.
    pub fn next(self, signal: Signal, limits: Limits) -> Option<Screen> {
        use Screen::*;
        use Signal::*;
        use SubmissionStage::*;

        Some(match (self, signal) {
            (Instructions, Continue) => Comprehension,
            (Comprehension, ComprehensionPassed) => Reminder,
            (Comprehension, ComprehensionFailed) => ComprehensionFail,
            (ComprehensionFail, Continue) => Instructions,
            (Reminder, Continue) => Screen::first_trial(limits),
            (Trial(index), TrialCompleted) => {
                let next = index + 1;
                if next >= limits.trial_count {
                    Demographics
                } else {
                    Trial(next)
                }
            }
            (Demographics, DemographicsFinished) => Submitting(Saving),

            (Submitting(Saving | Failed { .. } | Resubmitting { .. }), SaveSucceeded) => {
                Submitting(Completed)
            }
            (Submitting(Saving), SaveFailed) => Submitting(Failed { attempts: 0 }),
            (Submitting(Resubmitting { attempt }), SaveFailed | ResubmitPromptDue) => {
                if attempt >= limits.max_resubmit_attempts {
                    Submitting(Abandoned)
                } else {
                    Submitting(Failed { attempts: attempt })
                }
            }
            (Submitting(Failed { attempts }), Resubmit) => Submitting(Resubmitting {
                attempt: attempts + 1,
            }),
            _ => return None,
        })
    }

    pub fn is_trial(&self) -> bool {
        matches!(self, Screen::Trial(_))
    }

    pub fn trial_index(&self) -> Option<usize> {
        match self {
            Screen::Trial(index) => Some(*index),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Screen::Submitting(SubmissionStage::Completed | SubmissionStage::Abandoned)
        )
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Screen::Instructions => f.write_str("instructions"),
            Screen::Comprehension => f.write_str("comprehension"),
            Screen::ComprehensionFail => f.write_str("comprehension-fail"),
            Screen::Reminder => f.write_str("reminder"),
            Screen::Trial(index) => write!(f, "trial #{index}"),
            Screen::Demographics => f.write_str("demographics"),
            Screen::Submitting(stage) => write!(f, "submitting ({stage:?})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: Limits = Limits {
        trial_count: 2,
        max_resubmit_attempts: 2,
    };

    #[test]
    fn linear_path_through_the_study() {
        let mut screen = Screen::default();
        for signal in [
            Signal::Continue,
            Signal::ComprehensionPassed,
            Signal::Continue,
            Signal::TrialCompleted,
            Signal::TrialCompleted,
            Signal::DemographicsFinished,
            Signal::SaveSucceeded,
        ] {
            screen = screen.next(signal, LIMITS).expect("signal applies");
        }
        assert_eq!(screen, Screen::Submitting(SubmissionStage::Completed));
        assert!(screen.is_terminal());
    }

    #[test]
    fn comprehension_failure_loops_back_to_instructions() {
        let fail = Screen::Comprehension
            .next(Signal::ComprehensionFailed, LIMITS)
            .unwrap();
        assert_eq!(fail, Screen::ComprehensionFail);
        assert_eq!(
            fail.next(Signal::Continue, LIMITS),
            Some(Screen::Instructions)
        );
    }

    #[test]
    fn last_trial_leads_to_demographics() {
        assert_eq!(
            Screen::Trial(0).next(Signal::TrialCompleted, LIMITS),
            Some(Screen::Trial(1))
        );
        assert_eq!(
            Screen::Trial(1).next(Signal::TrialCompleted, LIMITS),
            Some(Screen::Demographics)
        );
    }

    #[test]
    fn empty_trial_list_skips_to_demographics() {
        let limits = Limits {
            trial_count: 0,
            ..LIMITS
        };
        assert_eq!(
            Screen::Reminder.next(Signal::Continue, limits),
            Some(Screen::Demographics)
        );
    }

    #[test]
    fn unrelated_signals_do_not_apply() {
        assert_eq!(Screen::Instructions.next(Signal::TrialCompleted, LIMITS), None);
        assert_eq!(Screen::Trial(0).next(Signal::Continue, LIMITS), None);
        assert_eq!(
            Screen::Submitting(SubmissionStage::Completed).next(Signal::Resubmit, LIMITS),
            None
        );
    }

    #[test]
    fn resubmission_is_bounded() {
        use SubmissionStage::*;
        let mut screen = Screen::Submitting(Saving)
            .next(Signal::SaveFailed, LIMITS)
            .unwrap();
        assert_eq!(screen, Screen::Submitting(Failed { attempts: 0 }));

        screen = screen.next(Signal::Resubmit, LIMITS).unwrap();
        assert_eq!(screen, Screen::Submitting(Resubmitting { attempt: 1 }));
        screen = screen.next(Signal::ResubmitPromptDue, LIMITS).unwrap();
        assert_eq!(screen, Screen::Submitting(Failed { attempts: 1 }));

        screen = screen.next(Signal::Resubmit, LIMITS).unwrap();
        screen = screen.next(Signal::SaveFailed, LIMITS).unwrap();
        assert_eq!(screen, Screen::Submitting(Abandoned));
        assert!(screen.is_terminal());
    }

    #[test]
    fn late_success_after_failure_still_completes() {
        let screen = Screen::Submitting(SubmissionStage::Failed { attempts: 1 });
        assert_eq!(
            screen.next(Signal::SaveSucceeded, LIMITS),
            Some(Screen::Submitting(SubmissionStage::Completed))
        );
    }
}
