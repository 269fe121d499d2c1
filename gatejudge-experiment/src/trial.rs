use std::time::Duration;

use gatejudge_core::{
    ButtonView, Clip, PromptStyle, ResponseRecord, ScaleLabels, TrialDescriptor, TrialStage,
    TrialView,
};
use serde::{Deserialize, Serialize};

/// Interaction required before a trial can be rated and advanced
#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReadinessPolicy {
    /// Watch the full clip `required_plays` times, then rate and continue.
    FullPlays { required_plays: u32 },
    /// Watch the partial clip `required_partial_plays` times, rate, then watch
    /// the full clip to the end before continuing.
    PartialThenFull { required_partial_plays: u32 },
}

impl ReadinessPolicy {
    pub fn required_plays(&self) -> u32 {
        match self {
            ReadinessPolicy::FullPlays { required_plays } => *required_plays,
            ReadinessPolicy::PartialThenFull {
                required_partial_plays,
            } => *required_partial_plays,
        }
    }

    /// Clip the play button controls.
    pub fn primary_clip(&self) -> Clip {
        match self {
            ReadinessPolicy::FullPlays { .. } => Clip::Full,
            ReadinessPolicy::PartialThenFull { .. } => Clip::Partial,
        }
    }

    fn is_two_stage(&self) -> bool {
        matches!(self, ReadinessPolicy::PartialThenFull { .. })
    }
}

/// Participant input routed to the running trial
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum TrialInput {
    Play,
    ClipEnded(Clip),
    Rate(u8),
    SubmitRating,
}

/// One presented trial, from render until its advance action fires
#[derive(Debug, Clone)]
pub struct TrialRun<Ts> {
    trial: TrialDescriptor,
    policy: ReadinessPolicy,
    started_at: Ts,
    plays: u32,
    playing: Option<Clip>,
    shown: Clip,
    rating: Option<u8>,
    locked_replays: Option<u32>,
    stage: TrialStage,
}

impl<Ts: Copy> TrialRun<Ts> {
    pub fn new(trial: TrialDescriptor, policy: ReadinessPolicy, started_at: Ts) -> Self {
        Self {
            trial,
            shown: policy.primary_clip(),
            policy,
            started_at,
            plays: 0,
            playing: None,
            rating: None,
            locked_replays: None,
            stage: TrialStage::Watching,
        }
    }

    pub fn trial(&self) -> &TrialDescriptor {
        &self.trial
    }

    pub fn started_at(&self) -> Ts {
        self.started_at
    }

    pub fn stage(&self) -> TrialStage {
        self.stage
    }

    pub fn plays(&self) -> u32 {
        self.plays
    }

    pub fn rating(&self) -> Option<u8> {
        self.rating
    }

    pub fn playing(&self) -> Option<Clip> {
        self.playing
    }

    /// Plays beyond the required minimum.
    pub fn replay_count(&self) -> u32 {
        self.locked_replays
            .unwrap_or_else(|| self.plays.saturating_sub(self.policy.required_plays()))
    }

    fn can_play(&self) -> bool {
        if self.playing.is_some() {
            return false;
        }
        match self.policy {
            ReadinessPolicy::FullPlays { .. } => true,
            ReadinessPolicy::PartialThenFull { .. } => {
                matches!(self.stage, TrialStage::Watching | TrialStage::Rating)
            }
        }
    }

    fn slider_unlocked(&self) -> bool {
        match self.policy {
            ReadinessPolicy::FullPlays { .. } => {
                matches!(self.stage, TrialStage::Rating | TrialStage::Ready)
            }
            ReadinessPolicy::PartialThenFull { .. } => self.stage == TrialStage::Rating,
        }
    }

    fn can_submit_rating(&self) -> bool {
        self.policy.is_two_stage()
            && self.stage == TrialStage::Rating
            && self.rating.is_some()
            && self.playing.is_none()
    }

    /// Apply one input. Returns false when the input is not enabled right now.
    pub fn apply(&mut self, input: TrialInput) -> bool {
        match input {
            TrialInput::Play => {
                if !self.can_play() {
                    return false;
                }
                self.plays += 1;
                self.playing = Some(self.shown);
                true
            }
            TrialInput::ClipEnded(clip) => {
                if self.playing != Some(clip) {
                    return false;
                }
                self.playing = None;
                match (clip, self.stage) {
                    (c, TrialStage::Watching)
                        if c == self.policy.primary_clip()
                            && self.plays >= self.policy.required_plays() =>
                    {
                        self.stage = TrialStage::Rating;
                    }
                    (Clip::Full, TrialStage::FullClip) => self.stage = TrialStage::Ready,
                    _ => {}
                }
                true
            }
            TrialInput::Rate(value) => {
                if !self.slider_unlocked() {
                    return false;
                }
                self.rating = Some(value.min(100));
                if !self.policy.is_two_stage() {
                    self.stage = TrialStage::Ready;
                }
                true
            }
            TrialInput::SubmitRating => {
                if !self.can_submit_rating() {
                    return false;
                }
                self.locked_replays = Some(self.replay_count());
                self.stage = TrialStage::FullClip;
                self.shown = Clip::Full;
                self.playing = Some(Clip::Full);
                true
            }
        }
    }

    /// Close the trial if its advance action is enabled.
    pub fn finish(&self, elapsed: Duration) -> Option<ResponseRecord> {
        if self.stage != TrialStage::Ready {
            return None;
        }
        let rating = self.rating?;
        Some(ResponseRecord::new(
            &self.trial,
            rating,
            elapsed.as_secs_f64() * 1000.0,
            self.replay_count(),
        ))
    }

    pub fn view(&self, prompt: PromptStyle, labels: ScaleLabels) -> TrialView<'_> {
        let required = self.policy.required_plays();
        let label = match self.plays {
            0 => "Play video",
            n if n < required => "Watch again",
            _ => "Replay",
        };
        let running_last_required = self.playing.is_some() && self.plays == required;
        let play_visible = !running_last_required
            && match self.policy {
                ReadinessPolicy::FullPlays { .. } => true,
                ReadinessPolicy::PartialThenFull { .. } => {
                    matches!(self.stage, TrialStage::Watching | TrialStage::Rating)
                }
            };
        let play = if play_visible {
            ButtonView::shown(label, self.can_play())
        } else {
            ButtonView::hidden(label)
        };

        let rate = if self.policy.is_two_stage() && self.stage == TrialStage::Rating {
            ButtonView::shown("Full video", self.can_submit_rating())
        } else {
            ButtonView::hidden("Full video")
        };

        let advance_visible = match self.policy {
            ReadinessPolicy::FullPlays { .. } => self.slider_unlocked(),
            ReadinessPolicy::PartialThenFull { .. } => {
                matches!(self.stage, TrialStage::FullClip | TrialStage::Ready)
            }
        };
        let advance = if advance_visible {
            ButtonView::shown("Continue", self.stage == TrialStage::Ready)
        } else {
            ButtonView::hidden("Continue")
        };

        TrialView {
            prompt: prompt.statement(self.trial.framing()),
            labels,
            clip: self.shown,
            clip_name: &self.trial.name,
            playing: self.playing.is_some(),
            stage: self.stage,
            play,
            slider_visible: self.slider_unlocked(),
            rating: self.rating,
            rate,
            advance,
            replay_hint: self.slider_unlocked(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: ReadinessPolicy = ReadinessPolicy::FullPlays { required_plays: 2 };
    const TWO_STAGE: ReadinessPolicy = ReadinessPolicy::PartialThenFull {
        required_partial_plays: 2,
    };

    fn run(policy: ReadinessPolicy) -> TrialRun<u64> {
        let trial = TrialDescriptor {
            id: 1,
            name: "v1".into(),
            gate_pass: 1,
        };
        TrialRun::new(trial, policy, 0)
    }

    fn watch(run: &mut TrialRun<u64>, clip: Clip) {
        assert!(run.apply(TrialInput::Play));
        assert!(run.apply(TrialInput::ClipEnded(clip)));
    }

    #[test]
    fn full_plays_gate_unlocks_after_required_plays() {
        let mut run = run(FULL);
        let labels = ScaleLabels::for_condition(0);
        assert_eq!(run.view(PromptStyle::Framed, labels).play.label, "Play video");
        assert!(!run.apply(TrialInput::Rate(50)));

        watch(&mut run, Clip::Full);
        assert_eq!(run.stage(), TrialStage::Watching);
        assert_eq!(run.view(PromptStyle::Framed, labels).play.label, "Watch again");

        assert!(run.apply(TrialInput::Play));
        let view = run.view(PromptStyle::Framed, labels);
        assert!(!view.play.visible);
        assert!(!view.slider_visible);
        assert!(run.apply(TrialInput::ClipEnded(Clip::Full)));

        let view = run.view(PromptStyle::Framed, labels);
        assert_eq!(run.stage(), TrialStage::Rating);
        assert!(view.slider_visible);
        assert!(view.advance.visible && !view.advance.enabled);
        assert_eq!(view.play.label, "Replay");
        assert!(run.finish(Duration::from_secs(1)).is_none());

        assert!(run.apply(TrialInput::Rate(70)));
        assert!(run.view(PromptStyle::Framed, labels).advance.enabled);
        let record = run.finish(Duration::from_millis(1500)).unwrap();
        assert_eq!(record.response, 70);
        assert_eq!(record.replay_times, 0);
        assert!((record.time - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn play_is_disabled_while_a_clip_runs() {
        let mut run = run(FULL);
        assert!(run.apply(TrialInput::Play));
        assert!(!run.apply(TrialInput::Play));
        assert!(!run.apply(TrialInput::ClipEnded(Clip::Partial)));
        assert_eq!(run.plays(), 1);
    }

    #[test]
    fn replays_are_counted_beyond_the_minimum() {
        let mut run = run(FULL);
        for _ in 0..4 {
            watch(&mut run, Clip::Full);
        }
        assert!(run.apply(TrialInput::Rate(30)));
        assert_eq!(run.finish(Duration::ZERO).unwrap().replay_times, 2);
    }

    #[test]
    fn rating_is_clamped_to_scale() {
        let mut run = run(FULL);
        watch(&mut run, Clip::Full);
        watch(&mut run, Clip::Full);
        assert!(run.apply(TrialInput::Rate(250)));
        assert_eq!(run.rating(), Some(100));
    }

    #[test]
    fn two_stage_gate_requires_rating_then_full_clip() {
        let mut run = run(TWO_STAGE);
        let labels = ScaleLabels::for_condition(1);
        watch(&mut run, Clip::Partial);
        assert!(!run.apply(TrialInput::SubmitRating));
        watch(&mut run, Clip::Partial);
        assert_eq!(run.stage(), TrialStage::Rating);

        let view = run.view(PromptStyle::Hypothetical, labels);
        assert!(view.rate.visible && !view.rate.enabled);
        assert!(!view.advance.visible);

        assert!(run.apply(TrialInput::Rate(40)));
        watch(&mut run, Clip::Partial);
        assert!(run.apply(TrialInput::SubmitRating));
        assert_eq!(run.stage(), TrialStage::FullClip);
        assert_eq!(run.playing(), Some(Clip::Full));

        let view = run.view(PromptStyle::Hypothetical, labels);
        assert!(!view.slider_visible);
        assert!(!view.play.visible);
        assert!(view.advance.visible && !view.advance.enabled);
        assert!(!run.apply(TrialInput::Play));
        assert!(!run.apply(TrialInput::Rate(90)));
        assert!(run.finish(Duration::ZERO).is_none());

        assert!(run.apply(TrialInput::ClipEnded(Clip::Full)));
        assert_eq!(run.stage(), TrialStage::Ready);
        let record = run.finish(Duration::from_secs(2)).unwrap();
        assert_eq!(record.response, 40);
        assert_eq!(record.replay_times, 1);
    }

    #[test]
    fn two_stage_rating_cannot_be_submitted_mid_replay() {
        let mut run = run(TWO_STAGE);
        watch(&mut run, Clip::Partial);
        watch(&mut run, Clip::Partial);
        assert!(run.apply(TrialInput::Rate(10)));
        assert!(run.apply(TrialInput::Play));
        assert!(!run.apply(TrialInput::SubmitRating));
    }
}
