use gatejudge_core::{Clip, Screen, TrialDescriptor};
use gatejudge_experiment::{
    ComprehensionForm, DemographicsForm, DemographicsOptions, ExperimentConfig, ExperimentEvent,
    ExperimentStateMachine, Grade, ReadinessPolicy, TrialInput, TrialRun,
};
use gatejudge_timing::ManualTimer;
use proptest::prelude::*;
use std::time::Duration;

fn trials(count: usize) -> Vec<TrialDescriptor> {
    (0..count as u32)
        .map(|id| TrialDescriptor {
            id,
            name: format!("clip_{id}"),
            gate_pass: (id % 2) as u8,
        })
        .collect()
}

#[derive(Debug, Clone)]
enum Input {
    Play,
    End,
    Rate(u8),
    Next,
}

fn input() -> impl Strategy<Value = Input> {
    prop_oneof![
        3 => Just(Input::Play),
        3 => Just(Input::End),
        2 => any::<u8>().prop_map(Input::Rate),
        2 => Just(Input::Next),
    ]
}

proptest! {
    #[test]
    fn progress_is_monotonic_and_bounded(
        count in 0usize..5,
        inputs in prop::collection::vec(input(), 0..200),
    ) {
        let config = ExperimentConfig {
            trials: trials(count),
            skip_instructions: true,
            ..ExperimentConfig::default()
        };
        let mut machine = ExperimentStateMachine::new(config, ManualTimer::new());
        machine.start();

        let mut previous = machine.completed_trials();
        let mut demographics_entries = usize::from(machine.screen() == Screen::Demographics);
        for input in inputs {
            let was_demographics = machine.screen() == Screen::Demographics;
            let event = match input {
                Input::Play => ExperimentEvent::PlayPressed,
                Input::End => ExperimentEvent::ClipEnded(Clip::Full),
                Input::Rate(v) => ExperimentEvent::SliderMoved(v),
                Input::Next => ExperimentEvent::NextTrial,
            };
            machine.handle_event(event);
            let done = machine.completed_trials();
            prop_assert!(done == previous || done == previous + 1);
            prop_assert!(done <= count);
            prop_assert_eq!(machine.results().len(), done);
            if let Screen::Trial(index) = machine.screen() {
                prop_assert_eq!(index, done);
            }
            if !was_demographics && machine.screen() == Screen::Demographics {
                demographics_entries += 1;
            }
            previous = done;
        }
        prop_assert!(demographics_entries <= 1);
        if previous == count {
            prop_assert_eq!(demographics_entries, 1);
        }
    }

    #[test]
    fn replay_count_is_plays_beyond_minimum(required in 1u32..4, extra in 0u32..5) {
        let trial = TrialDescriptor { id: 9, name: "v9".into(), gate_pass: 1 };
        let mut run = TrialRun::new(
            trial,
            ReadinessPolicy::FullPlays { required_plays: required },
            0u64,
        );
        for _ in 0..required + extra {
            prop_assert!(run.apply(TrialInput::Play));
            prop_assert!(run.apply(TrialInput::ClipEnded(Clip::Full)));
        }
        prop_assert!(run.apply(TrialInput::Rate(42)));
        let record = run.finish(Duration::from_millis(10)).unwrap();
        prop_assert_eq!(record.replay_times, extra);
    }

    #[test]
    fn comprehension_passes_only_on_exact_key(picks in prop::collection::vec(0usize..3, 3)) {
        let config = ExperimentConfig::default().resolve();
        let questions = &config.comprehension;
        let mut form = ComprehensionForm::new(questions.len());
        for (q, pick) in picks.iter().enumerate() {
            prop_assert!(form.select(questions, q, *pick));
        }
        let exact = questions
            .iter()
            .zip(&picks)
            .all(|(q, pick)| q.options[*pick].value == q.expected);
        let grade = form.grade(questions).unwrap();
        prop_assert_eq!(grade == Grade::Pass, exact);
        if !exact {
            prop_assert!((0..3).all(|q| form.selected(q).is_none()));
        }
    }

    #[test]
    fn finish_enabled_iff_every_field_answered(
        gender in prop::option::of(0usize..4),
        age in prop::option::of(0u32..120),
        age_na in any::<bool>(),
        race in prop::option::of(0usize..6),
        race_na in any::<bool>(),
        ethnicity in prop::option::of(0usize..3),
    ) {
        let options = DemographicsOptions::default();
        let mut form = DemographicsForm::new();
        if let Some(g) = gender { form.select_gender(&options, g); }
        if let Some(a) = age { form.set_age_text(&a.to_string()); }
        if age_na { form.toggle_age_prefer_not(); }
        if let Some(r) = race { form.select_race(&options, r); }
        if race_na { form.toggle_race_prefer_not(); }
        if let Some(e) = ethnicity { form.select_ethnicity(&options, e); }

        // toggling "prefer not to say" after typing clears the age and ticks the box
        let age_answered = age.is_some() || age_na;
        let race_answered = race.is_some() || race_na;
        let expected = gender.is_some() && age_answered && race_answered && ethnicity.is_some();
        prop_assert_eq!(form.is_complete(), expected);
        prop_assert_eq!(form.view(&options).finish.enabled, expected);
    }
}
