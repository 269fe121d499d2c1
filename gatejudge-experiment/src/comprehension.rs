use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

impl ChoiceOption {
    fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_owned(),
            label: label.to_owned(),
        }
    }
}

/// Fixed-choice question with a literal expected answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComprehensionQuestion {
    pub name: String,
    pub prompt: String,
    pub options: Vec<ChoiceOption>,
    pub expected: String,
}

#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum Grade {
    Pass,
    Fail,
}

/// Current selections on the comprehension screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComprehensionForm {
    selections: Vec<Option<usize>>,
}

impl ComprehensionForm {
    pub fn new(question_count: usize) -> Self {
        Self {
            selections: vec![None; question_count],
        }
    }

    /// Select `option` for `question`; out-of-range picks are ignored.
    pub fn select(
        &mut self,
        questions: &[ComprehensionQuestion],
        question: usize,
        option: usize,
    ) -> bool {
        let in_range = questions
            .get(question)
            .is_some_and(|q| option < q.options.len());
        match self.selections.get_mut(question) {
            Some(slot) if in_range => {
                *slot = Some(option);
                true
            }
            _ => false,
        }
    }

    pub fn selected(&self, question: usize) -> Option<usize> {
        self.selections.get(question).copied().flatten()
    }

    pub fn all_answered(&self) -> bool {
        self.selections.iter().all(Option::is_some)
    }

    pub fn clear(&mut self) {
        self.selections.iter_mut().for_each(|s| *s = None);
    }

    /// Compare every selection with its expected value. A failed check clears
    /// all selections. `None` while any question is unanswered.
    pub fn grade(&mut self, questions: &[ComprehensionQuestion]) -> Option<Grade> {
        if !self.all_answered() {
            return None;
        }
        let pass = questions.iter().zip(&self.selections).all(|(q, sel)| {
            sel.and_then(|i| q.options.get(i))
                .is_some_and(|opt| opt.value == q.expected)
        });
        if pass {
            Some(Grade::Pass)
        } else {
            self.clear();
            Some(Grade::Fail)
        }
    }
}

fn block_question() -> ComprehensionQuestion {
    ComprehensionQuestion {
        name: "block".into(),
        prompt: "What happens when a ball hits the block?".into(),
        options: vec![
            ChoiceOption::new("A", "The block moves out of the way."),
            ChoiceOption::new("B", "The ball passes through the block."),
            ChoiceOption::new("C", "The ball bounces off the block."),
        ],
        expected: "C".into(),
    }
}

/// Questions for the caused/prevented experiment; key A, C, C.
pub fn full_plays_questions() -> Vec<ComprehensionQuestion> {
    vec![
        ComprehensionQuestion {
            name: "caused".into(),
            prompt: "What does it mean that ball A caused ball B to go through the gate?".into(),
            options: vec![
                ChoiceOption::new("A", "Ball B went through the gate because of ball A."),
                ChoiceOption::new("B", "Ball B missed the gate because of ball A."),
                ChoiceOption::new("C", "Ball A went through the gate instead of ball B."),
            ],
            expected: "A".into(),
        },
        ComprehensionQuestion {
            name: "prevented".into(),
            prompt: "What does it mean that ball A prevented ball B from going through the gate?"
                .into(),
            options: vec![
                ChoiceOption::new("A", "Ball B went through the gate because of ball A."),
                ChoiceOption::new("B", "Ball A never touched ball B."),
                ChoiceOption::new(
                    "C",
                    "Ball B would have gone through the gate, but ball A stopped it.",
                ),
            ],
            expected: "C".into(),
        },
        block_question(),
    ]
}

/// Questions for the partial-then-full experiment; key C, C, D.
pub fn partial_then_full_questions() -> Vec<ComprehensionQuestion> {
    vec![
        ComprehensionQuestion {
            name: "statement".into(),
            prompt: "Which statement will you be asked to judge?".into(),
            options: vec![
                ChoiceOption::new("A", "Ball A caused ball B to go through the gate."),
                ChoiceOption::new("B", "Ball A prevented ball B from going through the gate."),
                ChoiceOption::new("C", "Ball B would go through the gate if ball A wasn't there."),
            ],
            expected: "C".into(),
        },
        block_question(),
        ComprehensionQuestion {
            name: "judgment".into(),
            prompt: "When do you give your judgment?".into(),
            options: vec![
                ChoiceOption::new("A", "Before watching any video."),
                ChoiceOption::new("B", "After watching the full video."),
                ChoiceOption::new("C", "Whenever I like, without watching the clip."),
                ChoiceOption::new("D", "After watching the first part of the video twice."),
            ],
            expected: "D".into(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(form: &mut ComprehensionForm, qs: &[ComprehensionQuestion], values: [&str; 3]) {
        for (qi, value) in values.iter().enumerate() {
            let oi = qs[qi]
                .options
                .iter()
                .position(|o| o.value == *value)
                .unwrap();
            assert!(form.select(qs, qi, oi));
        }
    }

    #[test]
    fn grading_waits_for_every_answer() {
        let qs = full_plays_questions();
        let mut form = ComprehensionForm::new(qs.len());
        assert!(!form.all_answered());
        form.select(&qs, 0, 0);
        form.select(&qs, 1, 2);
        assert_eq!(form.grade(&qs), None);
        assert_eq!(form.selected(0), Some(0));
    }

    #[test]
    fn exact_key_passes() {
        let qs = full_plays_questions();
        let mut form = ComprehensionForm::new(qs.len());
        answer(&mut form, &qs, ["A", "C", "C"]);
        assert_eq!(form.grade(&qs), Some(Grade::Pass));
        assert!(form.all_answered());
    }

    #[test]
    fn single_mismatch_fails_and_clears() {
        let qs = partial_then_full_questions();
        let mut form = ComprehensionForm::new(qs.len());
        answer(&mut form, &qs, ["C", "C", "A"]);
        assert_eq!(form.grade(&qs), Some(Grade::Fail));
        assert!((0..3).all(|q| form.selected(q).is_none()));
    }

    #[test]
    fn out_of_range_selection_is_ignored() {
        let qs = full_plays_questions();
        let mut form = ComprehensionForm::new(qs.len());
        assert!(!form.select(&qs, 0, 9));
        assert!(!form.select(&qs, 5, 0));
        assert_eq!(form.selected(0), None);
    }
}
