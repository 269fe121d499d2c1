use gatejudge_core::{ButtonView, DemographicsView};

use crate::config::DemographicsOptions;

const MAX_AGE: u32 = 100;

/// Survey answers as the participant fills them in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemographicsForm {
    gender: Option<usize>,
    age_text: String,
    age_prefer_not: bool,
    race: Option<usize>,
    race_prefer_not: bool,
    ethnicity: Option<usize>,
    feedback: String,
}

impl DemographicsForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_gender(&mut self, options: &DemographicsOptions, index: usize) -> bool {
        pick(&mut self.gender, &options.genders, index)
    }

    pub fn select_ethnicity(&mut self, options: &DemographicsOptions, index: usize) -> bool {
        pick(&mut self.ethnicity, &options.ethnicities, index)
    }

    /// Keeps digits only and caps the value at 100. Typing an age unticks
    /// "prefer not to say"; clearing the field ticks it.
    pub fn set_age_text(&mut self, text: &str) {
        let digits: String = text.chars().filter(char::is_ascii_digit).collect();
        self.age_text = match digits.parse::<u32>() {
            Ok(age) if age > MAX_AGE => MAX_AGE.to_string(),
            // too long for u32, so far above the cap
            Err(_) if !digits.trim_start_matches('0').is_empty() => MAX_AGE.to_string(),
            _ => digits,
        };
        self.age_prefer_not = self.age_text.is_empty();
    }

    pub fn toggle_age_prefer_not(&mut self) {
        self.age_prefer_not = !self.age_prefer_not;
        self.age_text.clear();
    }

    pub fn select_race(&mut self, options: &DemographicsOptions, index: usize) -> bool {
        let picked = pick(&mut self.race, &options.races, index);
        if picked {
            self.race_prefer_not = false;
        }
        picked
    }

    pub fn toggle_race_prefer_not(&mut self) {
        self.race_prefer_not = !self.race_prefer_not;
        if self.race_prefer_not {
            self.race = None;
        }
    }

    pub fn set_feedback(&mut self, text: &str) {
        self.feedback = text.to_owned();
    }

    pub fn age_text(&self) -> &str {
        &self.age_text
    }

    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    /// Every required question has an answer or an explicit opt-out.
    pub fn is_complete(&self) -> bool {
        let age = !self.age_text.is_empty() || self.age_prefer_not;
        let race = self.race.is_some() || self.race_prefer_not;
        self.gender.is_some() && age && race && self.ethnicity.is_some()
    }

    /// Named answers in recording order. `None` until the form is complete.
    pub fn answers(&self, options: &DemographicsOptions) -> Option<Vec<(&'static str, String)>> {
        if !self.is_complete() {
            return None;
        }
        let label = |list: &[String], idx: Option<usize>| {
            idx.and_then(|i| list.get(i)).cloned().unwrap_or_default()
        };
        let race = match self.race {
            Some(i) => label(&options.races, Some(i)),
            None => "NA".to_owned(),
        };
        Some(vec![
            ("feedback", self.feedback.clone()),
            ("gender", label(&options.genders, self.gender)),
            ("age", self.age_text.clone()),
            ("race", race),
            ("ethnicity", label(&options.ethnicities, self.ethnicity)),
        ])
    }

    pub fn view<'a>(&'a self, options: &'a DemographicsOptions) -> DemographicsView<'a> {
        DemographicsView {
            genders: &options.genders,
            gender: self.gender,
            age_text: &self.age_text,
            age_prefer_not: self.age_prefer_not,
            races: &options.races,
            race: self.race,
            race_prefer_not: self.race_prefer_not,
            ethnicities: &options.ethnicities,
            ethnicity: self.ethnicity,
            feedback: &self.feedback,
            finish: ButtonView::shown("Finish", self.is_complete()),
        }
    }
}

fn pick(slot: &mut Option<usize>, list: &[String], index: usize) -> bool {
    if index < list.len() {
        *slot = Some(index);
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(options: &DemographicsOptions) -> DemographicsForm {
        let mut form = DemographicsForm::new();
        form.select_gender(options, 0);
        form.set_age_text("34");
        form.select_race(options, 1);
        form.select_ethnicity(options, 1);
        form
    }

    #[test]
    fn finish_requires_every_field() {
        let options = DemographicsOptions::default();
        let mut form = DemographicsForm::new();
        assert!(!form.is_complete());
        form.select_gender(&options, 0);
        form.select_ethnicity(&options, 0);
        form.set_age_text("21");
        assert!(!form.is_complete());
        form.toggle_race_prefer_not();
        assert!(form.is_complete());
        assert!(form.view(&options).finish.enabled);
    }

    #[test]
    fn age_is_digits_only_and_capped() {
        let mut form = DemographicsForm::new();
        form.set_age_text("1a2");
        assert_eq!(form.age_text(), "12");
        form.set_age_text("250");
        assert_eq!(form.age_text(), "100");
        form.set_age_text("12345678901");
        assert_eq!(form.age_text(), "100");
        form.set_age_text("000000000000042");
        assert_eq!(form.age_text(), "000000000000042");
    }

    #[test]
    fn age_prefer_not_and_text_are_exclusive() {
        let mut form = DemographicsForm::new();
        form.set_age_text("40");
        form.toggle_age_prefer_not();
        assert_eq!(form.age_text(), "");
        assert!(form.age_prefer_not);
        form.set_age_text("41");
        assert!(!form.age_prefer_not);
        form.set_age_text("");
        assert!(form.age_prefer_not);
    }

    #[test]
    fn race_prefer_not_records_na() {
        let options = DemographicsOptions::default();
        let mut form = filled(&options);
        form.toggle_race_prefer_not();
        let answers = form.answers(&options).unwrap();
        assert_eq!(answers[3], ("race", "NA".to_owned()));
        form.select_race(&options, 0);
        assert!(!form.race_prefer_not);
    }

    #[test]
    fn answers_follow_recording_order() {
        let options = DemographicsOptions::default();
        let mut form = filled(&options);
        form.set_feedback("fun study");
        let keys: Vec<&str> = form
            .answers(&options)
            .unwrap()
            .iter()
            .map(|(k, _)| *k)
            .collect();
        assert_eq!(keys, ["feedback", "gender", "age", "race", "ethnicity"]);
    }

    #[test]
    fn unknown_option_is_rejected() {
        let options = DemographicsOptions::default();
        let mut form = DemographicsForm::new();
        assert!(!form.select_gender(&options, 99));
        assert!(form.answers(&options).is_none());
    }
}
