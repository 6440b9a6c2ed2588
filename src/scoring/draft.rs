//! In-progress day record and the pure scoring functions over it.

use serde::{Deserialize, Serialize};

use super::rubric::{Category, Selection, SleepOption, StudyOption, WakeupOption, WorkoutOption};

/// The current day's selections for one user, not yet persisted.
///
/// A category that was never picked scores zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionDraft {
    pub sleep: Option<SleepOption>,
    pub workout: Option<WorkoutOption>,
    pub wakeup: Option<WakeupOption>,
    pub python: Option<StudyOption>,
}

impl SessionDraft {
    /// Replace the selection for one category. Other categories are untouched.
    pub fn apply_selection(mut self, selection: Selection) -> Self {
        self.set(selection);
        self
    }

    /// In-place form of [`SessionDraft::apply_selection`].
    pub fn set(&mut self, selection: Selection) {
        match selection {
            Selection::Sleep(o) => self.sleep = Some(o),
            Selection::Workout(o) => self.workout = Some(o),
            Selection::Wakeup(o) => self.wakeup = Some(o),
            Selection::Python(o) => self.python = Some(o),
        }
    }

    /// The option picked for `category`, if any.
    pub fn selected(&self, category: Category) -> Option<Selection> {
        match category {
            Category::Sleep => self.sleep.map(Selection::Sleep),
            Category::Workout => self.workout.map(Selection::Workout),
            Category::Wakeup => self.wakeup.map(Selection::Wakeup),
            Category::Python => self.python.map(Selection::Python),
        }
    }

    pub fn score(&self, category: Category) -> i64 {
        self.selected(category).map_or(0, |s| s.score())
    }

    /// Sum of the four category scores.
    pub fn total(&self) -> i64 {
        Category::ALL.iter().map(|c| self.score(*c)).sum()
    }

    /// Number of categories picked so far.
    pub fn chosen_count(&self) -> usize {
        Category::ALL
            .iter()
            .filter(|c| self.selected(**c).is_some())
            .count()
    }

    pub fn sleep_hours(&self) -> f64 {
        self.sleep.map_or(0.0, |o| o.hours())
    }

    pub fn workout_type(&self) -> Option<&'static str> {
        self.workout.map(|o| o.kind())
    }

    pub fn wakeup_time(&self) -> Option<&'static str> {
        self.wakeup.map(|o| o.time())
    }

    pub fn python_hours(&self) -> f64 {
        self.python.map_or(0.0, |o| o.hours())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_draft_is_zero() {
        let draft = SessionDraft::default();
        assert_eq!(draft.total(), 0);
        assert_eq!(draft.chosen_count(), 0);
        assert_eq!(draft.sleep_hours(), 0.0);
        assert_eq!(draft.workout_type(), None);
    }

    #[test]
    fn reselection_replaces_instead_of_adding() {
        let codes = [
            "sleep_7plus",
            "workout_full",
            "wakeup_medium",
            "python_30m",
        ];
        let mut draft = SessionDraft::default();
        for code in codes {
            draft = draft.apply_selection(Selection::parse(code).unwrap());
        }

        for category in Category::ALL {
            for option in category.options() {
                let before = draft.total();
                let old = draft.score(category);
                let after = draft.apply_selection(option);
                assert_eq!(after.total(), before - old + option.score());
            }
        }
    }

    #[test]
    fn selection_leaves_other_categories_alone() {
        let draft = SessionDraft::default()
            .apply_selection(Selection::Sleep(SleepOption::SevenPlus))
            .apply_selection(Selection::Python(StudyOption::TheoryOnly));
        let updated = draft.apply_selection(Selection::Sleep(SleepOption::UnderSix));

        assert_eq!(updated.python, Some(StudyOption::TheoryOnly));
        assert_eq!(updated.workout, None);
        assert_eq!(updated.score(Category::Sleep), 0);
        assert_eq!(updated.sleep_hours(), 5.5);
        assert_eq!(updated.chosen_count(), 2);
    }

    #[test]
    fn perfect_day_totals_one_hundred() {
        let draft = SessionDraft::default()
            .apply_selection(Selection::Sleep(SleepOption::SevenPlus))
            .apply_selection(Selection::Workout(WorkoutOption::Full))
            .apply_selection(Selection::Wakeup(WakeupOption::Early))
            .apply_selection(Selection::Python(StudyOption::HourPlus));
        assert_eq!(draft.total(), 100);
    }

    #[test]
    fn mixed_day_scores() {
        let draft = SessionDraft::default()
            .apply_selection(Selection::Sleep(SleepOption::SevenPlus))
            .apply_selection(Selection::Workout(WorkoutOption::Short))
            .apply_selection(Selection::Wakeup(WakeupOption::Medium))
            .apply_selection(Selection::Python(StudyOption::None));
        assert_eq!(draft.total(), 52);
        assert_eq!(draft.sleep_hours(), 7.5);
        assert_eq!(draft.workout_type(), Some("short"));
        assert_eq!(draft.wakeup_time(), Some("medium"));
        assert_eq!(draft.python_hours(), 0.0);
    }
}
