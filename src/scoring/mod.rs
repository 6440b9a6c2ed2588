//! Scoring engine: the fixed rubric and pure functions over a day's selections.

pub mod draft;
pub mod rubric;

pub use draft::SessionDraft;
pub use rubric::{
    Category, Selection, SleepOption, StudyOption, Tier, WakeupOption, WorkoutOption,
};
