//! The fixed daily rubric: four categories, each with a closed set of options.
//!
//! Maximums: sleep 30, workout 25, wake-up 20, python 25. A perfect day
//! scores exactly 100.

use serde::{Deserialize, Serialize};

/// One of the four tracked categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Sleep,
    Workout,
    Wakeup,
    Python,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 4] = [
        Category::Sleep,
        Category::Workout,
        Category::Wakeup,
        Category::Python,
    ];

    /// Highest score any option of this category can give.
    pub fn max_score(&self) -> i64 {
        match self {
            Self::Sleep => 30,
            Self::Workout => 25,
            Self::Wakeup => 20,
            Self::Python => 25,
        }
    }

    /// Every option of this category, best first.
    pub fn options(&self) -> Vec<Selection> {
        match self {
            Self::Sleep => vec![
                Selection::Sleep(SleepOption::SevenPlus),
                Selection::Sleep(SleepOption::SixToSeven),
                Selection::Sleep(SleepOption::UnderSix),
            ],
            Self::Workout => vec![
                Selection::Workout(WorkoutOption::Full),
                Selection::Workout(WorkoutOption::Short),
                Selection::Workout(WorkoutOption::None),
            ],
            Self::Wakeup => vec![
                Selection::Wakeup(WakeupOption::Early),
                Selection::Wakeup(WakeupOption::Medium),
                Selection::Wakeup(WakeupOption::Late),
            ],
            Self::Python => vec![
                Selection::Python(StudyOption::HourPlus),
                Selection::Python(StudyOption::HalfHour),
                Selection::Python(StudyOption::TheoryOnly),
                Selection::Python(StudyOption::None),
            ],
        }
    }

    /// Heading shown above the category's buttons.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Sleep => "🛌 Sleep",
            Self::Workout => "🏃 Workout",
            Self::Wakeup => "☀️ Wake-up",
            Self::Python => "🐍 Python",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Sleep => "sleep",
            Self::Workout => "workout",
            Self::Wakeup => "wakeup",
            Self::Python => "python",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepOption {
    /// 7 hours or more.
    SevenPlus,
    SixToSeven,
    UnderSix,
}

impl SleepOption {
    pub fn score(&self) -> i64 {
        match self {
            Self::SevenPlus => 30,
            Self::SixToSeven => 15,
            Self::UnderSix => 0,
        }
    }

    /// Representative number of hours stored with the record.
    pub fn hours(&self) -> f64 {
        match self {
            Self::SevenPlus => 7.5,
            Self::SixToSeven => 6.5,
            Self::UnderSix => 5.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutOption {
    Full,
    Short,
    None,
}

impl WorkoutOption {
    /// A short workout is worth exactly 12 points, keeping every score integral.
    pub fn score(&self) -> i64 {
        match self {
            Self::Full => 25,
            Self::Short => 12,
            Self::None => 0,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Short => "short",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WakeupOption {
    /// Before 10:00.
    Early,
    /// Between 10:00 and 11:00.
    Medium,
    /// After 11:00.
    Late,
}

impl WakeupOption {
    pub fn score(&self) -> i64 {
        match self {
            Self::Early => 20,
            Self::Medium => 10,
            Self::Late => 0,
        }
    }

    pub fn time(&self) -> &'static str {
        match self {
            Self::Early => "early",
            Self::Medium => "medium",
            Self::Late => "late",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyOption {
    /// An hour or more of practice.
    HourPlus,
    /// 30 to 60 minutes.
    HalfHour,
    TheoryOnly,
    None,
}

impl StudyOption {
    pub fn score(&self) -> i64 {
        match self {
            Self::HourPlus => 25,
            Self::HalfHour => 15,
            Self::TheoryOnly => 5,
            Self::None => 0,
        }
    }

    pub fn hours(&self) -> f64 {
        match self {
            Self::HourPlus => 1.5,
            Self::HalfHour => 0.75,
            Self::TheoryOnly => 0.25,
            Self::None => 0.0,
        }
    }
}

/// A single option picked within one category.
///
/// The wire form is the option code carried in button callback data,
/// e.g. `sleep_7plus` or `python_theory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", content = "option", rename_all = "snake_case")]
pub enum Selection {
    Sleep(SleepOption),
    Workout(WorkoutOption),
    Wakeup(WakeupOption),
    Python(StudyOption),
}

impl Selection {
    /// Parse an option code. Unknown codes yield `None`.
    pub fn parse(code: &str) -> Option<Self> {
        let selection = match code {
            "sleep_7plus" => Self::Sleep(SleepOption::SevenPlus),
            "sleep_6_7" => Self::Sleep(SleepOption::SixToSeven),
            "sleep_lt6" => Self::Sleep(SleepOption::UnderSix),
            "workout_full" => Self::Workout(WorkoutOption::Full),
            "workout_short" => Self::Workout(WorkoutOption::Short),
            "workout_none" => Self::Workout(WorkoutOption::None),
            "wakeup_early" => Self::Wakeup(WakeupOption::Early),
            "wakeup_medium" => Self::Wakeup(WakeupOption::Medium),
            "wakeup_late" => Self::Wakeup(WakeupOption::Late),
            "python_1h" => Self::Python(StudyOption::HourPlus),
            "python_30m" => Self::Python(StudyOption::HalfHour),
            "python_theory" => Self::Python(StudyOption::TheoryOnly),
            "python_none" => Self::Python(StudyOption::None),
            _ => return None,
        };
        Some(selection)
    }

    /// The option code, inverse of [`Selection::parse`].
    pub fn code(&self) -> &'static str {
        match self {
            Self::Sleep(SleepOption::SevenPlus) => "sleep_7plus",
            Self::Sleep(SleepOption::SixToSeven) => "sleep_6_7",
            Self::Sleep(SleepOption::UnderSix) => "sleep_lt6",
            Self::Workout(WorkoutOption::Full) => "workout_full",
            Self::Workout(WorkoutOption::Short) => "workout_short",
            Self::Workout(WorkoutOption::None) => "workout_none",
            Self::Wakeup(WakeupOption::Early) => "wakeup_early",
            Self::Wakeup(WakeupOption::Medium) => "wakeup_medium",
            Self::Wakeup(WakeupOption::Late) => "wakeup_late",
            Self::Python(StudyOption::HourPlus) => "python_1h",
            Self::Python(StudyOption::HalfHour) => "python_30m",
            Self::Python(StudyOption::TheoryOnly) => "python_theory",
            Self::Python(StudyOption::None) => "python_none",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Self::Sleep(_) => Category::Sleep,
            Self::Workout(_) => Category::Workout,
            Self::Wakeup(_) => Category::Wakeup,
            Self::Python(_) => Category::Python,
        }
    }

    pub fn score(&self) -> i64 {
        match self {
            Self::Sleep(o) => o.score(),
            Self::Workout(o) => o.score(),
            Self::Wakeup(o) => o.score(),
            Self::Python(o) => o.score(),
        }
    }

    /// Button label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sleep(SleepOption::SevenPlus) => "7h+ (30%)",
            Self::Sleep(SleepOption::SixToSeven) => "6-7h (15%)",
            Self::Sleep(SleepOption::UnderSix) => "<6h (0%)",
            Self::Workout(WorkoutOption::Full) => "Full (25%)",
            Self::Workout(WorkoutOption::Short) => "Short (12%)",
            Self::Workout(WorkoutOption::None) => "None (0%)",
            Self::Wakeup(WakeupOption::Early) => "Before 10:00 (20%)",
            Self::Wakeup(WakeupOption::Medium) => "10-11:00 (10%)",
            Self::Wakeup(WakeupOption::Late) => "After 11:00 (0%)",
            Self::Python(StudyOption::HourPlus) => "1h+ (25%)",
            Self::Python(StudyOption::HalfHour) => "30-60min (15%)",
            Self::Python(StudyOption::TheoryOnly) => "Theory (5%)",
            Self::Python(StudyOption::None) => "None (0%)",
        }
    }
}

/// Qualitative label for a day's total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Perfect,
    Great,
    Good,
    TryAgain,
}

impl Tier {
    pub fn from_total(total: i64) -> Self {
        match total {
            t if t >= 100 => Self::Perfect,
            t if t >= 70 => Self::Great,
            t if t >= 50 => Self::Good,
            _ => Self::TryAgain,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Perfect => "perfect",
            Self::Great => "great",
            Self::Good => "good",
            Self::TryAgain => "try again",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
