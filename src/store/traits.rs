//! Backend-agnostic `DayStore` trait and the records it persists.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::error::DatabaseError;
use crate::scoring::{Category, SessionDraft, Tier};

/// One user's finalized day. `(user_id, date)` is the natural key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRecord {
    pub user_id: i64,
    pub date: NaiveDate,
    pub sleep_hours: f64,
    pub sleep_score: i64,
    pub workout_type: Option<String>,
    pub workout_score: i64,
    pub wakeup_time: Option<String>,
    pub wakeup_score: i64,
    pub python_hours: f64,
    pub python_score: i64,
    pub total_score: i64,
    /// Set by the store on first insert of the key; `None` before persistence.
    pub created_at: Option<DateTime<Utc>>,
}

impl DailyRecord {
    /// Freeze a draft into a record for `date`.
    pub fn from_draft(user_id: i64, date: NaiveDate, draft: &SessionDraft) -> Self {
        Self {
            user_id,
            date,
            sleep_hours: draft.sleep_hours(),
            sleep_score: draft.score(Category::Sleep),
            workout_type: draft.workout_type().map(String::from),
            workout_score: draft.score(Category::Workout),
            wakeup_time: draft.wakeup_time().map(String::from),
            wakeup_score: draft.score(Category::Wakeup),
            python_hours: draft.python_hours(),
            python_score: draft.score(Category::Python),
            total_score: draft.total(),
            created_at: None,
        }
    }

    pub fn tier(&self) -> Tier {
        Tier::from_total(self.total_score)
    }
}

/// Aggregates over one user's records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    pub days_count: i64,
    /// Mean total score, rounded to one decimal.
    pub avg_score: f64,
    /// Days with a total of exactly 100.
    pub perfect_days: i64,
    /// Days with a total of 70 or more (perfect days included).
    pub good_days: i64,
}

/// Aggregates over every user, shown on the status page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobalStats {
    pub users_count: i64,
    pub days_count: i64,
    pub avg_score: f64,
    pub perfect_days: i64,
}

/// Round to one decimal place for display.
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Persistence contract shared by the embedded and client-server backends.
#[async_trait]
pub trait DayStore: Send + Sync {
    /// Short backend name for logs and the status API.
    fn backend_name(&self) -> &'static str;

    /// Create the record table if absent. Idempotent.
    async fn ensure_schema(&self) -> Result<(), DatabaseError>;

    /// Insert or fully replace the record for `(user_id, date)`.
    ///
    /// `created_at` of an existing row is preserved.
    async fn upsert_day(&self, record: &DailyRecord) -> Result<(), DatabaseError>;

    /// Aggregate stats for a user, or `None` if they have no records.
    async fn query_aggregate(&self, user_id: i64) -> Result<Option<UserStats>, DatabaseError>;

    /// Fetch a single day.
    async fn get_day(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Option<DailyRecord>, DatabaseError>;

    /// Most recent records for a user, newest first.
    async fn recent_days(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<DailyRecord>, DatabaseError>;

    /// Aggregates across all users.
    async fn global_summary(&self) -> Result<GlobalStats, DatabaseError>;

    /// Cheap connectivity probe.
    async fn ping(&self) -> Result<(), DatabaseError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{Selection, SleepOption, StudyOption, WakeupOption, WorkoutOption};

    #[test]
    fn record_from_draft_copies_every_field() {
        let draft = SessionDraft::default()
            .apply_selection(Selection::Sleep(SleepOption::SevenPlus))
            .apply_selection(Selection::Workout(WorkoutOption::Short))
            .apply_selection(Selection::Wakeup(WakeupOption::Medium))
            .apply_selection(Selection::Python(StudyOption::None));
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let record = DailyRecord::from_draft(42, date, &draft);

        assert_eq!(record.user_id, 42);
        assert_eq!(record.sleep_score, 30);
        assert_eq!(record.sleep_hours, 7.5);
        assert_eq!(record.workout_score, 12);
        assert_eq!(record.workout_type.as_deref(), Some("short"));
        assert_eq!(record.wakeup_score, 10);
        assert_eq!(record.wakeup_time.as_deref(), Some("medium"));
        assert_eq!(record.python_score, 0);
        assert_eq!(record.python_hours, 0.0);
        assert_eq!(record.total_score, 52);
        assert_eq!(
            record.total_score,
            record.sleep_score + record.workout_score + record.wakeup_score + record.python_score
        );
        assert_eq!(record.tier(), Tier::Good);
    }

    #[test]
    fn empty_draft_record_is_all_zero() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let record = DailyRecord::from_draft(1, date, &SessionDraft::default());
        assert_eq!(record.total_score, 0);
        assert_eq!(record.workout_type, None);
        assert_eq!(record.tier(), Tier::TryAgain);
    }

    #[test]
    fn rounding() {
        assert_eq!(round_one_decimal(52.0), 52.0);
        assert_eq!(round_one_decimal(66.666), 66.7);
        assert_eq!(round_one_decimal(70.04), 70.0);
    }
}
