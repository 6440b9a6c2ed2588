//! PostgreSQL backend: the client-server `DayStore`.
//!
//! Upserts use a conflict clause on `(user_id, date)` and never touch
//! `created_at` after the first insert.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::traits::{DailyRecord, DayStore, GlobalStats, UserStats, round_one_decimal};

const MAX_CONNECTIONS: u32 = 5;

/// Older deployments created the table without a unique key, so duplicates
/// are dropped (keeping the newest row) before the index is built.
const SCHEMA_SQL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS productivity (
        id SERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL,
        date DATE NOT NULL,
        sleep_hours DOUBLE PRECISION NOT NULL DEFAULT 0,
        sleep_score INTEGER NOT NULL DEFAULT 0,
        workout_type TEXT,
        workout_score INTEGER NOT NULL DEFAULT 0,
        wakeup_time TEXT,
        wakeup_score INTEGER NOT NULL DEFAULT 0,
        python_hours DOUBLE PRECISION NOT NULL DEFAULT 0,
        python_score INTEGER NOT NULL DEFAULT 0,
        total_score INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "DELETE FROM productivity a USING productivity b
        WHERE a.user_id = b.user_id AND a.date = b.date AND a.id < b.id",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_productivity_user_date
        ON productivity (user_id, date)",
];

/// Columns cast to the Rust-side types; legacy tables used FLOAT/TIMESTAMP.
const DAY_SELECT: &str = "SELECT user_id, date,
        sleep_hours::float8 AS sleep_hours, sleep_score::bigint AS sleep_score,
        workout_type, workout_score::bigint AS workout_score,
        wakeup_time, wakeup_score::bigint AS wakeup_score,
        python_hours::float8 AS python_hours, python_score::bigint AS python_score,
        total_score::bigint AS total_score, created_at::timestamptz AS created_at
    FROM productivity";

#[derive(sqlx::FromRow)]
struct DayRow {
    user_id: i64,
    date: NaiveDate,
    sleep_hours: f64,
    sleep_score: i64,
    workout_type: Option<String>,
    workout_score: i64,
    wakeup_time: Option<String>,
    wakeup_score: i64,
    python_hours: f64,
    python_score: i64,
    total_score: i64,
    created_at: Option<DateTime<Utc>>,
}

impl From<DayRow> for DailyRecord {
    fn from(row: DayRow) -> Self {
        Self {
            user_id: row.user_id,
            date: row.date,
            sleep_hours: row.sleep_hours,
            sleep_score: row.sleep_score,
            workout_type: row.workout_type,
            workout_score: row.workout_score,
            wakeup_time: row.wakeup_time,
            wakeup_score: row.wakeup_score,
            python_hours: row.python_hours,
            python_score: row.python_score,
            total_score: row.total_score,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AggregateRow {
    days_count: i64,
    avg_score: f64,
    perfect_days: i64,
    good_days: i64,
}

#[derive(sqlx::FromRow)]
struct GlobalRow {
    users_count: i64,
    days_count: i64,
    avg_score: f64,
    perfect_days: i64,
}

/// Pooled PostgreSQL backend. Connections return to the pool on drop.
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Connect to `url` and ensure the schema exists.
    pub async fn connect(url: &str) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to connect to PostgreSQL: {e}")))?;

        let backend = Self { pool };
        backend.ensure_schema().await?;
        info!("PostgreSQL database connected");
        Ok(backend)
    }
}

#[async_trait]
impl DayStore for PostgresBackend {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        for sql in SCHEMA_SQL {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| DatabaseError::Migration(format!("ensure_schema: {e}")))?;
        }
        Ok(())
    }

    async fn upsert_day(&self, record: &DailyRecord) -> Result<(), DatabaseError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_day: begin: {e}")))?;

        sqlx::query(
            "INSERT INTO productivity (user_id, date, sleep_hours, sleep_score, workout_type,
                 workout_score, wakeup_time, wakeup_score, python_hours, python_score, total_score)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (user_id, date) DO UPDATE SET
                 sleep_hours = EXCLUDED.sleep_hours,
                 sleep_score = EXCLUDED.sleep_score,
                 workout_type = EXCLUDED.workout_type,
                 workout_score = EXCLUDED.workout_score,
                 wakeup_time = EXCLUDED.wakeup_time,
                 wakeup_score = EXCLUDED.wakeup_score,
                 python_hours = EXCLUDED.python_hours,
                 python_score = EXCLUDED.python_score,
                 total_score = EXCLUDED.total_score",
        )
        .bind(record.user_id)
        .bind(record.date)
        .bind(record.sleep_hours)
        .bind(record.sleep_score as i32)
        .bind(record.workout_type.as_deref())
        .bind(record.workout_score as i32)
        .bind(record.wakeup_time.as_deref())
        .bind(record.wakeup_score as i32)
        .bind(record.python_hours)
        .bind(record.python_score as i32)
        .bind(record.total_score as i32)
        .execute(&mut *tx)
        .await
        .map_err(|e| DatabaseError::Query(format!("upsert_day: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_day: commit: {e}")))?;

        debug!(
            user_id = record.user_id,
            date = %record.date,
            total = record.total_score,
            "Day upserted"
        );
        Ok(())
    }

    async fn query_aggregate(&self, user_id: i64) -> Result<Option<UserStats>, DatabaseError> {
        let row = sqlx::query_as::<_, AggregateRow>(
            "SELECT COUNT(*) AS days_count,
                    COALESCE(AVG(total_score), 0)::float8 AS avg_score,
                    COALESCE(SUM(CASE WHEN total_score = 100 THEN 1 ELSE 0 END), 0)::bigint AS perfect_days,
                    COALESCE(SUM(CASE WHEN total_score >= 70 THEN 1 ELSE 0 END), 0)::bigint AS good_days
             FROM productivity WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::Query(format!("query_aggregate: {e}")))?;

        if row.days_count == 0 {
            return Ok(None);
        }
        Ok(Some(UserStats {
            days_count: row.days_count,
            avg_score: round_one_decimal(row.avg_score),
            perfect_days: row.perfect_days,
            good_days: row.good_days,
        }))
    }

    async fn get_day(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Option<DailyRecord>, DatabaseError> {
        let row = sqlx::query_as::<_, DayRow>(&format!(
            "{DAY_SELECT} WHERE user_id = $1 AND date = $2"
        ))
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::Query(format!("get_day: {e}")))?;

        Ok(row.map(DailyRecord::from))
    }

    async fn recent_days(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<DailyRecord>, DatabaseError> {
        let rows = sqlx::query_as::<_, DayRow>(&format!(
            "{DAY_SELECT} WHERE user_id = $1 ORDER BY date DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::Query(format!("recent_days: {e}")))?;

        Ok(rows.into_iter().map(DailyRecord::from).collect())
    }

    async fn global_summary(&self) -> Result<GlobalStats, DatabaseError> {
        let row = sqlx::query_as::<_, GlobalRow>(
            "SELECT COUNT(DISTINCT user_id) AS users_count,
                    COUNT(*) AS days_count,
                    COALESCE(AVG(total_score), 0)::float8 AS avg_score,
                    COALESCE(SUM(CASE WHEN total_score = 100 THEN 1 ELSE 0 END), 0)::bigint AS perfect_days
             FROM productivity",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::Query(format!("global_summary: {e}")))?;

        Ok(GlobalStats {
            users_count: row.users_count,
            days_count: row.days_count,
            avg_score: round_one_decimal(row.avg_score),
            perfect_days: row.perfect_days,
        })
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::Query(format!("ping: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::SessionDraft;

    /// Runs only when `TEST_DATABASE_URL` points at a scratch PostgreSQL database.
    async fn test_db() -> Option<PostgresBackend> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let db = PostgresBackend::connect(&url).await.unwrap();
        sqlx::query("DELETE FROM productivity WHERE user_id < 0")
            .execute(&db.pool)
            .await
            .unwrap();
        Some(db)
    }

    #[tokio::test]
    async fn refinalize_replaces_row() {
        let Some(db) = test_db().await else {
            return;
        };
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let mut record = DailyRecord::from_draft(-1, date, &SessionDraft::default());
        record.sleep_score = 30;
        record.python_score = 20;
        record.total_score = 50;
        db.upsert_day(&record).await.unwrap();
        let first = db.get_day(-1, date).await.unwrap().unwrap();

        record.python_score = 25;
        record.wakeup_score = 20;
        record.workout_score = 5;
        record.total_score = 80;
        db.upsert_day(&record).await.unwrap();

        let stored = db.get_day(-1, date).await.unwrap().unwrap();
        assert_eq!(stored.total_score, 80);
        assert_eq!(stored.created_at, first.created_at);

        let stats = db.query_aggregate(-1).await.unwrap().unwrap();
        assert_eq!(stats.days_count, 1);
        assert_eq!(stats.avg_score, 80.0);
        assert_eq!(stats.good_days, 1);
    }

    #[tokio::test]
    async fn aggregate_without_rows_is_none() {
        let Some(db) = test_db().await else {
            return;
        };
        assert!(db.query_aggregate(-2).await.unwrap().is_none());
    }
}
