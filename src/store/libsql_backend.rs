//! libSQL backend: the embedded, file-backed `DayStore`.
//!
//! Upserts use replace semantics (`INSERT OR REPLACE`) against the unique
//! `(user_id, date)` index, carrying `created_at` over from the replaced row.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{DailyRecord, DayStore, GlobalStats, UserStats, round_one_decimal};

/// libSQL database backend.
///
/// Holds one connection reused for all operations; `libsql::Connection` is
/// `Send + Sync`. Every write runs in its own transaction, which rolls back
/// on drop if not committed.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.ensure_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.ensure_schema().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    // CURRENT_TIMESTAMP output from rows written by older deployments
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Map a libsql Row to a DailyRecord.
///
/// Column order matches DAY_COLUMNS.
fn row_to_record(row: &libsql::Row) -> Result<DailyRecord, DatabaseError> {
    let column = |e: libsql::Error| DatabaseError::Query(format!("productivity row: {e}"));

    let date_str: String = row.get(1).map_err(column)?;
    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
        .map_err(|e| DatabaseError::Query(format!("bad date column {date_str:?}: {e}")))?;

    Ok(DailyRecord {
        user_id: row.get(0).map_err(column)?,
        date,
        sleep_hours: row.get(2).map_err(column)?,
        sleep_score: row.get(3).map_err(column)?,
        workout_type: row.get::<String>(4).ok(),
        workout_score: row.get(5).map_err(column)?,
        wakeup_time: row.get::<String>(6).ok(),
        wakeup_score: row.get(7).map_err(column)?,
        python_hours: row.get(8).map_err(column)?,
        python_score: row.get(9).map_err(column)?,
        total_score: row.get(10).map_err(column)?,
        created_at: row.get::<String>(11).ok().map(|s| parse_datetime(&s)),
    })
}

const DAY_COLUMNS: &str = "user_id, date, sleep_hours, sleep_score, workout_type, workout_score, wakeup_time, wakeup_score, python_hours, python_score, total_score, created_at";

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl DayStore for LibSqlBackend {
    fn backend_name(&self) -> &'static str {
        "libsql"
    }

    async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn upsert_day(&self, record: &DailyRecord) -> Result<(), DatabaseError> {
        let tx = self
            .conn()
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_day: begin: {e}")))?;

        let now = Utc::now().to_rfc3339();
        tx.execute(
            &format!(
                "INSERT OR REPLACE INTO productivity ({DAY_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                     COALESCE(
                         (SELECT created_at FROM productivity WHERE user_id = ?1 AND date = ?2),
                         ?12
                     ))"
            ),
            params![
                record.user_id,
                record.date.format("%Y-%m-%d").to_string(),
                record.sleep_hours,
                record.sleep_score,
                opt_text(record.workout_type.as_deref()),
                record.workout_score,
                opt_text(record.wakeup_time.as_deref()),
                record.wakeup_score,
                record.python_hours,
                record.python_score,
                record.total_score,
                now
            ],
        )
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
        let mut rows = self
            .conn()
            .query(
                "SELECT COUNT(*),
                        COALESCE(AVG(total_score), 0.0),
                        COALESCE(SUM(CASE WHEN total_score = 100 THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(CASE WHEN total_score >= 70 THEN 1 ELSE 0 END), 0)
                 FROM productivity WHERE user_id = ?1",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("query_aggregate: {e}")))?;

        let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("query_aggregate: {e}")))?
        else {
            return Ok(None);
        };

        let column = |e: libsql::Error| DatabaseError::Query(format!("query_aggregate: {e}"));
        let days_count: i64 = row.get(0).map_err(column)?;
        if days_count == 0 {
            return Ok(None);
        }

        Ok(Some(UserStats {
            days_count,
            avg_score: round_one_decimal(row.get::<f64>(1).map_err(column)?),
            perfect_days: row.get(2).map_err(column)?,
            good_days: row.get(3).map_err(column)?,
        }))
    }

    async fn get_day(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Option<DailyRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {DAY_COLUMNS} FROM productivity WHERE user_id = ?1 AND date = ?2"),
                params![user_id, date.format("%Y-%m-%d").to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_day: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("get_day: {e}")))?
        {
            Some(row) => row_to_record(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn recent_days(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<DailyRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {DAY_COLUMNS} FROM productivity WHERE user_id = ?1 ORDER BY date DESC LIMIT ?2"
                ),
                params![user_id, limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("recent_days: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("recent_days: {e}")))?
        {
            records.push(row_to_record(&row)?);
        }
        Ok(records)
    }

    async fn global_summary(&self) -> Result<GlobalStats, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT COUNT(DISTINCT user_id),
                        COUNT(*),
                        COALESCE(AVG(total_score), 0.0),
                        COALESCE(SUM(CASE WHEN total_score = 100 THEN 1 ELSE 0 END), 0)
                 FROM productivity",
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("global_summary: {e}")))?;

        let column = |e: libsql::Error| DatabaseError::Query(format!("global_summary: {e}"));
        let Some(row) = rows.next().await.map_err(column)? else {
            return Ok(GlobalStats::default());
        };

        Ok(GlobalStats {
            users_count: row.get(0).map_err(column)?,
            days_count: row.get(1).map_err(column)?,
            avg_score: round_one_decimal(row.get::<f64>(2).map_err(column)?),
            perfect_days: row.get(3).map_err(column)?,
        })
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        self.conn()
            .query("SELECT 1", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("ping: {e}")))?;
        Ok(())
    }
}
