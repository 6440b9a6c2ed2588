//! Version-tracked schema migrations for the libSQL backend.
//!
//! Each migration has a version number and SQL. `run_migrations()` checks
//! the current version and applies only the new ones sequentially.
//! A database written by an older deployment (a `productivity` table but no
//! `_migrations` table) is detected and seeded at V1 without re-creating the
//! table, so V2 can deduplicate its rows before adding the unique key.

use libsql::Connection;

use crate::error::DatabaseError;

/// A single migration step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: r#"
            CREATE TABLE IF NOT EXISTS productivity (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                sleep_hours REAL NOT NULL DEFAULT 0,
                sleep_score INTEGER NOT NULL DEFAULT 0,
                workout_type TEXT,
                workout_score INTEGER NOT NULL DEFAULT 0,
                wakeup_time TEXT,
                wakeup_score INTEGER NOT NULL DEFAULT 0,
                python_hours REAL NOT NULL DEFAULT 0,
                python_score INTEGER NOT NULL DEFAULT 0,
                total_score INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_productivity_user ON productivity(user_id);
        "#,
    },
    Migration {
        version: 2,
        name: "unique_user_day",
        sql: r#"
            DELETE FROM productivity
                WHERE id NOT IN (SELECT MAX(id) FROM productivity GROUP BY user_id, date);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_productivity_user_date
                ON productivity(user_id, date);
        "#,
    },
];

/// Run all pending migrations against the given connection.
///
/// Creates the `_migrations` table if it doesn't exist. Safe to call on
/// every startup.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to create _migrations table: {e}")))?;

    let current_version = get_current_version(conn).await?;

    // Table from an older deployment: keep its rows, skip the V1 DDL.
    if current_version == 0 && legacy_table_exists(conn).await? {
        seed_version(conn, 1, "initial_schema").await?;
        tracing::info!("Existing productivity table detected, seeded migration V1");
    }
    let current_version = get_current_version(conn).await?;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            conn.execute_batch(migration.sql).await.map_err(|e| {
                DatabaseError::Migration(format!(
                    "Migration V{} ({}) failed: {e}",
                    migration.version, migration.name
                ))
            })?;
            seed_version(conn, migration.version, migration.name).await?;
        }
    }

    let version = get_current_version(conn).await?;
    tracing::info!(version, "Database migrations complete");
    Ok(())
}

/// Get the highest applied migration version, or 0 if none.
async fn get_current_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to query migration version: {e}")))?;

    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to read migration version: {e}")))?;

    match row {
        Some(row) => row.get::<i64>(0).map_err(|e| {
            DatabaseError::Migration(format!("Failed to parse migration version: {e}"))
        }),
        None => Ok(0),
    }
}

async fn legacy_table_exists(conn: &Connection) -> Result<bool, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='productivity'",
            (),
        )
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to check existing tables: {e}")))?;

    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to read table check: {e}")))?;

    let Some(row) = row else {
        return Ok(false);
    };
    let count: i64 = row
        .get(0)
        .map_err(|e| DatabaseError::Migration(format!("Failed to read table check: {e}")))?;
    Ok(count > 0)
}

/// Insert a version record into `_migrations`.
async fn seed_version(conn: &Connection, version: i64, name: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO _migrations (version, name) VALUES (?1, ?2)",
        libsql::params![version, name],
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to record migration V{version}: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_conn() -> Connection {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .unwrap();
        db.connect().unwrap()
    }

    async fn count(conn: &Connection, sql: &str) -> i64 {
        let mut rows = conn.query(sql, ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        row.get(0).unwrap()
    }

    #[tokio::test]
    async fn migrations_create_table_and_index() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();

        assert_eq!(
            count(
                &conn,
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='productivity'"
            )
            .await,
            1
        );
        assert_eq!(
            count(
                &conn,
                "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name='idx_productivity_user_date'"
            )
            .await,
            1
        );
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();
        run_migrations(&conn).await.unwrap();

        let version = get_current_version(&conn).await.unwrap();
        assert_eq!(version, 2);
    }

    #[tokio::test]
    async fn legacy_rows_are_deduplicated() {
        let conn = test_conn().await;

        // Older deployments had no unique key and appended a row per finalize.
        conn.execute_batch(
            "CREATE TABLE productivity (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER,
                date TEXT,
                sleep_hours REAL DEFAULT 0,
                sleep_score INTEGER DEFAULT 0,
                workout_type TEXT,
                workout_score INTEGER DEFAULT 0,
                wakeup_time TEXT,
                wakeup_score INTEGER DEFAULT 0,
                python_hours REAL DEFAULT 0,
                python_score INTEGER DEFAULT 0,
                total_score INTEGER DEFAULT 0,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );
            INSERT INTO productivity (user_id, date, total_score) VALUES (1, '2024-01-01', 40);
            INSERT INTO productivity (user_id, date, total_score) VALUES (1, '2024-01-01', 75);
            INSERT INTO productivity (user_id, date, total_score) VALUES (1, '2024-01-02', 10);",
        )
        .await
        .unwrap();

        run_migrations(&conn).await.unwrap();

        assert_eq!(get_current_version(&conn).await.unwrap(), 2);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM productivity").await, 2);
        assert_eq!(
            count(
                &conn,
                "SELECT total_score FROM productivity WHERE user_id = 1 AND date = '2024-01-01'"
            )
            .await,
            75
        );
    }

    #[tokio::test]
    async fn version_tracking() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();

        let mut rows = conn
            .query("SELECT version, name FROM _migrations ORDER BY version", ())
            .await
            .unwrap();
        let row1 = rows.next().await.unwrap().unwrap();
        assert_eq!(row1.get::<i64>(0).unwrap(), 1);
        assert_eq!(row1.get::<String>(1).unwrap(), "initial_schema");

        let row2 = rows.next().await.unwrap().unwrap();
        assert_eq!(row2.get::<i64>(0).unwrap(), 2);
        assert_eq!(row2.get::<String>(1).unwrap(), "unique_user_day");
    }
}
