//! Persistence layer: one `DayStore` trait, an embedded and a server backend.

pub mod libsql_backend;
pub mod migrations;
#[cfg(feature = "postgres")]
pub mod postgres_backend;
pub mod traits;

use std::sync::Arc;

pub use libsql_backend::LibSqlBackend;
#[cfg(feature = "postgres")]
pub use postgres_backend::PostgresBackend;
pub use traits::{DailyRecord, DayStore, GlobalStats, UserStats};

use crate::config::{StorageConfig, StorageTarget};
use crate::error::DatabaseError;

/// Open the store selected by `config` and ensure its schema.
///
/// A server URL falls back to the embedded engine when the binary was built
/// without the `postgres` feature.
pub async fn open(config: &StorageConfig) -> Result<Arc<dyn DayStore>, DatabaseError> {
    match config.target() {
        StorageTarget::Embedded(path) => Ok(Arc::new(LibSqlBackend::new_local(&path).await?)),
        #[cfg(feature = "postgres")]
        StorageTarget::Server(url) => Ok(Arc::new(PostgresBackend::connect(&url).await?)),
        #[cfg(not(feature = "postgres"))]
        StorageTarget::Server(_) => {
            tracing::warn!(
                path = crate::config::DEFAULT_DB_PATH,
                "PostgreSQL support not compiled in; falling back to embedded database"
            );
            Ok(Arc::new(
                LibSqlBackend::new_local(std::path::Path::new(crate::config::DEFAULT_DB_PATH)).await?,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_embedded_from_sqlite_url() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("kpd.db");
        let config = StorageConfig {
            database_url: format!("sqlite://{}", path.display()),
        };

        let store = open(&config).await.unwrap();
        assert_eq!(store.backend_name(), "libsql");
        store.ping().await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn unopenable_path_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        // A regular file where a directory is needed.
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let config = StorageConfig {
            database_url: format!("sqlite://{}", blocker.join("kpd.db").display()),
        };

        assert!(matches!(open(&config).await, Err(DatabaseError::Pool(_))));
    }
}
