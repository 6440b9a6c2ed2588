//! Configuration types, read from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Database file used when no URL is given or the server engine is unavailable.
pub const DEFAULT_DB_PATH: &str = "bot.db";

/// Full process configuration.
#[derive(Debug)]
pub struct Config {
    pub bot: BotConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub retry: RetryConfig,
    /// Directory for daily-rolling log files. Logs go to stderr only when unset.
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Build the configuration from the environment.
    ///
    /// Only `TELEGRAM_BOT_TOKEN` is required.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bot: BotConfig::from_env()?,
            storage: StorageConfig::from_env(),
            server: ServerConfig::from_env()?,
            retry: RetryConfig::from_env()?,
            log_dir: std::env::var("KPD_LOG_DIR").ok().map(PathBuf::from),
        })
    }
}

/// Telegram bot settings.
#[derive(Debug)]
pub struct BotConfig {
    pub token: SecretString,
    /// Usernames or numeric ids allowed to talk to the bot; `*` allows everyone.
    pub allowed_users: Vec<String>,
    /// Long-poll timeout passed to `getUpdates`.
    pub poll_timeout: Duration,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN".into()))?;

        let allowed_users = parse_list(
            &std::env::var("TELEGRAM_ALLOWED_USERS").unwrap_or_else(|_| "*".to_string()),
        );

        Ok(Self {
            token: SecretString::from(token),
            allowed_users,
            poll_timeout: Duration::from_secs(env_or("KPD_POLL_TIMEOUT_SECS", 20)?),
        })
    }
}

/// Which engine backs the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    /// Embedded libSQL file.
    Embedded(PathBuf),
    /// PostgreSQL connection URL.
    Server(String),
}

/// Storage settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub database_url: String,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| format!("sqlite://{DEFAULT_DB_PATH}")),
        }
    }

    /// Classify the URL. `postgres://` and `postgresql://` select the server
    /// engine; `sqlite://<path>`, `file:<path>` or a bare path select the
    /// embedded engine.
    pub fn target(&self) -> StorageTarget {
        let url = self.database_url.trim();
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            return StorageTarget::Server(url.to_string());
        }

        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .or_else(|| url.strip_prefix("file:"))
            .unwrap_or(url);

        if path.is_empty() {
            StorageTarget::Embedded(PathBuf::from(DEFAULT_DB_PATH))
        } else {
            StorageTarget::Embedded(PathBuf::from(path))
        }
    }
}

/// Status page settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Shown on the dashboard and used for the t.me link.
    pub bot_username: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            port: env_or("PORT", 5000)?,
            bot_username: std::env::var("BOT_USERNAME")
                .unwrap_or_else(|_| "ProductivityTrackerBot".to_string()),
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            bot_username: "ProductivityTrackerBot".to_string(),
        }
    }
}

/// Restart policy for the polling transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            max_attempts: env_or("KPD_RETRY_MAX_ATTEMPTS", 5)?,
            initial_backoff: Duration::from_millis(env_or("KPD_RETRY_INITIAL_BACKOFF_MS", 1000)?),
            max_backoff: Duration::from_millis(env_or("KPD_RETRY_MAX_BACKOFF_MS", 30_000)?),
        };
        if config.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "KPD_RETRY_MAX_ATTEMPTS".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(config)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Read `key` and parse it, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(url: &str) -> StorageConfig {
        StorageConfig {
            database_url: url.to_string(),
        }
    }

    #[test]
    fn postgres_urls_select_server() {
        assert_eq!(
            storage("postgres://u:p@db:5432/kpd").target(),
            StorageTarget::Server("postgres://u:p@db:5432/kpd".into())
        );
        assert!(matches!(
            storage("postgresql://db/kpd").target(),
            StorageTarget::Server(_)
        ));
    }

    #[test]
    fn sqlite_urls_select_embedded() {
        assert_eq!(
            storage("sqlite://bot.db").target(),
            StorageTarget::Embedded(PathBuf::from("bot.db"))
        );
        assert_eq!(
            storage("sqlite:///var/lib/kpd/bot.db").target(),
            StorageTarget::Embedded(PathBuf::from("/var/lib/kpd/bot.db"))
        );
        assert_eq!(
            storage("./data/kpd.db").target(),
            StorageTarget::Embedded(PathBuf::from("./data/kpd.db"))
        );
        assert_eq!(
            storage("sqlite://").target(),
            StorageTarget::Embedded(PathBuf::from(DEFAULT_DB_PATH))
        );
    }

    #[test]
    fn list_parsing_trims_and_drops_empty() {
        assert_eq!(parse_list(" alice, 42 ,,"), vec!["alice", "42"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn retry_defaults() {
        let retry = RetryConfig::default();
        assert_eq!(retry.max_attempts, 5);
        assert!(retry.initial_backoff < retry.max_backoff);
    }
}
