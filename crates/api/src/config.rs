use std::path::PathBuf;
use std::str::FromStr;

use fieldcrm_core::suggestion::StalePolicy;
use fieldcrm_core::types::Timestamp;

use crate::auth::jwt::JwtConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in the environment")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings of the background file cleanup job.
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// Seconds between cleanup passes (default: `300`).
    pub interval_secs: u64,
    /// Staged uploads not claimed by a suggestion within this many hours are
    /// purged (default: `24`).
    pub staged_upload_ttl_hours: i64,
    /// Queued deletions are given up after this many failed attempts
    /// (default: `10`).
    pub max_attempts: i32,
}

/// Longest accepted staged upload TTL: one year.
pub const MAX_STAGED_UPLOAD_TTL_HOURS: i64 = 24 * 365;

impl CleanupConfig {
    /// Creation time before which an unclaimed staged upload is purged, or
    /// `None` when the TTL does not fit a timestamp.
    pub fn staged_cutoff(&self, now: Timestamp) -> Option<Timestamp> {
        chrono::Duration::try_hours(self.staged_upload_ttl_hours)
            .and_then(|ttl| now.checked_sub_signed(ttl))
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            staged_upload_ttl_hours: 24,
            max_attempts: 10,
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Largest accepted request body, uploads included (default: 25 MiB).
    pub max_upload_bytes: usize,
    /// Root directory of the local blob store (default: `storage/files`).
    pub storage_root: PathBuf,
    /// Handling of suggestions whose contractor changed after creation.
    pub stale_policy: StalePolicy,
    pub cleanup: CleanupConfig,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `HOST`                        | `0.0.0.0`               |
    /// | `PORT`                        | `3000`                  |
    /// | `CORS_ORIGINS`                | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`       | `30`                    |
    /// | `MAX_UPLOAD_BYTES`            | `26214400`              |
    /// | `STORAGE_ROOT`                | `storage/files`         |
    /// | `SUGGESTION_STALE_POLICY`     | `last_writer_wins`      |
    /// | `FILE_CLEANUP_INTERVAL_SECS`  | `300`                   |
    /// | `STAGED_UPLOAD_TTL_HOURS`     | `24`                    |
    /// | `FILE_CLEANUP_MAX_ATTEMPTS`   | `10`                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = env_or("PORT", 3000u16)?;

        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs = env_or("REQUEST_TIMEOUT_SECS", 30u64)?;
        let shutdown_timeout_secs = env_or("SHUTDOWN_TIMEOUT_SECS", 30u64)?;
        let max_upload_bytes = env_or("MAX_UPLOAD_BYTES", 25 * 1024 * 1024usize)?;

        let storage_root = std::env::var("STORAGE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("storage/files"));

        let stale_policy = match std::env::var("SUGGESTION_STALE_POLICY") {
            Ok(value) => StalePolicy::parse(&value).map_err(|e| ConfigError::Invalid {
                var: "SUGGESTION_STALE_POLICY",
                value: value.clone(),
                reason: e.to_string(),
            })?,
            Err(_) => StalePolicy::default(),
        };

        let defaults = CleanupConfig::default();
        let cleanup = CleanupConfig {
            interval_secs: env_or("FILE_CLEANUP_INTERVAL_SECS", defaults.interval_secs)?,
            staged_upload_ttl_hours: staged_upload_ttl_hours(env_or(
                "STAGED_UPLOAD_TTL_HOURS",
                defaults.staged_upload_ttl_hours,
            )?)?,
            max_attempts: env_or("FILE_CLEANUP_MAX_ATTEMPTS", defaults.max_attempts)?,
        };

        let jwt = JwtConfig::from_env()?;

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            max_upload_bytes,
            storage_root,
            stale_policy,
            cleanup,
            jwt,
        })
    }
}

/// Read `var` and parse it, falling back to `default` when unset.
pub(crate) fn env_or<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(value) => parse_value(var, &value),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn staged_upload_ttl_hours(hours: i64) -> Result<i64, ConfigError> {
    if !(0..=MAX_STAGED_UPLOAD_TTL_HOURS).contains(&hours) {
        return Err(ConfigError::Invalid {
            var: "STAGED_UPLOAD_TTL_HOURS",
            value: hours.to_string(),
            reason: format!("must be between 0 and {MAX_STAGED_UPLOAD_TTL_HOURS}"),
        });
    }
    Ok(hours)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
