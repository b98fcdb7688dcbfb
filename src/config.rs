//! Environment-derived configuration
//!
//! Values come from the process environment (after `.env` has been loaded by
//! the binary). Missing or unparsable values fall back to defaults with a log
//! line, so a bare `cargo run` works out of the box.

use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (`PORT`)
    pub port: u16,

    /// Path of the redb file (`DATABASE_URL`)
    pub database_path: PathBuf,

    /// Directory holding JSON backups (`BACKUP_DIR`)
    pub backup_dir: PathBuf,

    /// Directory for uploaded images and videos (`MEDIA_DIR`)
    pub media_dir: PathBuf,

    /// Token required in the `Authorization` header on admin routes
    /// (`ADMIN_TOKEN`); admin routes are open when unset
    pub admin_token: Option<String>,

    /// Recipient of order e-mails (`ORDER_EMAIL`)
    pub order_email: String,

    /// Minimum time between scheduled backups (`BACKUP_INTERVAL_HOURS`)
    pub backup_interval: Duration,

    /// How often the scheduler wakes up to check (`BACKUP_CHECK_MINUTES`)
    pub backup_check_interval: Duration,

    /// Age after which backup files are deleted (`BACKUP_RETENTION_DAYS`)
    pub backup_retention: Duration,

    /// Allowed CORS origins (`CORS_ORIGINS`, comma separated); any origin when empty
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn load() -> Self {
        let hours = non_zero("BACKUP_INTERVAL_HOURS", try_load("BACKUP_INTERVAL_HOURS", 24), 24);
        let minutes = non_zero("BACKUP_CHECK_MINUTES", try_load("BACKUP_CHECK_MINUTES", 60), 60);
        let days = non_zero("BACKUP_RETENTION_DAYS", try_load("BACKUP_RETENTION_DAYS", 7), 7);

        Self {
            port: try_load("PORT", 8080),
            database_path: PathBuf::from(try_load("DATABASE_URL", "data.db".to_string())),
            backup_dir: PathBuf::from(try_load("BACKUP_DIR", "backups".to_string())),
            media_dir: PathBuf::from(try_load("MEDIA_DIR", "media".to_string())),
            admin_token: env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty()),
            order_email: try_load("ORDER_EMAIL", "shop@example.com".to_string()),
            backup_interval: Duration::from_secs(hours * 60 * 60),
            backup_check_interval: Duration::from_secs(minutes * 60),
            backup_retention: Duration::from_secs(days * 24 * 60 * 60),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_path: PathBuf::from("data.db"),
            backup_dir: PathBuf::from("backups"),
            media_dir: PathBuf::from("media"),
            admin_token: None,
            order_email: "shop@example.com".to_string(),
            backup_interval: Duration::from_secs(24 * 60 * 60),
            backup_check_interval: Duration::from_secs(60 * 60),
            backup_retention: Duration::from_secs(7 * 24 * 60 * 60),
            cors_origins: Vec::new(),
        }
    }
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            default
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}

/// Backup periods of zero would stop the scheduler
fn non_zero(key: &str, value: u64, default: u64) -> u64 {
    if value == 0 {
        warn!("{key} must be greater than zero, using default: {default}");
        default
    } else {
        value
    }
}
