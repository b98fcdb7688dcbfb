//! JSON backups of the product catalog
//!
//! A backup writes every product to
//! `<backup dir>/products-backup-<timestamp>.json` and then prunes backups
//! older than the retention window. A restore loads one of those files back,
//! but only into an empty catalog; a populated catalog is left untouched.
//!
//! Every operation accepts an already open [`CatalogStore`]. When none is
//! given the job opens the database itself, retrying with backoff, and closes
//! it again before returning.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{SecondsFormat, Utc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::database::CatalogStore;
use crate::error::{BackupError, StoreError};
use crate::model::Product;
use crate::retry::{with_retry, RetryConfig};

const FILE_PREFIX: &str = "products-backup-";
const FILE_SUFFIX: &str = ".json";
const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Result of a restore attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The catalog was empty and this many products were inserted
    Restored(usize),
    /// The catalog already had products, nothing was written
    SkippedNotEmpty,
}

/// Backup, restore and retention settings
#[derive(Debug, Clone)]
pub struct BackupJob {
    backup_dir: PathBuf,
    database_path: PathBuf,
    retention: Duration,
    retry: RetryConfig,
}

impl BackupJob {
    pub fn new(backup_dir: impl Into<PathBuf>, database_path: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            database_path: database_path.into(),
            retention: Duration::from_secs(7 * 24 * 60 * 60),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Writes a snapshot of the catalog and prunes old backups
    ///
    /// Returns the path of the new backup file.
    pub async fn backup_products(
        &self,
        store: Option<&CatalogStore>,
    ) -> Result<PathBuf, BackupError> {
        self.run_backup(store)
            .await
            .inspect(|path| info!("Backup created at: {}", path.display()))
            .inspect_err(|e| error!("Backup failed: {e}"))
    }

    /// Loads `file_name` from the backup directory into an empty catalog
    pub async fn restore_products(
        &self,
        file_name: &str,
        store: Option<&CatalogStore>,
    ) -> Result<RestoreOutcome, BackupError> {
        self.run_restore(file_name, store)
            .await
            .inspect(|outcome| match outcome {
                RestoreOutcome::Restored(n) => info!("{n} products restored successfully"),
                RestoreOutcome::SkippedNotEmpty => info!("Catalog not empty, skipping restore"),
            })
            .inspect_err(|e| error!("Restore failed: {e}"))
    }

    async fn run_backup(&self, store: Option<&CatalogStore>) -> Result<PathBuf, BackupError> {
        let products = match store {
            Some(store) => store.list()?,
            // Opened for this call only, closed when dropped
            None => self.open_store().await?.list()?,
        };

        tokio::fs::create_dir_all(&self.backup_dir)
            .await
            .map_err(|e| self.io_error(&self.backup_dir, e))?;

        let path = self.backup_dir.join(backup_file_name(Utc::now()));
        let json = serde_json::to_string_pretty(&products).map_err(|source| BackupError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| self.io_error(&path, e))?;

        let job = self.clone();
        if let Err(e) =
            tokio::task::spawn_blocking(move || job.cleanup_old_backups(SystemTime::now())).await
        {
            warn!("Backup cleanup task failed: {e}");
        }

        Ok(path)
    }

    async fn run_restore(
        &self,
        file_name: &str,
        store: Option<&CatalogStore>,
    ) -> Result<RestoreOutcome, BackupError> {
        let opened;
        let store = match store {
            Some(store) => store,
            None => {
                opened = self.open_store().await?;
                &opened
            }
        };

        let path = self.resolve_file(file_name)?;
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| self.io_error(&path, e))?;
        let products: Vec<Product> =
            serde_json::from_str(&raw).map_err(|source| BackupError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        if store.count()? > 0 {
            return Ok(RestoreOutcome::SkippedNotEmpty);
        }

        Ok(RestoreOutcome::Restored(store.insert_many(&products)?))
    }

    /// Deletes backup files created before `now - retention`
    ///
    /// Failures are logged and never propagate. Returns how many files were
    /// deleted.
    pub fn cleanup_old_backups(&self, now: SystemTime) -> usize {
        let Some(cutoff) = now.checked_sub(self.retention) else {
            return 0;
        };

        let mut deleted = 0;
        let result = (|| -> std::io::Result<()> {
            for entry in fs::read_dir(&self.backup_dir)? {
                let entry = entry?;
                if !is_backup_file(&entry.file_name().to_string_lossy()) {
                    continue;
                }

                let metadata = entry.metadata()?;
                if metadata.is_file() && file_time(&metadata)? < cutoff {
                    fs::remove_file(entry.path())?;
                    info!("Deleted old backup: {}", entry.file_name().to_string_lossy());
                    deleted += 1;
                }
            }
            Ok(())
        })();

        if let Err(e) = result {
            warn!("Error cleaning up old backups: {e}");
        }

        deleted
    }

    /// Creation time of the newest backup file, if any
    pub fn latest_backup_time(&self) -> Option<SystemTime> {
        fs::read_dir(&self.backup_dir)
            .ok()?
            .filter_map(Result::ok)
            .filter(|entry| is_backup_file(&entry.file_name().to_string_lossy()))
            .filter_map(|entry| file_time(&entry.metadata().ok()?).ok())
            .max()
    }

    async fn open_store(&self) -> Result<CatalogStore, StoreError> {
        let store = with_retry(&self.retry, || async {
            CatalogStore::open(&self.database_path)
        })
        .await?;
        info!("Connected to catalog store at {}", self.database_path.display());
        Ok(store)
    }

    /// Backup names are plain file names inside the backup directory
    fn resolve_file(&self, file_name: &str) -> Result<PathBuf, BackupError> {
        let name = Path::new(file_name);
        let is_plain = name.components().count() == 1
            && name.file_name().is_some_and(|n| n == name.as_os_str());
        if !is_plain {
            return Err(BackupError::InvalidFileName(file_name.to_string()));
        }
        Ok(self.backup_dir.join(name))
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> BackupError {
        BackupError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// `products-backup-2024-01-15T10-30-45-123Z.json` for 2024-01-15T10:30:45.123Z
pub fn backup_file_name(at: chrono::DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{FILE_PREFIX}{stamp}{FILE_SUFFIX}")
}

fn is_backup_file(name: &str) -> bool {
    name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX)
}

/// Creation time, or modification time where the filesystem has no birth time
pub(crate) fn file_time(metadata: &fs::Metadata) -> std::io::Result<SystemTime> {
    metadata.created().or_else(|_| metadata.modified())
}

/// Whether a scheduled backup should run now
pub fn is_due(last_backup: Option<SystemTime>, now: SystemTime, interval: Duration) -> bool {
    match last_backup {
        None => true,
        Some(last) => now.duration_since(last).map_or(false, |elapsed| elapsed >= interval),
    }
}

/// Timer-driven backups
///
/// Wakes up every `check_interval` and runs a backup when `backup_interval`
/// has passed since the newest backup on disk. Timing drifts with the check
/// interval.
pub struct BackupScheduler {
    job: Arc<BackupJob>,
    store: CatalogStore,
    check_interval: Duration,
    backup_interval: Duration,
}

impl BackupScheduler {
    pub fn new(
        job: Arc<BackupJob>,
        store: CatalogStore,
        check_interval: Duration,
        backup_interval: Duration,
    ) -> Self {
        let check_interval = if check_interval.is_zero() {
            warn!("Backup check interval is zero, checking every minute instead");
            MIN_CHECK_INTERVAL
        } else {
            check_interval
        };

        Self {
            job,
            store,
            check_interval,
            backup_interval,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.check_interval);
            let mut last_backup = self.job.latest_backup_time();

            loop {
                ticker.tick().await;

                if !is_due(last_backup, SystemTime::now(), self.backup_interval) {
                    continue;
                }

                info!("Running scheduled backup");
                if self.job.backup_products(Some(&self.store)).await.is_ok() {
                    last_backup = Some(SystemTime::now());
                }
            }
        })
    }
}
