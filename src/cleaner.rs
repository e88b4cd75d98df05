//! Retention sweep over the artifact directory.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::artifact::{timestamp_from_file_name, ARTIFACT_EXTENSION};
use crate::TARGET_STORAGE;

/// Outcome of one cleanup sweep.
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub scanned: usize,
    /// Files deleted, or that would have been deleted on a dry run.
    pub deleted: Vec<PathBuf>,
    pub kept: usize,
    pub failed: usize,
}

pub struct Cleaner {
    dir: PathBuf,
    retention: ChronoDuration,
    dry_run: bool,
}

impl Cleaner {
    pub fn new(dir: impl Into<PathBuf>, retention: ChronoDuration) -> Self {
        Self {
            dir: dir.into(),
            retention,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Deletes every JSON artifact in the directory older than the retention
    /// window, measured against `now`.
    ///
    /// A file's age comes from its artifact file name when it has one, and
    /// from its modification time otherwise. A file exactly at the retention
    /// age is kept. Failing to delete a single file is logged and counted;
    /// failing to read the directory is an error.
    pub fn clean(&self, now: DateTime<Utc>) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(target: TARGET_STORAGE, "Output directory {} does not exist, nothing to clean", self.dir.display());
                return Ok(report);
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read directory {}", self.dir.display()))
            }
        };

        // A window reaching past the representable date range covers every file
        let cutoff = now.checked_sub_signed(self.retention);
        match cutoff {
            Some(cutoff) => debug!(target: TARGET_STORAGE, "Removing artifacts in {} older than {}", self.dir.display(), cutoff),
            None => debug!(target: TARGET_STORAGE, "Retention of {} days keeps everything in {}", self.retention.num_days(), self.dir.display()),
        }

        for entry in entries {
            let entry = entry
                .with_context(|| format!("Failed to read directory {}", self.dir.display()))?;
            let path = entry.path();

            match entry.file_type() {
                Ok(file_type) if file_type.is_file() => {}
                Ok(_) => continue,
                Err(err) => {
                    warn!(target: TARGET_STORAGE, "Skipping {}: {}", path.display(), err);
                    continue;
                }
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(ARTIFACT_EXTENSION) {
                continue;
            }
            report.scanned += 1;

            let Some(created) = file_time(&path) else {
                warn!(target: TARGET_STORAGE, "Unable to determine age of {}, keeping it", path.display());
                report.kept += 1;
                continue;
            };

            if cutoff.map_or(true, |cutoff| created >= cutoff) {
                report.kept += 1;
                continue;
            }

            if self.dry_run {
                info!(target: TARGET_STORAGE, "Would delete: {}", path.display());
                report.deleted.push(path);
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => {
                    info!(target: TARGET_STORAGE, "Deleted: {}", path.display());
                    report.deleted.push(path);
                }
                // Already gone, e.g. a concurrent sweep
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    debug!(target: TARGET_STORAGE, "{} vanished before deletion", path.display());
                }
                Err(err) => {
                    error!(target: TARGET_STORAGE, "Error deleting {}: {}", path.display(), err);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

/// When a file was produced: the artifact timestamp, else its mtime.
fn file_time(path: &Path) -> Option<DateTime<Utc>> {
    if let Some(stamp) = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(timestamp_from_file_name)
    {
        return Some(stamp);
    }

    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

/// Deletes JSON artifacts in `dir` older than `retention` as of `now`.
pub fn clean_old_files(
    dir: &Path,
    retention: ChronoDuration,
    now: DateTime<Utc>,
) -> Result<CleanupReport> {
    Cleaner::new(dir, retention).clean(now)
}
