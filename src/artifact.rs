//! Run artifacts: one JSON file per collector run, named after the run's UTC
//! timestamp, e.g. `feeds_2026_10_16_140000.json`.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::rss::FeedEntry;
use crate::TARGET_STORAGE;

pub const ARTIFACT_PREFIX: &str = "feeds_";
pub const ARTIFACT_EXTENSION: &str = "json";
const TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H%M%S";
// Length of a formatted TIMESTAMP_FORMAT value
const TIMESTAMP_LEN: usize = 17;

pub fn artifact_file_name(collected_at: DateTime<Utc>) -> String {
    format!(
        "{}{}.{}",
        ARTIFACT_PREFIX,
        collected_at.format(TIMESTAMP_FORMAT),
        ARTIFACT_EXTENSION
    )
}

/// Recovers the collection time from an artifact file name.
///
/// Accepts the `_<n>` suffix used when two runs land in the same second.
/// Returns `None` for anything that is not an artifact name.
pub fn timestamp_from_file_name(file_name: &str) -> Option<DateTime<Utc>> {
    let stem = file_name
        .strip_prefix(ARTIFACT_PREFIX)?
        .strip_suffix(ARTIFACT_EXTENSION)?
        .strip_suffix('.')?;

    if stem.len() < TIMESTAMP_LEN || !stem.is_char_boundary(TIMESTAMP_LEN) {
        return None;
    }
    let (timestamp, rest) = stem.split_at(TIMESTAMP_LEN);
    if !rest.is_empty() {
        let counter = rest.strip_prefix('_')?;
        if counter.is_empty() || !counter.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }

    NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// First artifact path in `dir` for `collected_at` that does not exist yet.
fn unused_artifact_path(dir: &Path, collected_at: DateTime<Utc>) -> PathBuf {
    let candidate = dir.join(artifact_file_name(collected_at));
    if !candidate.exists() {
        return candidate;
    }

    let stamp = collected_at.format(TIMESTAMP_FORMAT);
    let mut counter = 1u32;
    loop {
        let candidate = dir.join(format!(
            "{}{}_{}.{}",
            ARTIFACT_PREFIX, stamp, counter, ARTIFACT_EXTENSION
        ));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Writes the entries of one run as a JSON array and returns the artifact path.
///
/// The document is written to a hidden temp file and renamed into place, so
/// readers of `dir` only ever see complete artifacts. Existing artifacts are
/// never overwritten.
pub fn write_artifact(
    dir: &Path,
    collected_at: DateTime<Utc>,
    entries: &[FeedEntry],
) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let path = unused_artifact_path(dir, collected_at);
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = dir.join(format!(".{}.tmp", file_name));

    debug!(target: TARGET_STORAGE, "Writing {} entries to {}", entries.len(), tmp_path.display());
    persist_json(&tmp_path, &path, entries)?;

    info!(target: TARGET_STORAGE, "Saved {} entries to {}", entries.len(), path.display());
    Ok(path)
}

/// Serializes `value` into `tmp_path`, then renames it to `path`.
///
/// The temp file is removed whenever any step fails.
fn persist_json<T: Serialize + ?Sized>(tmp_path: &Path, path: &Path, value: &T) -> Result<()> {
    let result = write_json(tmp_path, value).and_then(|()| {
        fs::rename(tmp_path, path).with_context(|| {
            format!("Failed to move {} to {}", tmp_path.display(), path.display())
        })
    });
    if result.is_err() {
        let _ = fs::remove_file(tmp_path);
    }
    result
}

fn write_json<T: Serialize + ?Sized>(tmp_path: &Path, value: &T) -> Result<()> {
    let file = File::create(tmp_path)
        .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to serialize entries to {}", tmp_path.display()))?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    writer
        .get_ref()
        .sync_all()
        .with_context(|| format!("Failed to sync {}", tmp_path.display()))
}

/// Reads an artifact back into entries.
pub fn read_artifact(path: &Path) -> Result<Vec<FeedEntry>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read artifact {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse artifact {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 14, 5, 9).unwrap()
    }

    fn entry(title: &str) -> FeedEntry {
        FeedEntry {
            title: title.to_string(),
            link: format!("https://example.com/{}", title),
            published: "2026-10-16T13:00:00Z".to_string(),
            summary: String::new(),
            source: "example.com".to_string(),
            fetched_at: "2026-10-16T14:05:09Z".to_string(),
        }
    }

    #[test]
    fn test_artifact_file_name() {
        assert_eq!(artifact_file_name(at()), "feeds_2026_10_16_140509.json");
        assert_eq!(timestamp_from_file_name("feeds_2026_10_16_140509.json"), Some(at()));
        assert_eq!(timestamp_from_file_name("feeds_2026_10_16_140509_3.json"), Some(at()));
    }

    #[test]
    fn test_non_artifact_names() {
        assert_eq!(timestamp_from_file_name("legacy.json"), None);
        assert_eq!(timestamp_from_file_name("feeds_2026_10_16.json"), None);
        assert_eq!(timestamp_from_file_name("feeds_2026_10_16_140509.json.tmp"), None);
        assert_eq!(timestamp_from_file_name("feeds_2026_10_16_140509_x.json"), None);
        assert_eq!(timestamp_from_file_name("feeds_2026_13_16_140509.json"), None);
    }

    #[test]
    fn test_write_and_read_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![entry("one"), entry("two")];

        let path = write_artifact(dir.path(), at(), &entries).unwrap();
        assert_eq!(path, dir.path().join("feeds_2026_10_16_140509.json"));
        assert_eq!(read_artifact(&path).unwrap(), entries);

        // No temp files left behind
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_same_second_runs_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_artifact(dir.path(), at(), &[entry("one")]).unwrap();
        let second = write_artifact(dir.path(), at(), &[entry("two")]).unwrap();

        assert_ne!(first, second);
        assert_eq!(read_artifact(&first).unwrap()[0].title, "one");
        assert_eq!(read_artifact(&second).unwrap()[0].title, "two");
        assert_eq!(
            second.file_name().unwrap().to_str().unwrap(),
            "feeds_2026_10_16_140509_1.json"
        );
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("cannot serialize"))
        }
    }

    #[test]
    fn test_failed_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let tmp_path = dir.path().join(".feeds_2026_10_16_140509.json.tmp");
        let path = dir.path().join("feeds_2026_10_16_140509.json");

        let result = persist_json(&tmp_path, &path, &Unserializable);

        assert!(result.is_err());
        assert!(!tmp_path.exists());
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let tmp_path = dir.path().join(".feeds_2026_10_16_140509.json.tmp");
        // Renaming a file over a non-empty directory fails
        let path = dir.path().join("occupied");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("inside"), "x").unwrap();

        let result = persist_json(&tmp_path, &path, &[entry("one")][..]);

        assert!(result.is_err());
        assert!(!tmp_path.exists());
    }

    #[test]
    fn test_empty_run_writes_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_artifact(dir.path(), at(), &[]).unwrap();
        assert!(read_artifact(&path).unwrap().is_empty());
    }
}
