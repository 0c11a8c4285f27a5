//! Persisted once-per-day gate.
//!
//! One small JSON file records the last successful run: reference-zone date,
//! success flag, and a hash of the headline set that went out. It is read
//! once at run start and rewritten atomically after a confirmed send.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::ingest::types::NewsItem;

/// Civil calendar the daily gate is anchored to. A run just before and just
/// after midnight UTC must land on the same Hungarian date.
pub const REFERENCE_TZ: chrono_tz::Tz = chrono_tz::Europe::Budapest;

/// Today's date in the reference zone.
pub fn local_date_now() -> NaiveDate {
    Utc::now().with_timezone(&REFERENCE_TZ).date_naive()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunState {
    pub date: NaiveDate,
    pub success: bool,
    pub news_hash: String,
}

#[derive(Debug, Clone)]
pub struct RunStateStore {
    path: PathBuf,
}

impl RunStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Missing or unreadable state reads as "never run".
    pub fn load(&self) -> Option<RunState> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "could not read run state");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(
                    error = %e,
                    path = %self.path.display(),
                    "run state file is corrupt, treating as never run"
                );
                None
            }
        }
    }

    pub fn already_sent(&self, today: NaiveDate) -> bool {
        self.load()
            .map(|state| state.success && state.date == today)
            .unwrap_or(false)
    }

    /// Records a successful send. Write goes to a temp file first and is
    /// renamed into place, so readers never see a half-written state.
    pub fn commit(&self, today: NaiveDate, news: &[NewsItem]) -> io::Result<()> {
        let state = RunState {
            date: today,
            success: true,
            news_hash: hash_news(news),
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&state)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// SHA-256 over the normalized headline set, newline-joined.
pub fn hash_news(news: &[NewsItem]) -> String {
    let mut hasher = Sha256::new();
    for item in news {
        hasher.update(item.title.as_bytes());
        hasher.update(b"\n");
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            summary: String::new(),
            url: None,
            published_at: None,
            source: "Test".to_string(),
        }
    }

    #[test]
    fn missing_file_reads_as_never_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStateStore::new(dir.path().join("last_run.json"));
        assert!(store.load().is_none());
        assert!(!store.already_sent(local_date_now()));
    }

    #[test]
    fn corrupt_file_reads_as_never_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_run.json");
        fs::write(&path, "{not json").unwrap();
        let store = RunStateStore::new(path);
        assert!(store.load().is_none());
    }

    #[test]
    fn commit_then_gate_on_same_day_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStateStore::new(dir.path().join("state/last_run.json"));
        let today = NaiveDate::from_ymd_opt(2026, 8, 21).unwrap();

        store.commit(today, &[item("Gold steady")]).unwrap();

        assert!(store.already_sent(today));
        assert!(!store.already_sent(today.succ_opt().unwrap()));

        let state = store.load().unwrap();
        assert!(state.success);
        assert_eq!(state.news_hash, hash_news(&[item("Gold steady")]));
    }

    #[test]
    fn hash_depends_on_titles_and_order() {
        let a = hash_news(&[item("one"), item("two")]);
        let b = hash_news(&[item("two"), item("one")]);
        let c = hash_news(&[item("one"), item("two")]);
        assert_ne!(a, b);
        assert_eq!(a, c);
    }
}
