//! Persisted run state: the events watermark plus every tracked user's
//! last-known following list and cache validator.
//!
//! The document is a single JSON file, overwritten whole at the end of a
//! successful run and never merged. Everything before that point works on an
//! in-memory copy, so an aborted run leaves the file byte-for-byte unchanged.

use crate::error::{Error, Result};
use crate::follows::Followee;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// How far back the watermark starts when no snapshot exists yet.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 3;

/// The persisted document. `events_last_modified` is kept as the raw
/// HTTP-date string so it can be replayed verbatim as an `If-Modified-Since`
/// header on the next run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub events_last_modified: String,
    pub followees_etag: Option<String>,
    #[serde(default)]
    pub followees: Vec<Followee>,
}

impl Snapshot {
    /// The starting state for a first run: watermark three days back, nobody
    /// tracked yet.
    pub fn default_at(now: DateTime<Utc>) -> Self {
        Self {
            events_last_modified: format_http_date(now - Duration::days(DEFAULT_LOOKBACK_DAYS)),
            followees_etag: None,
            followees: Vec::new(),
        }
    }

    /// The watermark as an instant. Events at or before this are already
    /// reported.
    pub fn watermark(&self) -> Result<DateTime<Utc>> {
        parse_http_date(&self.events_last_modified)
    }

    /// Move the watermark to the feed's Last-Modified hint. With no hint
    /// (304, or a server that omitted the header) the previous value stands.
    pub fn advance_watermark(&mut self, hint: Option<&str>) {
        if let Some(hint) = hint {
            if !hint.trim().is_empty() {
                self.events_last_modified = hint.to_string();
            }
        }
    }
}

/// File-backed store for the snapshot document.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the snapshot, or produce the default when none has been written
    /// yet.
    pub fn load(&self) -> Result<Snapshot> {
        if !self.path.exists() {
            return Ok(Snapshot::default_at(Utc::now()));
        }
        let json = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Overwrite the stored snapshot. Pretty-printed for operator inspection;
    /// the formatting carries no meaning.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

pub fn format_http_date(instant: DateTime<Utc>) -> String {
    instant.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

pub fn parse_http_date(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Date(format!("{text:?}: {e}")))
}
