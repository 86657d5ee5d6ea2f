//! Resting place for [LogSourceFile] and the identity of an enclosing [LogSource].

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One physical root a scan was started from: a directory, a bare file, or an archive
/// (optionally nested inside another archive).
#[derive(Debug, Clone)]
pub struct LogSource {
    /// Human-readable identity of the enclosing root (its path or pseudo-path).
    pub identity: String,
    pub earliest_mtime: Option<DateTime<Utc>>,
    pub latest_mtime: Option<DateTime<Utc>>,
}

impl LogSource {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            earliest_mtime: None,
            latest_mtime: None,
        }
    }

    /// Folds a newly observed member mtime into the running earliest/latest bounds.
    pub fn observe_mtime(&mut self, mtime: DateTime<Utc>) {
        self.earliest_mtime = Some(self.earliest_mtime.map_or(mtime, |e| e.min(mtime)));
        self.latest_mtime = Some(self.latest_mtime.map_or(mtime, |l| l.max(mtime)));
    }
}

/// A single candidate log file found by the path scanner, addressed both by its
/// member-local `path` and by a portable, `/`-separated `pseudo_path`.
#[derive(Debug, Clone)]
pub struct LogSourceFile {
    /// Identity of the enclosing [LogSource] this file was found under.
    pub source_identity: String,
    /// Member-local path (as reported by the filesystem or archive).
    pub path: String,
    /// `/`-normalized logical path, portable across nested archives.
    pub pseudo_path: String,
    pub mtime: DateTime<Utc>,
    pub size: u64,
    /// Named-group captures from the path-filter regex.
    pub path_fields: BTreeMap<String, String>,

    /// Filled in only by the extractor (§4.6).
    pub destination_base_path: Option<PathBuf>,
    pub destination_relative_path: Option<PathBuf>,
    pub offset: u64,
}

impl LogSourceFile {
    pub fn basename(&self) -> &str {
        self.pseudo_path.rsplit('/').next().unwrap_or(&self.pseudo_path)
    }
}
