//! Traits the scanning layer (`dal`) implements: a unified capability set over
//! tar and zip archives, plus the scan configuration surface.

mod config;
pub use config::*;

mod content;
pub use content::*;

use chrono::{DateTime, Utc};
use common::Result;

/// The single place the core touches third-party archive codecs.
///
/// Implementations buffer each member's bytes on `open()` rather than exposing a
/// seekable handle, since `tar` only supports sequential reads -- acceptable at
/// the log-file sizes this engine targets, and it lets nested archives (an
/// archive member that is itself an archive) be opened recursively from the
/// buffered bytes.
pub trait Archive {
    /// Member names in the order the underlying format reports them.
    fn members(&mut self) -> Result<Vec<String>>;
    fn open(&mut self, member: &str) -> Result<Vec<u8>>;
    fn mtime(&mut self, member: &str) -> Result<DateTime<Utc>>;
    fn size(&mut self, member: &str) -> Result<u64>;
}
