//! Resting place for presentation-layer [Config].

use std::path::PathBuf;

/// Where exported artifacts land, and how strictly presentation-layer errors behave.
pub struct Config {
    pub output_dir: PathBuf,
    /// Log::warn! of any errors that happen while exporting instead of aborting the run.
    pub log_issues: bool,
    /// If true, an I/O error writing one artifact aborts the whole export.
    pub stop_on_errors: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { output_dir: PathBuf::from("."), log_issues: false, stop_on_errors: false }
    }
}
