//! Resting place for BLL's [MatcherConfig], [ExtractConfig] & friends

use std::path::PathBuf;

/// Tunable behavior of the streaming matcher.
pub struct MatcherConfig {
    /// Log::warn! of any errors that happen during scanning/matching instead of
    /// silently skipping them.
    pub log_issues: bool,

    /// If true, an I/O error on one source aborts the whole run; if false (the
    /// default), the offending source is skipped and the run continues.
    pub stop_on_feed_errors: bool,

    /// Size of the sliding line window; must exceed the largest `multiline_count`
    /// among the registered EventTypes.
    pub window_size: usize,

    /// Sort globally by `(timestamp, sequence_number)` before finalization/export
    /// instead of emitting events in match order.
    pub chronological: bool,

    /// When false, an EventType whose text matched but no timestamp could be
    /// located is finalized immediately instead of waiting for a closing line.
    pub defer_incomplete_events: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            log_issues: false,
            stop_on_feed_errors: false,
            window_size: 100,
            chronological: false,
            defer_incomplete_events: true,
        }
    }
}

/// Configuration for the extract/reorder subsystem.
pub struct ExtractConfig {
    pub output_dir: PathBuf,
    pub keep_source_dirs: bool,
    pub join_log4j: bool,
    pub reduce_dirs: bool,
    /// Optional literal segment inserted right after `output_dir`, shared by every source.
    pub source_tag: Option<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            keep_source_dirs: false,
            join_log4j: false,
            reduce_dirs: false,
            source_tag: None,
        }
    }
}
