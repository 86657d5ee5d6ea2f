//! Traits the business-logic layer (`bll`) implements: cross-event lookup for
//! display-string interpolation and deferred hooks, plus the
//! matcher/extractor configuration surface.

mod config;
pub use config::*;

use chrono::NaiveDateTime;
use common::Result;
use model::Event;
use std::path::Path;

/// A `before` bound passed to [EventLookup::get_events].
#[derive(Debug, Clone, Copy)]
pub enum Before {
    Timestamp(NaiveDateTime),
    Event { timestamp: NaiveDateTime, sequence_number: u64 },
}

/// Cross-type lookup used by display-string interpolation (`{field@ev}` tokens)
/// and by hook execution.
pub trait EventLookup {
    /// Iterates either the global sequence (`name = None`) or one type's list
    /// (`name = Some(...)`), most-recent-first, applying the given filters.
    fn get_events(&self, name: Option<&str>, fields: &[(String, String)], before: Option<Before>, limit: usize) -> Vec<&Event>;

    /// First event of type `name` (forward order) whose field `rfield` equals `value`.
    fn find_forward(&self, name: &str, rfield: &str, value: &str) -> Option<&Event>;
}

/// Runs a declarative hook rule against an event being finalized.
pub trait HookExecutor {
    fn run(&self, rule_source: &str, event: &mut Event, store: &dyn EventLookup, output_dir: &Path, chronological: bool) -> Result<()>;
}
