//! The streaming matcher -- the hard part: per log file, consumes
//! lines, maintains a bounded line window, and drives the per-EventType pending
//! state machine. Ordering between types sharing the same incoming line is the
//! registry's registration order.

use crate::timestamp::parse_timestamp;
use bll_api::MatcherConfig;
use chrono::{Datelike, NaiveDateTime};
use indexmap::IndexMap;
use model::{Event, EventTypeRegistry, LogSourceFile, SystemFields};
use std::collections::{BTreeMap, VecDeque};
use std::time::Instant;

struct PendingEvent {
    event: Event,
    event_lines_count: usize,
    first_line_number: u64,
    timestamp_known: bool,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MatcherStats {
    pub lines_processed: u64,
    pub events_emitted: u64,
}

/// Drives the pending-event state machine for a single log file.
pub struct Matcher<'r> {
    registry: &'r EventTypeRegistry,
    config: &'r MatcherConfig,
    source_path: String,
    source_filename: String,
    source_mtime_year: i32,
    applicable: Vec<bool>,
    window: VecDeque<String>,
    line_number: u64,
    unfinished: IndexMap<String, PendingEvent>,
    stats: MatcherStats,
    last_report: Instant,
}

impl<'r> Matcher<'r> {
    pub fn new(registry: &'r EventTypeRegistry, config: &'r MatcherConfig, source_file: &LogSourceFile) -> Self {
        let basename = source_file.basename().to_owned();
        let applicable = registry.iter().map(|event_type| event_type.match_filename(&basename)).collect();
        Self {
            registry,
            config,
            source_path: source_file.pseudo_path.clone(),
            source_filename: basename,
            source_mtime_year: source_file.mtime.year(),
            applicable,
            window: VecDeque::new(),
            line_number: 0,
            unfinished: IndexMap::new(),
            stats: MatcherStats::default(),
            last_report: Instant::now(),
        }
    }

    pub fn stats(&self) -> MatcherStats {
        self.stats
    }

    /// Feeds one line of input (without its line terminator), emitting any events
    /// that this line closes via `sink`.
    pub fn feed_line(&mut self, line: &str, mut sink: impl FnMut(Event)) {
        self.close_pending(Some(line), &mut sink);

        self.window.push_front(line.to_owned());
        if self.window.len() > self.config.window_size {
            self.window.pop_back();
        }
        self.line_number += 1;
        self.stats.lines_processed += 1;

        for (index, event_type) in self.registry.iter().enumerate() {
            if !self.applicable[index] || self.unfinished.contains_key(&event_type.name) {
                continue;
            }

            let count = event_type.multiline_count.get().min(self.window.len());
            let multiline = window_join(&self.window, count);
            let Some(text_captures) = event_type.search_text(&multiline) else { continue };

            let match_end = text_captures.get(0).expect("whole match always present").end();
            if multiline.len() - match_end >= line.len() {
                continue; // matched before reaching the current line; already fired
            }

            let mut user_fields = BTreeMap::new();
            for name in event_type.search_text_capture_names() {
                if let Some(m) = text_captures.name(&name) {
                    user_fields.insert(name, m.as_str().to_owned());
                }
            }

            let mut event_lines_count = 1usize;
            let mut timestamp_known = false;
            let mut naive = NaiveDateTime::MIN;
            let mut timestamp_span = (0usize, 0usize);
            for (distance, window_line) in self.window.iter().enumerate() {
                if let Some(ts_captures) = event_type.search_timestamp(window_line) {
                    if let Some(parsed) = parse_timestamp(event_type.timestamp_descriptor(), &ts_captures, self.source_mtime_year) {
                        naive = parsed.naive;
                        user_fields.extend(parsed.user_fields);
                        event_lines_count = distance + 1;
                        timestamp_known = true;
                        // `window_join` below always lands the matched line first in `raw`,
                        // so the span is the whole-match offsets within that line, unshifted.
                        let whole = ts_captures.get(0).expect("whole match always present");
                        timestamp_span = (whole.start(), whole.end());
                    }
                    break;
                }
            }

            let first_line_number = self.line_number - event_lines_count as u64 + 1;
            let event = Event {
                system: SystemFields {
                    raw: String::new(),
                    line_number: first_line_number,
                    sequence_number: 0,
                    source_path: self.source_path.clone(),
                    source_filename: self.source_filename.clone(),
                    name: event_type.name.clone(),
                    description: event_type.description.clone(),
                    timestamp: naive,
                    display_on_match: event_type.display_on_match.clone().unwrap_or_default(),
                    changed_fields: String::new(),
                },
                user_fields,
                timestamp_span,
            };

            if timestamp_known || !self.config.defer_incomplete_events {
                let raw = window_join(&self.window, event_lines_count);
                let mut event = event;
                event.system.raw = raw;
                self.stats.events_emitted += 1;
                sink(event);
            } else {
                self.unfinished.insert(
                    event_type.name.clone(),
                    PendingEvent { event, event_lines_count, first_line_number, timestamp_known },
                );
            }
        }

        self.maybe_report();
    }

    /// Closes every still-pending event at EOF.
    pub fn finish(&mut self, mut sink: impl FnMut(Event)) {
        self.close_pending(None, &mut sink);
    }

    fn close_pending(&mut self, line: Option<&str>, sink: &mut impl FnMut(Event)) {
        let names: Vec<String> = self.unfinished.keys().cloned().collect();
        for name in names {
            let Some(event_type) = self.registry.get(&name) else { continue };
            let closing_captures = line.and_then(|l| event_type.search_timestamp(l));
            let should_close = line.is_none() || closing_captures.is_some();

            if !should_close {
                if let Some(pending) = self.unfinished.get_mut(&name) {
                    pending.event_lines_count += 1;
                }
                continue;
            }

            let mut pending = self.unfinished.shift_remove(&name).expect("key came from this map");
            if !pending.timestamp_known {
                if let Some(captures) = closing_captures {
                    if let Some(parsed) = parse_timestamp(event_type.timestamp_descriptor(), &captures, self.source_mtime_year) {
                        pending.event.system.timestamp = parsed.naive;
                        pending.event.user_fields.extend(parsed.user_fields);
                        // timestamp_span stays (0, 0): the closing line that carried this
                        // timestamp is never folded into the pending event's own `raw`.
                    }
                }
            }
            pending.event.system.raw = window_join(&self.window, pending.event_lines_count);
            pending.event.system.line_number = pending.first_line_number;
            self.stats.events_emitted += 1;
            sink(pending.event);
        }
    }

    fn maybe_report(&mut self) {
        if self.stats.lines_processed % 10_000 != 0 {
            return;
        }
        let elapsed = self.last_report.elapsed();
        if elapsed.as_secs() >= 30 {
            log::info!(
                "'{}': {} lines processed, {} events found ({:.1} lines/s)",
                self.source_path,
                self.stats.lines_processed,
                self.stats.events_emitted,
                self.stats.lines_processed as f64 / elapsed.as_secs_f64().max(1.0)
            );
            self.last_report = Instant::now();
        }
    }
}

/// Joins the most recent `count` window lines (front = most recent) in source order.
fn window_join(window: &VecDeque<String>, count: usize) -> String {
    let count = count.min(window.len());
    window.iter().take(count).rev().cloned().collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bll_api::MatcherConfig;
    use chrono::{TimeZone, Utc};
    use model::{EventType, EventTypeRegistry, EventTypeSpec, LogSourceFile};
    use std::collections::BTreeMap;

    fn source_file() -> LogSourceFile {
        LogSourceFile {
            source_identity: "root".into(),
            path: "app.log".into(),
            pseudo_path: "app.log".into(),
            mtime: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            size: 0,
            path_fields: BTreeMap::new(),
            destination_base_path: None,
            destination_relative_path: None,
            offset: 0,
        }
    }

    fn registry(specs: Vec<EventTypeSpec>) -> EventTypeRegistry {
        let mut registry = EventTypeRegistry::new();
        for spec in specs {
            registry.push(EventType::new(spec).unwrap()).unwrap();
        }
        registry
    }

    fn base_spec(name: &str, text_pattern: &str) -> EventTypeSpec {
        EventTypeSpec {
            name: name.into(),
            description: "".into(),
            filename_pattern: r".*".into(),
            text_pattern: text_pattern.into(),
            timestamp_pattern: r"(?P<_Y>\d{4})-(?P<_M>\d{2})-(?P<_D>\d{2}) (?P<_h>\d{2}):(?P<_m>\d{2}):(?P<_s>\d{2})".into(),
            case_sensitive: false,
            multiline_count: 1,
            display_on_match: None,
            display_if_changed: false,
            exec_on_init: None,
            exec_on_match: None,
            exec_on_wrapup: None,
        }
    }

    #[test]
    fn single_line_self_contained_event_finalizes_immediately() {
        let registry = registry(vec![base_spec("Greeting", r"hello (?P<w>\w+)")]);
        let config = MatcherConfig::default();
        let mut matcher = Matcher::new(&registry, &config, &source_file());
        let mut emitted = Vec::new();
        matcher.feed_line("hello 2024-01-02 03:04:05 world", |e| emitted.push(e));
        matcher.finish(|e| emitted.push(e));
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].field("w").unwrap(), "world");
        assert_eq!(emitted[0].field("_timestamp").unwrap(), "2024-01-02T03:04:05");
    }

    #[test]
    fn defers_until_closing_timestamp_line() {
        let mut registry_obj = EventTypeRegistry::new();
        registry_obj.push(EventType::new(base_spec("Err", r"^ERR (?P<v>\w)$")).unwrap()).unwrap();
        registry_obj.push(EventType::new(base_spec("Flush", r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2} flush$")).unwrap()).unwrap();
        let config = MatcherConfig::default();
        let mut matcher = Matcher::new(&registry_obj, &config, &source_file());
        let mut emitted = Vec::new();
        matcher.feed_line("ERR x", |e| emitted.push(e));
        matcher.feed_line("ERR y", |e| emitted.push(e));
        matcher.feed_line("2024-01-02 00:00:00 flush", |e| emitted.push(e));
        matcher.finish(|e| emitted.push(e));

        let errs: Vec<_> = emitted.iter().filter(|e| e.system.name == "Err").collect();
        assert_eq!(errs.len(), 2);
        assert_eq!(errs[0].field("v").unwrap(), "x");
        assert_eq!(errs[1].field("v").unwrap(), "y");
        assert_eq!(errs[0].field("_timestamp").unwrap(), "2024-01-02T00:00:00");
        assert_eq!(errs[1].field("_timestamp").unwrap(), "2024-01-02T00:00:00");
    }

    #[test]
    fn two_types_matching_same_line_track_independently() {
        let mut registry_obj = EventTypeRegistry::new();
        registry_obj.push(EventType::new(base_spec("A", r"event (?P<x>\w+)")).unwrap()).unwrap();
        registry_obj.push(EventType::new(base_spec("B", r"(?P<y>event \w+)")).unwrap()).unwrap();
        let config = MatcherConfig::default();
        let mut matcher = Matcher::new(&registry_obj, &config, &source_file());
        let mut emitted = Vec::new();
        matcher.feed_line("2024-01-02 03:04:05 event thing", |e| emitted.push(e));
        matcher.finish(|e| emitted.push(e));
        assert_eq!(emitted.len(), 2);
    }

    #[test]
    fn no_defer_finalizes_with_default_timestamp() {
        let registry = registry(vec![base_spec("Err", r"^ERR (?P<v>\w)$")]);
        let mut config = MatcherConfig::default();
        config.defer_incomplete_events = false;
        let mut matcher = Matcher::new(&registry, &config, &source_file());
        let mut emitted = Vec::new();
        matcher.feed_line("ERR x", |e| emitted.push(e));
        matcher.finish(|e| emitted.push(e));
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].system.timestamp, NaiveDateTime::MIN);
    }
}
