//! Resting place for [EventType] and its magic-group descriptor.

use common::{Error, Result};
use regex::Regex;
use std::num::NonZeroUsize;

/// A named slot of a timestamp regex, identified by the magic-group convention
/// `_X` or `_Xn` where `X` is one of `Y`, `M`, `D`, `h`, `m`, `s` and `n` is a
/// digit suffix used to allow alternation across formats in a single regex.
///
/// At regex-registration time we translate the string-level convention into
/// this structured descriptor once, so the hot matching path never has to
/// re-inspect capture names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimestampDescriptor {
    pub year_groups: Vec<String>,
    pub month_groups: Vec<String>,
    pub day_groups: Vec<String>,
    pub hour_groups: Vec<String>,
    pub minute_groups: Vec<String>,
    pub second_groups: Vec<String>,
    /// Named groups on the timestamp regex that aren't magic -- become user fields.
    pub user_field_groups: Vec<String>,
}

impl TimestampDescriptor {
    /// Inspects the capture names of a compiled timestamp regex and sorts them
    /// into magic slots vs. plain user-field groups.
    pub fn from_regex(regex: &Regex) -> Self {
        let mut descriptor = TimestampDescriptor::default();
        for name in regex.capture_names().flatten() {
            match magic_slot(name) {
                Some('Y') => descriptor.year_groups.push(name.to_owned()),
                Some('M') => descriptor.month_groups.push(name.to_owned()),
                Some('D') => descriptor.day_groups.push(name.to_owned()),
                Some('h') => descriptor.hour_groups.push(name.to_owned()),
                Some('m') => descriptor.minute_groups.push(name.to_owned()),
                Some('s') => descriptor.second_groups.push(name.to_owned()),
                _ => descriptor.user_field_groups.push(name.to_owned()),
            }
        }
        descriptor
    }

    /// How many distinct magic slots (Y/M/D/h/m/s) have at least one bound group.
    pub fn distinct_slots_bound(&self, bound: &[&str]) -> usize {
        [
            &self.year_groups,
            &self.month_groups,
            &self.day_groups,
            &self.hour_groups,
            &self.minute_groups,
            &self.second_groups,
        ]
        .iter()
        .filter(|groups| groups.iter().any(|g| bound.contains(&g.as_str())))
        .count()
    }
}

/// Returns `Some(letter)` if `name` follows the magic-group convention `_X` or `_Xn`.
fn magic_slot(name: &str) -> Option<char> {
    let rest = name.strip_prefix('_')?;
    let mut chars = rest.chars();
    let letter = chars.next()?;
    if !matches!(letter, 'Y' | 'M' | 'D' | 'h' | 'm' | 's') {
        return None;
    }
    match chars.next() {
        None => Some(letter),
        Some(d) if d.is_ascii_digit() && chars.next().is_none() => Some(letter),
        _ => None,
    }
}

/// The regex-and-hook bundle that defines how to extract an event.
///
/// `exec_on_*` are kept as opaque text blobs here (so registry XML round-trips
/// byte-for-byte); `bll::hooks` is the collaborator that parses and runs them.
#[derive(Debug, Clone)]
pub struct EventType {
    pub name: String,
    pub description: String,

    pub filename_pattern: String,
    pub text_pattern: String,
    pub timestamp_pattern: String,
    pub case_sensitive: bool,

    pub multiline_count: NonZeroUsize,
    pub display_on_match: Option<String>,
    pub display_if_changed: bool,

    pub exec_on_init: Option<String>,
    pub exec_on_match: Option<String>,
    pub exec_on_wrapup: Option<String>,

    filename_regex: Regex,
    text_regex: Regex,
    timestamp_regex: Regex,
    timestamp_descriptor: TimestampDescriptor,
}

/// Raw construction parameters for an [EventType], as they appear in registry XML.
#[derive(Debug, Clone, Default)]
pub struct EventTypeSpec {
    pub name: String,
    pub description: String,
    pub filename_pattern: String,
    pub text_pattern: String,
    pub timestamp_pattern: String,
    pub case_sensitive: bool,
    pub multiline_count: usize,
    pub display_on_match: Option<String>,
    pub display_if_changed: bool,
    pub exec_on_init: Option<String>,
    pub exec_on_match: Option<String>,
    pub exec_on_wrapup: Option<String>,
}

impl EventType {
    /// Compiles the three regexes and validates the invariants: `name` non-empty,
    /// all regexes compile, `multiline_count >= 1`.
    pub fn new(spec: EventTypeSpec) -> Result<Self> {
        if spec.name.trim().is_empty() {
            return Err(Error::Configuration {
                location: "EventType.name".into(),
                message: "name must not be empty".into(),
            });
        }
        let multiline_count = NonZeroUsize::new(spec.multiline_count).ok_or_else(|| Error::Configuration {
            location: format!("EventType '{}'.multiline_count", spec.name),
            message: "multiline_count must be >= 1".into(),
        })?;

        let filename_regex = compile(&spec.name, "filename_regex", &format!("(?i){}", spec.filename_pattern))?;

        let text_flags = if spec.case_sensitive { "(?sm)" } else { "(?sim)" };
        let text_regex = compile(&spec.name, "text_regex", &format!("{text_flags}{}", spec.text_pattern))?;

        let timestamp_regex = compile(&spec.name, "timestamp_regex", &spec.timestamp_pattern)?;
        let timestamp_descriptor = TimestampDescriptor::from_regex(&timestamp_regex);

        Ok(EventType {
            name: spec.name,
            description: spec.description,
            filename_pattern: spec.filename_pattern,
            text_pattern: spec.text_pattern,
            timestamp_pattern: spec.timestamp_pattern,
            case_sensitive: spec.case_sensitive,
            multiline_count,
            display_on_match: spec.display_on_match,
            display_if_changed: spec.display_if_changed,
            exec_on_init: spec.exec_on_init,
            exec_on_match: spec.exec_on_match,
            exec_on_wrapup: spec.exec_on_wrapup,
            filename_regex,
            text_regex,
            timestamp_regex,
            timestamp_descriptor,
        })
    }

    pub fn match_filename(&self, basename: &str) -> bool {
        self.filename_regex.is_match(basename)
    }

    pub fn search_text<'h>(&self, buffer: &'h str) -> Option<regex::Captures<'h>> {
        self.text_regex.captures(buffer)
    }

    /// Named capture groups on the text regex, in declaration order.
    pub fn search_text_capture_names(&self) -> Vec<String> {
        self.text_regex.capture_names().flatten().map(str::to_owned).collect()
    }

    pub fn search_timestamp<'h>(&self, buffer: &'h str) -> Option<regex::Captures<'h>> {
        self.timestamp_regex.captures(buffer)
    }

    pub fn timestamp_descriptor(&self) -> &TimestampDescriptor {
        &self.timestamp_descriptor
    }
}

fn compile(type_name: &str, which: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|err| Error::Configuration {
        location: format!("EventType '{type_name}'.{which}"),
        message: err.to_string(),
    })
}

/// An ordered collection of [EventType]s, unique by name.
#[derive(Debug, Clone, Default)]
pub struct EventTypeRegistry {
    types: Vec<EventType>,
}

impl EventTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `event_type`, rejecting duplicate names.
    pub fn push(&mut self, event_type: EventType) -> Result<()> {
        if self.types.iter().any(|t| t.name == event_type.name) {
            return Err(Error::Configuration {
                location: "EventTypeRegistry".into(),
                message: format!("duplicate EventType name '{}'", event_type.name),
            });
        }
        self.types.push(event_type);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&EventType> {
        self.types.iter().find(|t| t.name == name)
    }
}
