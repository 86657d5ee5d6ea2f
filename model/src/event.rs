//! Resting place for [Event] and its reserved [SystemFields].

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

/// Reserved fields every [Event] carries, regardless of which [crate::EventType] produced it.
///
/// `timestamp` defaults to [NaiveDateTime::MIN] when no timestamp could be parsed,
/// per the data model's stated default.
#[derive(Debug, Clone)]
pub struct SystemFields {
    pub raw: String,
    pub line_number: u64,
    pub sequence_number: u64,
    pub source_path: String,
    pub source_filename: String,
    pub name: String,
    pub description: String,
    pub timestamp: NaiveDateTime,
    pub display_on_match: String,
    pub changed_fields: String,
}

impl SystemFields {
    /// `_flat`: `_raw` with every newline replaced by a space.
    pub fn flat(&self) -> String {
        self.raw.replace('\n', " ")
    }

    /// `_date`: the `YYYY-MM-DD` substring of the ISO-8601 timestamp.
    pub fn date(&self) -> String {
        self.timestamp.format("%Y-%m-%d").to_string()
    }

    /// `_time`: the `HH:MM:SS` substring of the ISO-8601 timestamp.
    pub fn time(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }

    /// `_timestamp`: full ISO-8601 rendering.
    pub fn timestamp_iso8601(&self) -> String {
        self.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

/// A single extracted log occurrence, identified by `(event_type_name, sequence_number)`.
#[derive(Debug, Clone)]
pub struct Event {
    pub system: SystemFields,
    pub user_fields: BTreeMap<String, String>,
    /// Byte offsets of the matched timestamp substring within `system.raw`; `(0, 0)` if absent.
    pub timestamp_span: (usize, usize),
}

/// System field names that may never be used as user-field keys.
pub const RESERVED_FIELD_NAMES: &[&str] = &[
    "_raw",
    "_flat",
    "_core",
    "_flat_core",
    "_timestamp",
    "_date",
    "_time",
    "_line_number",
    "_sequence_number",
    "_source_path",
    "_source_filename",
    "_name",
    "_description",
    "_display_on_match",
    "_changed_fields",
];

impl Event {
    /// `_core`: `_raw` with the matched timestamp span removed.
    pub fn core(&self) -> String {
        let (start, end) = self.timestamp_span;
        if start == 0 && end == 0 {
            return self.system.raw.clone();
        }
        let mut core = String::with_capacity(self.system.raw.len().saturating_sub(end - start));
        core.push_str(&self.system.raw[..start]);
        core.push_str(&self.system.raw[end..]);
        core
    }

    /// `_flat_core`: [Event::core] with every newline replaced by a space.
    pub fn flat_core(&self) -> String {
        self.core().replace('\n', " ")
    }

    /// Resolves a field by name, checking system fields first (by their `_`-prefixed
    /// name) and then user fields. Returns `None` if unknown.
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "_raw" => Some(self.system.raw.clone()),
            "_flat" => Some(self.system.flat()),
            "_core" => Some(self.core()),
            "_flat_core" => Some(self.flat_core()),
            "_timestamp" => Some(self.system.timestamp_iso8601()),
            "_date" => Some(self.system.date()),
            "_time" => Some(self.system.time()),
            "_line_number" => Some(self.system.line_number.to_string()),
            "_sequence_number" => Some(self.system.sequence_number.to_string()),
            "_source_path" => Some(self.system.source_path.clone()),
            "_source_filename" => Some(self.system.source_filename.clone()),
            "_name" => Some(self.system.name.clone()),
            "_description" => Some(self.system.description.clone()),
            "_display_on_match" => Some(self.system.display_on_match.clone()),
            "_changed_fields" => Some(self.system.changed_fields.clone()),
            _ => self.user_fields.get(name).cloned(),
        }
    }

    /// Sets a user field, refusing to shadow a reserved system field name.
    pub fn set_field(&mut self, name: &str, value: String) -> Result<(), String> {
        if RESERVED_FIELD_NAMES.contains(&name) {
            return Err(format!("'{name}' is a reserved system field and cannot be set from user code"));
        }
        self.user_fields.insert(name.to_owned(), value);
        Ok(())
    }

    /// Sets a user field only if it is not already present.
    pub fn add_field(&mut self, name: &str, value: String) -> Result<(), String> {
        if RESERVED_FIELD_NAMES.contains(&name) {
            return Err(format!("'{name}' is a reserved system field and cannot be set from user code"));
        }
        self.user_fields.entry(name.to_owned()).or_insert(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> Event {
        Event {
            system: SystemFields {
                raw: "hello 2024-01-02 03:04:05 world".into(),
                line_number: 1,
                sequence_number: 0,
                source_path: "app.log".into(),
                source_filename: "app.log".into(),
                name: "Greeting".into(),
                description: "".into(),
                timestamp: NaiveDateTime::parse_from_str("2024-01-02 03:04:05", "%Y-%m-%d %H:%M:%S").unwrap(),
                display_on_match: String::new(),
                changed_fields: String::new(),
            },
            user_fields: BTreeMap::from([("w".to_owned(), "world".to_owned())]),
            timestamp_span: (6, 25),
        }
    }

    #[test]
    fn core_strips_timestamp_span() {
        let event = sample_event();
        assert_eq!(event.core(), "hello  world");
    }

    #[test]
    fn flat_replaces_newlines() {
        let mut event = sample_event();
        event.system.raw = "line1\nline2".into();
        event.timestamp_span = (0, 0);
        assert_eq!(event.system.flat(), "line1 line2");
    }

    #[test]
    fn set_field_rejects_system_names() {
        let mut event = sample_event();
        assert!(event.set_field("_raw", "x".into()).is_err());
        assert!(event.set_field("custom", "x".into()).is_ok());
    }

    #[test]
    fn timestamp_fields_are_consistent() {
        let event = sample_event();
        assert_eq!(event.system.timestamp_iso8601(), "2024-01-02T03:04:05");
        assert_eq!(event.system.date(), "2024-01-02");
        assert_eq!(event.system.time(), "03:04:05");
    }
}
