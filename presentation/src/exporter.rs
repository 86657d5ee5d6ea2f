//! Ties the per-format writers together into the one export pass: for each
//! event type with a non-empty list, write `<name>.xml`, `<name>.full.xml`,
//! and `<name>.csv` into [Config::output_dir].

use crate::config::Config;
use crate::{csv_export, events_xml};
use common::Result;
use model::Event;
use std::fs;

/// Writes the three export artifacts for every event type present in `events_by_type`.
/// Per [Config::log_issues]/[Config::stop_on_errors], a write failure for one type
/// either aborts the whole export or is logged and skipped.
pub fn export_all<'a>(events_by_type: impl Iterator<Item = (&'a str, &'a [Event])>, config: &Config) -> Result<()> {
    fs::create_dir_all(&config.output_dir)?;

    for (name, events) in events_by_type {
        if events.is_empty() {
            continue;
        }
        if let Err(err) = export_one(name, events, config) {
            if config.log_issues {
                log::warn!("failed to export event type '{name}': {err}");
            }
            if config.stop_on_errors {
                return Err(err);
            }
        }
    }
    Ok(())
}

fn export_one(name: &str, events: &[Event], config: &Config) -> Result<()> {
    let compact = events_xml::write_compact(events)?;
    fs::write(config.output_dir.join(format!("{name}.xml")), compact)?;

    let full = events_xml::write_full(events)?;
    fs::write(config.output_dir.join(format!("{name}.full.xml")), full)?;

    let csv = csv_export::write_csv(events)?;
    fs::write(config.output_dir.join(format!("{name}.csv")), csv)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use model::SystemFields;
    use std::collections::BTreeMap;

    fn sample() -> Event {
        Event {
            system: SystemFields {
                raw: "raw".into(),
                line_number: 1,
                sequence_number: 0,
                source_path: "app.log".into(),
                source_filename: "app.log".into(),
                name: "Greeting".into(),
                description: String::new(),
                timestamp: NaiveDateTime::parse_from_str("2024-01-02 03:04:05", "%Y-%m-%d %H:%M:%S").unwrap(),
                display_on_match: "hi".into(),
                changed_fields: String::new(),
            },
            user_fields: BTreeMap::new(),
            timestamp_span: (0, 0),
        }
    }

    #[test]
    fn writes_three_files_per_nonempty_type() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config { output_dir: dir.path().to_owned(), ..Config::default() };
        let events = vec![sample()];
        export_all(std::iter::once(("Greeting", events.as_slice())), &config).unwrap();
        assert!(dir.path().join("Greeting.xml").exists());
        assert!(dir.path().join("Greeting.full.xml").exists());
        assert!(dir.path().join("Greeting.csv").exists());
    }

    #[test]
    fn skips_empty_event_type_lists() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config { output_dir: dir.path().to_owned(), ..Config::default() };
        export_all(std::iter::once(("Empty", [].as_slice())), &config).unwrap();
        assert!(!dir.path().join("Empty.xml").exists());
    }
}
