//! CSV export: `<name>.csv`, semicolon-delimited, UTF-8, no
//! quoting; `;` and newlines in any field value are replaced with spaces.

use common::{Error, Result};
use model::Event;

fn sanitize(value: &str) -> String {
    value.replace(';', " ").replace('\n', " ").replace('\r', " ")
}

/// Builds the CSV text for one event type's events: header
/// `_timestamp;_name;_display_on_match;_changed_fields;_flat;<sorted user fields>`.
pub fn write_csv(events: &[Event]) -> Result<String> {
    let mut user_field_names = std::collections::BTreeSet::new();
    for event in events {
        user_field_names.extend(event.user_fields.keys().cloned());
    }

    let mut writer = csv::WriterBuilder::new().delimiter(b';').quote_style(csv::QuoteStyle::Never).terminator(csv::Terminator::Any(b'\n')).from_writer(Vec::new());

    let mut header = vec!["_timestamp".to_owned(), "_name".to_owned(), "_display_on_match".to_owned(), "_changed_fields".to_owned(), "_flat".to_owned()];
    header.extend(user_field_names.iter().cloned());
    writer.write_record(&header).map_err(csv_err)?;

    for event in events {
        let mut record = vec![
            sanitize(&event.system.timestamp_iso8601()),
            sanitize(&event.system.name),
            sanitize(&event.system.display_on_match),
            sanitize(&event.system.changed_fields),
            sanitize(&event.system.flat()),
        ];
        for name in &user_field_names {
            record.push(event.user_fields.get(name).map(|v| sanitize(v)).unwrap_or_default());
        }
        writer.write_record(&record).map_err(csv_err)?;
    }

    let bytes = writer.into_inner().map_err(|e| Error::Other(format!("csv flush error: {e}")))?;
    String::from_utf8(bytes).map_err(|e| Error::Other(format!("csv utf8 error: {e}")))
}

fn csv_err(err: csv::Error) -> Error {
    Error::Other(format!("csv error: {err}"))
}
