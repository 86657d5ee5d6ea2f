//! Event output XML: `<RegulogEvents>` root, compact form
//! (`<name>.xml`) with plain-text element values, full form (`<name>.full.xml`)
//! with every field CDATA-wrapped and alphabetically ordered.

use common::{Error, Result};
use model::{Event, RESERVED_FIELD_NAMES};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event as XmlEvent};
use quick_xml::writer::Writer;
use std::io::Cursor;

fn xml_err(message: impl std::fmt::Display) -> Error {
    Error::Other(format!("event XML error: {message}"))
}

fn write_element(writer: &mut Writer<Cursor<Vec<u8>>>, name: &str, text: &str, cdata: bool) -> Result<()> {
    writer.write_event(XmlEvent::Start(BytesStart::new(name))).map_err(xml_err)?;
    if cdata {
        writer.write_event(XmlEvent::CData(BytesCData::new(text))).map_err(xml_err)?;
    } else {
        writer.write_event(XmlEvent::Text(BytesText::new(text))).map_err(xml_err)?;
    }
    writer.write_event(XmlEvent::End(BytesEnd::new(name))).map_err(xml_err)?;
    Ok(())
}

/// `<name>.xml`: `_timestamp`, `_line_number`, `_source_path`, `_flat`, then user
/// fields in declaration (map) order, none CDATA-wrapped.
pub fn write_compact(events: &[Event]) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(XmlEvent::Decl(BytesDecl::new("1.0", Some("UTF-8"), None))).map_err(xml_err)?;
    writer.write_event(XmlEvent::Start(BytesStart::new("RegulogEvents"))).map_err(xml_err)?;

    for event in events {
        writer.write_event(XmlEvent::Start(BytesStart::new("Event"))).map_err(xml_err)?;
        write_element(&mut writer, "_timestamp", &event.system.timestamp_iso8601(), false)?;
        write_element(&mut writer, "_line_number", &event.system.line_number.to_string(), false)?;
        write_element(&mut writer, "_source_path", &event.system.source_path, false)?;
        write_element(&mut writer, "_flat", &event.system.flat(), false)?;
        for (name, value) in &event.user_fields {
            write_element(&mut writer, name, value, false)?;
        }
        writer.write_event(XmlEvent::End(BytesEnd::new("Event"))).map_err(xml_err)?;
    }

    writer.write_event(XmlEvent::End(BytesEnd::new("RegulogEvents"))).map_err(xml_err)?;
    String::from_utf8(writer.into_inner().into_inner()).map_err(xml_err)
}

/// `<name>.full.xml`: every system and user field, CDATA-wrapped, alphabetically
/// ordered by field name.
pub fn write_full(events: &[Event]) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(XmlEvent::Decl(BytesDecl::new("1.0", Some("UTF-8"), None))).map_err(xml_err)?;
    writer.write_event(XmlEvent::Start(BytesStart::new("RegulogEvents"))).map_err(xml_err)?;

    for event in events {
        writer.write_event(XmlEvent::Start(BytesStart::new("Event"))).map_err(xml_err)?;
        for name in all_field_names(event) {
            let value = event.field(&name).unwrap_or_default();
            write_element(&mut writer, &name, &value, true)?;
        }
        writer.write_event(XmlEvent::End(BytesEnd::new("Event"))).map_err(xml_err)?;
    }

    writer.write_event(XmlEvent::End(BytesEnd::new("RegulogEvents"))).map_err(xml_err)?;
    String::from_utf8(writer.into_inner().into_inner()).map_err(xml_err)
}

fn all_field_names(event: &Event) -> Vec<String> {
    let mut names: Vec<String> = RESERVED_FIELD_NAMES.iter().map(|s| s.to_string()).collect();
    names.extend(event.user_fields.keys().cloned());
    names.sort();
    names
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
                raw: "hello world".into(),
                line_number: 7,
                sequence_number: 0,
                source_path: "app.log".into(),
                source_filename: "app.log".into(),
                name: "Greeting".into(),
                description: String::new(),
                timestamp: NaiveDateTime::parse_from_str("2024-01-02 03:04:05", "%Y-%m-%d %H:%M:%S").unwrap(),
                display_on_match: "hi w".into(),
                changed_fields: "w".into(),
            },
            user_fields: BTreeMap::from([("w".to_owned(), "world".to_owned())]),
            timestamp_span: (0, 0),
        }
    }

    #[test]
    fn compact_form_has_no_cdata() {
        let xml = write_compact(&[sample()]).unwrap();
        assert!(xml.contains("<_timestamp>2024-01-02T03:04:05</_timestamp>"));
        assert!(xml.contains("<w>world</w>"));
        assert!(!xml.contains("CDATA"));
    }

    #[test]
    fn full_form_cdata_wraps_every_field_alphabetically() {
        let xml = write_full(&[sample()]).unwrap();
        assert!(xml.contains("<![CDATA[world]]>"));
        let changed_fields_pos = xml.find("_changed_fields").unwrap();
        let w_pos = xml.find("<w>").unwrap();
        assert!(changed_fields_pos < w_pos);
    }
}
