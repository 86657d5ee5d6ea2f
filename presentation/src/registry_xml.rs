//! Event-type registry XML: `<Regulog>` containing zero or more
//! `<EventType>` elements. Regex- and code-bearing elements are written as CDATA;
//! reading accepts either CDATA or plain text for any element.

use common::{Error, Result};
use model::{EventType, EventTypeRegistry, EventTypeSpec};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event as XmlEvent};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::collections::HashMap;
use std::io::Cursor;

fn xml_err(message: impl std::fmt::Display) -> Error {
    Error::Configuration { location: "EventType XML".into(), message: message.to_string() }
}

fn write_text_element(writer: &mut Writer<Cursor<Vec<u8>>>, name: &str, text: &str) -> Result<()> {
    writer.write_event(XmlEvent::Start(BytesStart::new(name))).map_err(xml_err)?;
    writer.write_event(XmlEvent::Text(BytesText::new(text))).map_err(xml_err)?;
    writer.write_event(XmlEvent::End(BytesEnd::new(name))).map_err(xml_err)?;
    Ok(())
}

fn write_cdata_element(writer: &mut Writer<Cursor<Vec<u8>>>, name: &str, text: &str) -> Result<()> {
    writer.write_event(XmlEvent::Start(BytesStart::new(name))).map_err(xml_err)?;
    writer.write_event(XmlEvent::CData(BytesCData::new(text))).map_err(xml_err)?;
    writer.write_event(XmlEvent::End(BytesEnd::new(name))).map_err(xml_err)?;
    Ok(())
}

/// Serializes `registry` to the `<Regulog>` XML form, CDATA-wrapping every
/// regex- or code-bearing element.
pub fn write_registry(registry: &EventTypeRegistry) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(XmlEvent::Decl(BytesDecl::new("1.0", Some("UTF-8"), None))).map_err(xml_err)?;
    writer.write_event(XmlEvent::Start(BytesStart::new("Regulog"))).map_err(xml_err)?;

    for event_type in registry.iter() {
        writer.write_event(XmlEvent::Start(BytesStart::new("EventType"))).map_err(xml_err)?;
        write_text_element(&mut writer, "Name", &event_type.name)?;
        if !event_type.description.is_empty() {
            write_text_element(&mut writer, "Description", &event_type.description)?;
        }
        write_cdata_element(&mut writer, "RexFilename", &event_type.filename_pattern)?;
        write_cdata_element(&mut writer, "RexText", &event_type.text_pattern)?;
        write_cdata_element(&mut writer, "RexTimestamp", &event_type.timestamp_pattern)?;
        write_text_element(&mut writer, "MultilineCount", &event_type.multiline_count.to_string())?;
        write_text_element(&mut writer, "CaseSensitive", bool_str(event_type.case_sensitive))?;
        if let Some(display) = &event_type.display_on_match {
            write_cdata_element(&mut writer, "DisplayOnMatch", display)?;
        }
        write_text_element(&mut writer, "DisplayIfChanged", bool_str(event_type.display_if_changed))?;
        if let Some(code) = &event_type.exec_on_init {
            write_cdata_element(&mut writer, "ExecOnInit", code)?;
        }
        if let Some(code) = &event_type.exec_on_match {
            write_cdata_element(&mut writer, "ExecOnMatch", code)?;
        }
        if let Some(code) = &event_type.exec_on_wrapup {
            write_cdata_element(&mut writer, "ExecOnWrapup", code)?;
        }
        writer.write_event(XmlEvent::End(BytesEnd::new("EventType"))).map_err(xml_err)?;
    }

    writer.write_event(XmlEvent::End(BytesEnd::new("Regulog"))).map_err(xml_err)?;
    String::from_utf8(writer.into_inner().into_inner()).map_err(xml_err)
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Parses a `<Regulog>` document into a registry, compiling every `EventType`.
pub fn read_registry(xml: &str) -> Result<EventTypeRegistry> {
    let mut reader = Reader::from_str(xml);
    let mut registry = EventTypeRegistry::new();
    let mut buf = Vec::new();
    let mut current_element: Option<String> = None;
    let mut fields: HashMap<String, String> = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err)? {
            XmlEvent::Start(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                if name == "EventType" {
                    fields.clear();
                }
                current_element = Some(name);
            }
            XmlEvent::Text(text) => {
                if let Some(name) = &current_element {
                    let value = text.unescape().map_err(xml_err)?.trim().to_owned();
                    if !value.is_empty() {
                        fields.insert(name.clone(), value);
                    }
                }
            }
            XmlEvent::CData(text) => {
                if let Some(name) = &current_element {
                    let value = String::from_utf8_lossy(text.as_ref()).trim().to_owned();
                    fields.insert(name.clone(), value);
                }
            }
            XmlEvent::End(end) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                if name == "EventType" {
                    registry.push(EventType::new(spec_from_fields(&fields)?)?)?;
                }
                current_element = None;
            }
            XmlEvent::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(registry)
}

fn spec_from_fields(fields: &HashMap<String, String>) -> Result<EventTypeSpec> {
    let required = |key: &str| fields.get(key).cloned().ok_or_else(|| xml_err(format!("missing required element <{key}>")));
    Ok(EventTypeSpec {
        name: required("Name")?,
        description: fields.get("Description").cloned().unwrap_or_default(),
        filename_pattern: required("RexFilename")?,
        text_pattern: required("RexText")?,
        timestamp_pattern: required("RexTimestamp")?,
        case_sensitive: fields.get("CaseSensitive").is_some_and(|v| v == "true"),
        multiline_count: fields.get("MultilineCount").and_then(|v| v.parse().ok()).unwrap_or(1),
        display_on_match: fields.get("DisplayOnMatch").cloned(),
        display_if_changed: fields.get("DisplayIfChanged").is_some_and(|v| v == "true"),
        exec_on_init: fields.get("ExecOnInit").cloned(),
        exec_on_match: fields.get("ExecOnMatch").cloned(),
        exec_on_wrapup: fields.get("ExecOnWrapup").cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_registry() -> EventTypeRegistry {
        let mut registry = EventTypeRegistry::new();
        registry
            .push(
                EventType::new(EventTypeSpec {
                    name: "Flush".into(),
                    description: "a flush event".into(),
                    filename_pattern: r".*\.log".into(),
                    text_pattern: r"flush (?P<w>\w+)".into(),
                    timestamp_pattern: r"(?P<_Y>\d{4})-(?P<_M>\d{2})-(?P<_D>\d{2}) (?P<_h>\d{2}):(?P<_m>\d{2}):(?P<_s>\d{2})".into(),
                    case_sensitive: false,
                    multiline_count: 1,
                    display_on_match: Some("flushed {w}".into()),
                    display_if_changed: false,
                    exec_on_init: None,
                    exec_on_match: None,
                    exec_on_wrapup: None,
                })
                .unwrap(),
            )
            .unwrap();
        registry
    }

    #[test]
    fn round_trips_a_registry() {
        let registry = sample_registry();
        let xml = write_registry(&registry).unwrap();
        assert!(xml.contains("<![CDATA[flush (?P<w>\\w+)]]>"));
        let read_back = read_registry(&xml).unwrap();
        assert_eq!(read_back.len(), 1);
        let event_type = read_back.get("Flush").unwrap();
        assert_eq!(event_type.text_pattern, r"flush (?P<w>\w+)");
        assert_eq!(event_type.display_on_match.as_deref(), Some("flushed {w}"));
    }

    #[test]
    fn reads_plain_text_elements_too() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<Regulog>
  <EventType>
    <Name>Plain</Name>
    <RexFilename>.*\.log</RexFilename>
    <RexText>hello (?P<w>\w+)</RexText>
    <RexTimestamp>(?P<_Y>\d{4})-(?P<_M>\d{2})-(?P<_D>\d{2}) (?P<_h>\d{2}):(?P<_m>\d{2}):(?P<_s>\d{2})</RexTimestamp>
  </EventType>
</Regulog>"#;
        let registry = read_registry(xml).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("Plain").unwrap().multiline_count.get(), 1);
    }

    #[test]
    fn rejects_missing_required_element() {
        let xml = "<Regulog><EventType><Name>Incomplete</Name></EventType></Regulog>";
        assert!(read_registry(xml).is_err());
    }
}
