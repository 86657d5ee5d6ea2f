//! Display-string interpolation: resolves `{field}`, `{field@ev}`
//! and `{field@ev:rfield=cfield}` tokens in a `display_on_match` template against
//! the current event and the store.

use bll_api::{Before, EventLookup};
use model::Event;

/// Expands `template`'s `{…}` tokens against `event`, looking up cross-type
/// references through `store`. Unresolvable tokens become literal, human-readable
/// error strings rather than aborting.
pub fn interpolate(template: &str, event: &Event, store: &dyn EventLookup) -> String {
    let template = template.replace("\\t", "\t").replace("\\n", "\n");

    let mut output = String::with_capacity(template.len());
    let mut rest = template.as_str();
    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        match after_open.find('}') {
            Some(close) => {
                output.push_str(&resolve_token(&after_open[..close], event, store));
                rest = &after_open[close + 1..];
            }
            None => {
                output.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    output.push_str(rest);
    output
}

fn resolve_token(token: &str, event: &Event, store: &dyn EventLookup) -> String {
    if let Some((field_at_ev, rfield_eq_cfield)) = token.split_once(':') {
        let Some((field, ev_name)) = field_at_ev.split_once('@') else {
            return format!("FIELD '{token}' NOT FOUND");
        };
        let Some((rfield, cfield)) = rfield_eq_cfield.split_once('=') else {
            return format!("FIELD '{token}' NOT FOUND");
        };
        let Some(cvalue) = event.field(cfield) else {
            return format!("FIELD '{cfield}' NOT FOUND");
        };
        return match store.find_forward(ev_name, rfield, &cvalue) {
            Some(found) => found.field(field).unwrap_or_else(|| format!("FIELD '{field}' NOT FOUND")),
            None => "NO MATCHING EVENT".to_owned(),
        };
    }

    if let Some((field, ev_name)) = token.split_once('@') {
        let before = Before::Event { timestamp: event.system.timestamp, sequence_number: event.system.sequence_number };
        let candidates = store.get_events(Some(ev_name), &[], Some(before), usize::MAX);
        let chosen = candidates.iter().find(|candidate| candidate.system.source_path == event.system.source_path).or_else(|| candidates.first());
        return match chosen {
            Some(found) => found.field(field).unwrap_or_else(|| format!("FIELD '{field}' NOT FOUND")),
            None => "NO MATCHING EVENT".to_owned(),
        };
    }

    event.field(token).unwrap_or_else(|| format!("FIELD '{token}' NOT FOUND"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EventStore;
    use chrono::NaiveDateTime;
    use model::SystemFields;
    use std::collections::BTreeMap;

    fn event(name: &str, ts: &str, fields: &[(&str, &str)]) -> Event {
        Event {
            system: SystemFields {
                raw: String::new(),
                line_number: 1,
                sequence_number: 0,
                source_path: "a.log".into(),
                source_filename: "a.log".into(),
                name: name.into(),
                description: "".into(),
                timestamp: NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S").unwrap(),
                display_on_match: String::new(),
                changed_fields: String::new(),
            },
            user_fields: fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<BTreeMap<_, _>>(),
            timestamp_span: (0, 0),
        }
    }

    #[test]
    fn resolves_own_field() {
        let store = EventStore::new();
        let event = event("A", "2024-01-01 00:00:00", &[("w", "ok")]);
        assert_eq!(interpolate("hello {w}", &event, &store), "hello ok");
    }

    #[test]
    fn reports_unresolvable_field_without_aborting() {
        let store = EventStore::new();
        let event = event("A", "2024-01-01 00:00:00", &[]);
        assert_eq!(interpolate("{missing}", &event, &store), "FIELD 'missing' NOT FOUND");
    }

    #[test]
    fn cross_event_lookup_finds_latest_prior_event() {
        let mut store = EventStore::new();
        store.add(event("A", "2024-01-01 00:00:00", &[("x", "42")]));
        let b = event("B", "2024-01-01 00:00:01", &[("w", "ok")]);
        assert_eq!(interpolate("{w} seen after {x@A}", &b, &store), "ok seen after 42");
    }

    #[test]
    fn forward_lookup_matches_by_related_field() {
        let mut store = EventStore::new();
        store.add(event("A", "2024-01-01 00:00:00", &[("id", "7"), ("name", "alice")]));
        let b = event("B", "2024-01-01 00:00:01", &[("id", "7")]);
        assert_eq!(interpolate("{name@A:id=id}", &b, &store), "alice");
    }
}
