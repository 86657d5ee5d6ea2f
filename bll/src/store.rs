//! The event store: holds every finalized event, indexed per type
//! and as one global sequence, and answers the cross-type lookups interpolation
//! and hooks need.

use crate::interpolation::interpolate;
use bll_api::{Before, EventLookup, HookExecutor};
use common::Result;
use indexmap::IndexMap;
use model::{Event, EventTypeRegistry};
use std::path::Path;

/// Holds every finalized [Event], indexed per type and as one dense global sequence.
#[derive(Default)]
pub struct EventStore {
    by_type: IndexMap<String, Vec<Event>>,
    /// `(type_name, index into by_type[type_name])` in emission order.
    sequence: Vec<(String, usize)>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `event`, assigning it the next dense `_sequence_number`.
    pub fn add(&mut self, mut event: Event) -> u64 {
        let sequence_number = self.sequence.len() as u64;
        event.system.sequence_number = sequence_number;
        let type_name = event.system.name.clone();
        let list = self.by_type.entry(type_name.clone()).or_default();
        list.push(event);
        self.sequence.push((type_name, list.len() - 1));
        sequence_number
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.by_type.keys().map(String::as_str)
    }

    pub fn events_of(&self, name: &str) -> &[Event] {
        self.by_type.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    fn all_in_sequence(&self) -> impl Iterator<Item = &Event> {
        self.sequence.iter().map(|(name, index)| &self.by_type[name][*index])
    }

    /// Sorts stably by `(timestamp, sequence_number)` and renumbers densely
    /// in chronological mode.
    pub fn finalize_chronological(&mut self) {
        let mut all: Vec<Event> = self.by_type.drain(..).flat_map(|(_, events)| events).collect();
        all.sort_by(|a, b| (a.system.timestamp, a.system.sequence_number).cmp(&(b.system.timestamp, b.system.sequence_number)));

        self.by_type.clear();
        self.sequence.clear();
        for (new_sequence_number, mut event) in all.into_iter().enumerate() {
            event.system.sequence_number = new_sequence_number as u64;
            let type_name = event.system.name.clone();
            let list = self.by_type.entry(type_name.clone()).or_default();
            list.push(event);
            self.sequence.push((type_name, list.len() - 1));
        }
    }

    /// `_changed_fields`: comma-joined user-field names whose value
    /// differs from the previous event of the same type, or all user fields when
    /// there is no previous event. Call once per type, in final emission order,
    /// after chronological sort (if any) has settled.
    pub fn compute_changed_fields(&mut self) {
        let names: Vec<String> = self.by_type.keys().cloned().collect();
        for name in names {
            let events = self.by_type.get_mut(&name).expect("name came from this map");
            let mut previous: Option<std::collections::BTreeMap<String, String>> = None;
            for event in events.iter_mut() {
                let changed: Vec<&str> = match &previous {
                    None => event.user_fields.keys().map(String::as_str).collect(),
                    Some(prev) => event
                        .user_fields
                        .iter()
                        .filter(|(k, v)| prev.get(*k) != Some(*v))
                        .map(|(k, _)| k.as_str())
                        .collect(),
                };
                event.system.changed_fields = changed.join(",");
                previous = Some(event.user_fields.clone());
            }
        }
    }

    /// Runs each event's owning type's `exec_on_match` then `exec_on_wrapup` hook
    /// (if present) and resolves its `_display_on_match` template, in per-type
    /// emission order. Hooks and interpolation both get cross-event lookup into
    /// this same store, so each event is worked on as a detached copy and written
    /// back afterward rather than mutated in place. Call after
    /// [EventStore::compute_changed_fields].
    pub fn finalize_hooks_and_display(
        &mut self,
        registry: &EventTypeRegistry,
        hooks: &dyn HookExecutor,
        output_dir: &Path,
        chronological: bool,
    ) -> Result<()> {
        let type_names: Vec<String> = self.type_names().map(str::to_owned).collect();
        for type_name in &type_names {
            let Some(event_type) = registry.get(type_name) else { continue };
            let count = self.events_of(type_name).len();
            for index in 0..count {
                let mut event = self.by_type[type_name][index].clone();

                if let Some(rule) = &event_type.exec_on_match {
                    hooks.run(rule, &mut event, &*self, output_dir, chronological)?;
                }
                if let Some(rule) = &event_type.exec_on_wrapup {
                    hooks.run(rule, &mut event, &*self, output_dir, chronological)?;
                }
                if let Some(template) = &event_type.display_on_match {
                    event.system.display_on_match = interpolate(template, &event, &*self);
                }

                self.by_type.get_mut(type_name).expect("name came from this map")[index] = event;
            }
        }
        Ok(())
    }
}

impl EventLookup for EventStore {
    fn get_events(&self, name: Option<&str>, fields: &[(String, String)], before: Option<Before>, limit: usize) -> Vec<&Event> {
        let matches_fields = |event: &&Event| fields.iter().all(|(k, v)| event.field(k).as_deref() == Some(v.as_str()));
        let matches_before = |event: &&Event| match before {
            None => true,
            Some(Before::Timestamp(bound)) => event.system.timestamp <= bound,
            Some(Before::Event { timestamp, sequence_number }) => {
                event.system.timestamp < timestamp || (event.system.timestamp == timestamp && event.system.sequence_number <= sequence_number)
            }
        };

        match name {
            Some(name) => self.events_of(name).iter().rev().filter(matches_fields).filter(matches_before).take(limit).collect(),
            None => self.all_in_sequence().rev().filter(matches_fields).filter(matches_before).take(limit).collect(),
        }
    }

    fn find_forward(&self, name: &str, rfield: &str, value: &str) -> Option<&Event> {
        self.events_of(name).iter().find(|event| event.field(rfield).as_deref() == Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn add_assigns_dense_sequence_numbers() {
        let mut store = EventStore::new();
        let a = store.add(event("A", "2024-01-01 00:00:00", &[]));
        let b = store.add(event("B", "2024-01-01 00:00:01", &[]));
        assert_eq!((a, b), (0, 1));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn get_events_filters_by_name_and_fields() {
        let mut store = EventStore::new();
        store.add(event("A", "2024-01-01 00:00:00", &[("k", "1")]));
        store.add(event("A", "2024-01-01 00:00:01", &[("k", "2")]));
        let results = store.get_events(Some("A"), &[("k".into(), "2".into())], None, 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].field("k").unwrap(), "2");
    }

    #[test]
    fn chronological_finalize_sorts_and_renumbers() {
        let mut store = EventStore::new();
        store.add(event("A", "2024-01-02 00:00:00", &[]));
        store.add(event("B", "2024-01-01 00:00:00", &[]));
        store.finalize_chronological();
        let all: Vec<_> = store.all_in_sequence().collect();
        assert_eq!(all[0].system.name, "B");
        assert_eq!(all[0].system.sequence_number, 0);
        assert_eq!(all[1].system.sequence_number, 1);
    }

    #[test]
    fn changed_fields_tracks_diffs_from_previous_of_same_type() {
        let mut store = EventStore::new();
        store.add(event("A", "2024-01-01 00:00:00", &[("k", "1"), ("j", "x")]));
        store.add(event("A", "2024-01-01 00:00:01", &[("k", "1"), ("j", "y")]));
        store.compute_changed_fields();
        let events = store.events_of("A");
        assert_eq!(events[0].system.changed_fields, "j,k");
        assert_eq!(events[1].system.changed_fields, "j");
    }

    #[test]
    fn finalize_runs_hooks_then_resolves_display_template() {
        use crate::hooks::DeclarativeHooks;
        use model::{EventType, EventTypeRegistry, EventTypeSpec};

        let mut registry = EventTypeRegistry::new();
        registry
            .push(
                EventType::new(EventTypeSpec {
                    name: "A".into(),
                    description: "".into(),
                    filename_pattern: r".*".into(),
                    text_pattern: r"hello (?P<w>\w+)".into(),
                    timestamp_pattern: r"(?P<_Y>\d{4})-(?P<_M>\d{2})-(?P<_D>\d{2})".into(),
                    case_sensitive: false,
                    multiline_count: 1,
                    display_on_match: Some("{w} seen, derived={derived}".into()),
                    display_if_changed: false,
                    exec_on_init: None,
                    exec_on_match: Some("set derived = shouted-{w}".into()),
                    exec_on_wrapup: None,
                })
                .unwrap(),
            )
            .unwrap();

        let mut store = EventStore::new();
        store.add(event("A", "2024-01-01 00:00:00", &[("w", "world")]));
        store.finalize_hooks_and_display(&registry, &DeclarativeHooks, std::path::Path::new("/out"), false).unwrap();

        let stored = &store.events_of("A")[0];
        assert_eq!(stored.field("derived").unwrap(), "shouted-world");
        assert_eq!(stored.system.display_on_match, "world seen, derived=shouted-world");
    }
}
