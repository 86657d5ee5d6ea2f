//! Declarative hook rules: the faithful reimplementation of the
//! original `exec_on_*` user-code blobs, chosen as a small line-oriented grammar
//! over an embedded scripting language since the corpus shows no common
//! scripting-engine crate for this domain (see DESIGN.md).
//!
//! Grammar, one statement per line (blank lines and `#` comments ignored):
//!   set <field> = <template>
//!   add <field> = <template>
//! `<template>` is a [crate::interpolation] display string. `set` overwrites the
//! field; `add` only fills it if absent. Both refuse to touch a reserved system
//! field name.

use crate::interpolation::interpolate;
use bll_api::{EventLookup, HookExecutor};
use common::{Error, Result};
use model::Event;
use std::path::Path;

pub struct DeclarativeHooks;

impl HookExecutor for DeclarativeHooks {
    fn run(&self, rule_source: &str, event: &mut Event, store: &dyn EventLookup, output_dir: &Path, chronological: bool) -> Result<()> {
        let output_dir_display = output_dir.display().to_string();

        for (zero_based_line, raw_line) in rule_source.lines().enumerate() {
            let line_number = zero_based_line + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let hook_error = |message: String| Error::Hook {
                event_name: event.system.name.clone(),
                sequence_number: event.system.sequence_number,
                message: format!("line {line_number}: {message}"),
            };

            let (verb, rest) = line.split_once(char::is_whitespace).ok_or_else(|| hook_error("expected '<set|add> <field> = <template>'".into()))?;
            let (field, template) = rest.split_once('=').ok_or_else(|| hook_error("expected '=' separating field and template".into()))?;
            let field = field.trim();
            let template = template.trim().replace("{_output_dir}", &output_dir_display).replace("{_chronological}", &chronological.to_string());

            let value = interpolate(&template, event, store);

            let outcome = match verb {
                "set" => event.set_field(field, value),
                "add" => event.add_field(field, value),
                other => return Err(hook_error(format!("unknown verb '{other}'"))),
            };
            outcome.map_err(|message| hook_error(message))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EventStore;
    use chrono::NaiveDateTime;
    use model::SystemFields;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn sample_event() -> Event {
        Event {
            system: SystemFields {
                raw: "hello world".into(),
                line_number: 1,
                sequence_number: 0,
                source_path: "a.log".into(),
                source_filename: "a.log".into(),
                name: "Greeting".into(),
                description: "".into(),
                timestamp: NaiveDateTime::parse_from_str("2024-01-01 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap(),
                display_on_match: String::new(),
                changed_fields: String::new(),
            },
            user_fields: BTreeMap::from([("w".to_owned(), "world".to_owned())]),
            timestamp_span: (0, 0),
        }
    }

    #[test]
    fn set_overwrites_and_add_fills_only_if_absent() {
        let store = EventStore::new();
        let mut event = sample_event();
        let rules = "set greeting = hi {w}\nadd greeting = should not replace\nadd other = filled";
        DeclarativeHooks.run(rules, &mut event, &store, &PathBuf::from("/out"), false).unwrap();
        assert_eq!(event.field("greeting").unwrap(), "hi world");
        assert_eq!(event.field("other").unwrap(), "filled");
    }

    #[test]
    fn rejects_mutation_of_reserved_field() {
        let store = EventStore::new();
        let mut event = sample_event();
        let result = DeclarativeHooks.run("set _raw = nope", &mut event, &store, &PathBuf::from("/out"), false);
        assert!(result.is_err());
    }

    #[test]
    fn exposes_output_dir_and_chronological_as_pseudo_tokens() {
        let store = EventStore::new();
        let mut event = sample_event();
        DeclarativeHooks.run("set dest = {_output_dir}/{_chronological}", &mut event, &store, &PathBuf::from("/tmp/out"), true).unwrap();
        assert_eq!(event.field("dest").unwrap(), "/tmp/out/true");
    }
}
