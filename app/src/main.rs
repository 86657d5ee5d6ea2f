//! Thin demonstration binary wiring the engine's layers together behind a CLI:
//! `overview`, `search`, `extract`, `show-event-types`,
//! `save-event-type`. `help`/`version` are handled by `structopt` itself.
//!
//! Exit codes: 0 on success, 1 on invalid arguments or input-file validation failure.

mod command_line;

use bll::{DeclarativeHooks, EventStore, Matcher};
use bll_api::{ExtractConfig, MatcherConfig};
use command_line::{Command, ExtractArgs, ScanArgs, SearchArgs};
use common::Result;
use dal::ScannedFile;
use model::EventTypeRegistry;
use std::io::BufRead;
use std::process::ExitCode;

fn load_registry(path: &std::path::Path) -> Result<EventTypeRegistry> {
    let xml = std::fs::read_to_string(path)?;
    presentation::read_registry(&xml)
}

fn dal_config(scan: &ScanArgs) -> dal_api::Config {
    let mut config = dal_api::Config::default();
    config.roots = scan.roots.clone();
    if let Some(pattern) = &scan.path_filter {
        config.path_filter_pattern = pattern.clone();
    }
    config
}

fn matcher_config(scan: &ScanArgs) -> MatcherConfig {
    MatcherConfig {
        log_issues: scan.verbose,
        stop_on_feed_errors: scan.pedantic,
        chronological: scan.chronological,
        ..MatcherConfig::default()
    }
}

/// Scans every root and runs each matched file through the [Matcher], collecting
/// every finalized event into one [EventStore]. `output_dir` is handed to
/// `exec_on_*` hooks as the `{_output_dir}` pseudo-token; callers with no
/// output directory of their own (e.g. `overview`) may pass any placeholder.
fn run_matching(registry: &EventTypeRegistry, scan: &ScanArgs, output_dir: &std::path::Path) -> Result<(EventStore, u64)> {
    let output = dal::scan(&dal_config(scan))?;
    let mut store = EventStore::new();
    let mut lines_processed = 0u64;

    for ScannedFile { file, content } in &output.files {
        let mut matcher = Matcher::new(registry, &matcher_config(scan), file);
        let reader = dal_api::open_reader(content)?;
        for line in reader.lines() {
            let line = line?;
            matcher.feed_line(&line, |event| {
                store.add(event);
            });
        }
        matcher.finish(|event| {
            store.add(event);
        });
        lines_processed += matcher.stats().lines_processed;
    }

    if scan.chronological {
        store.finalize_chronological();
    }
    store.compute_changed_fields();
    store.finalize_hooks_and_display(registry, &DeclarativeHooks, output_dir, scan.chronological)?;

    Ok((store, lines_processed))
}

fn run_overview(args: ScanArgs) -> Result<()> {
    let registry = load_registry(&args.event_types)?;
    let (store, lines_processed) = run_matching(&registry, &args, std::path::Path::new("."))?;
    println!("{lines_processed} lines processed, {} events found", store.len());
    for name in store.type_names() {
        println!("  {name}: {}", store.events_of(name).len());
    }
    Ok(())
}

fn run_search(args: SearchArgs) -> Result<()> {
    let registry = load_registry(&args.scan.event_types)?;
    let (store, _) = run_matching(&registry, &args.scan, &args.output_dir)?;

    for name in store.type_names() {
        for event in store.events_of(name) {
            println!("{}", event.system.display_on_match);
        }
    }

    let presentation_config = presentation::Config { output_dir: args.output_dir, log_issues: args.scan.verbose, stop_on_errors: args.scan.pedantic };
    let by_type: Vec<(&str, &[model::Event])> = store.type_names().map(|name| (name, store.events_of(name))).collect();
    presentation::export_all(by_type.into_iter(), &presentation_config)
}

fn run_extract(args: ExtractArgs) -> Result<()> {
    let registry = load_registry(&args.scan.event_types)?;
    let output = dal::scan(&dal_config(&args.scan))?;

    let applicable: Vec<(&model::LogSourceFile, &dal_api::FileContent)> = output
        .files
        .iter()
        .filter(|ScannedFile { file, .. }| registry.iter().any(|event_type| event_type.match_filename(file.basename())))
        .map(|ScannedFile { file, content }| (file, content))
        .collect();

    let extract_config = ExtractConfig {
        output_dir: args.output_dir,
        keep_source_dirs: args.keep_source_dirs,
        join_log4j: args.join_log4j,
        reduce_dirs: args.reduce_dirs,
        source_tag: args.source_tag,
    };

    let ops = bll::plan_extraction(&applicable, &extract_config)?;
    println!("copying {} file(s)", ops.len());
    bll::execute_extraction(&ops)
}

fn run_show_event_types(event_types: std::path::PathBuf) -> Result<()> {
    let registry = load_registry(&event_types)?;
    for event_type in registry.iter() {
        println!("{} -- {}", event_type.name, event_type.description);
        println!("  filename:  {}", event_type.filename_pattern);
        println!("  text:      {}", event_type.text_pattern);
        println!("  timestamp: {}", event_type.timestamp_pattern);
    }
    Ok(())
}

fn run_save_event_type(args: command_line::SaveEventTypeArgs) -> Result<()> {
    let mut registry = if args.event_types.exists() { load_registry(&args.event_types)? } else { EventTypeRegistry::new() };

    let spec = model::EventTypeSpec {
        name: args.name,
        description: args.description,
        filename_pattern: args.filename_pattern,
        text_pattern: args.text_pattern,
        timestamp_pattern: args.timestamp_pattern,
        case_sensitive: args.case_sensitive,
        multiline_count: args.multiline_count,
        display_on_match: args.display_on_match,
        display_if_changed: false,
        exec_on_init: None,
        exec_on_match: None,
        exec_on_wrapup: None,
    };
    registry.push(model::EventType::new(spec)?)?;

    let xml = presentation::write_registry(&registry)?;
    std::fs::write(&args.event_types, xml)?;
    Ok(())
}

fn run() -> Result<()> {
    let options = command_line::parse_from_args();
    match options.command {
        Command::Overview(args) => run_overview(args),
        Command::Search(args) => run_search(args),
        Command::Extract(args) => run_extract(args),
        Command::ShowEventTypes { event_types } => run_show_event_types(event_types),
        Command::SaveEventType(args) => run_save_event_type(args),
    }
}

fn main() -> ExitCode {
    simple_logger::SimpleLogger::new().with_utc_timestamps().init().unwrap_or_else(|_| eprintln!("--> LOGGER WAS ALREADY STARTED"));

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}
