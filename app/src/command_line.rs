//! Configs that are gathered from the command line --
//! see [CommandLineOptions]. Only the option *contract* is part of the core
//! boundary; this module is the collaborator that actually parses `argv`.

use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "regulog", about = "
================================================================
Extracts structured events out of heterogeneous log sources using
user-defined regular-expression event types.
================================================================
")]
pub struct CommandLineOptions {
    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Scans the given roots and prints a per-event-type count summary
    Overview(ScanArgs),

    /// Scans, matches, and writes the extracted events to XML/CSV in `--output-dir`
    Search(SearchArgs),

    /// Copies (and optionally joins/reduces) matched files into `--output-dir`
    Extract(ExtractArgs),

    /// Prints the event types registered in `--event-types`
    ShowEventTypes {
        #[structopt(long, parse(from_os_str))]
        event_types: PathBuf,
    },

    /// Appends one event type to `--event-types`, creating the file if needed
    SaveEventType(SaveEventTypeArgs),
}

#[derive(Debug, StructOpt)]
pub struct ScanArgs {
    /// Registry XML describing the event types to recognize
    #[structopt(long, parse(from_os_str))]
    pub event_types: PathBuf,

    /// Directories, bare files, or archives to scan
    #[structopt(long, parse(from_os_str), required = true)]
    pub roots: Vec<PathBuf>,

    /// Full-match, case-insensitive regex applied to each candidate's pseudo-path
    #[structopt(long)]
    pub path_filter: Option<String>,

    /// Sort globally by (timestamp, sequence_number) instead of match order
    #[structopt(long)]
    pub chronological: bool,

    /// Logs non-fatal scan/match errors instead of silently skipping them
    #[structopt(long)]
    pub verbose: bool,

    /// Considers scan/match errors fatal instead of skipping the offending source
    #[structopt(long)]
    pub pedantic: bool,
}

#[derive(Debug, StructOpt)]
pub struct SearchArgs {
    #[structopt(flatten)]
    pub scan: ScanArgs,

    /// Where to write `<name>.xml`/`.full.xml`/`.csv`
    #[structopt(long, parse(from_os_str))]
    pub output_dir: PathBuf,
}

#[derive(Debug, StructOpt)]
pub struct ExtractArgs {
    #[structopt(flatten)]
    pub scan: ScanArgs,

    /// Where extracted files land
    #[structopt(long, parse(from_os_str))]
    pub output_dir: PathBuf,

    /// Segregates each source under its own numbered subdirectory
    #[structopt(long)]
    pub keep_source_dirs: bool,

    /// Joins log4j-style rotated files (`X`, `X.1`, `X.2`, ...) into one contiguous file
    #[structopt(long)]
    pub join_log4j: bool,

    /// Strips common leading directory components from destination paths
    #[structopt(long)]
    pub reduce_dirs: bool,

    /// Literal segment inserted right after `--output-dir`, shared by every source
    #[structopt(long)]
    pub source_tag: Option<String>,
}

#[derive(Debug, StructOpt)]
pub struct SaveEventTypeArgs {
    #[structopt(long, parse(from_os_str))]
    pub event_types: PathBuf,

    #[structopt(long)]
    pub name: String,

    #[structopt(long, default_value = "")]
    pub description: String,

    #[structopt(long)]
    pub filename_pattern: String,

    #[structopt(long)]
    pub text_pattern: String,

    #[structopt(long)]
    pub timestamp_pattern: String,

    #[structopt(long)]
    pub case_sensitive: bool,

    #[structopt(long, default_value = "1")]
    pub multiline_count: usize,

    #[structopt(long)]
    pub display_on_match: Option<String>,
}

pub fn parse_from_args() -> CommandLineOptions {
    CommandLineOptions::from_args()
}
