//! Resting place for the DAL's [Config] & friends

use std::path::PathBuf;

/// Configuration for the scanning layer: which roots to walk, which files to keep,
/// and what counts as an archive worth recursing into.
pub struct Config {
    /// Directories, bare files, or archives to start scanning from.
    pub roots: Vec<PathBuf>,

    /// Applied as a full-match, case-insensitive regex against the `/`-normalized
    /// pseudo-path of every candidate file.
    pub path_filter_pattern: String,

    /// Case-insensitive suffixes (each including the leading dot) that mark a file
    /// as an archive worth recursing into.
    pub archive_extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            path_filter_pattern: r".*\.log".into(),
            archive_extensions: vec![".zip".into(), ".tar".into(), ".tar.gz".into(), ".tgz".into()],
        }
    }
}
