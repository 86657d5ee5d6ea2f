//! The recursive path scanner: walks directories and descends into
//! nested archives, applying a single path-filter regex and producing a flat,
//! pseudo-path-addressed list of candidate log files.

use crate::archive::open_archive;
use chrono::{DateTime, Utc};
use common::{Error, Result};
use dal_api::{Archive, Config, FileContent};
use model::{LogSource, LogSourceFile};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// A candidate log file plus the means to read its bytes.
pub struct ScannedFile {
    pub file: LogSourceFile,
    pub content: FileContent,
}

pub struct ScanOutput {
    pub sources: Vec<LogSource>,
    pub files: Vec<ScannedFile>,
}

/// Scans every configured root, reporting (and skipping) roots that cannot be opened
/// rather than aborting the whole run.
pub fn scan(config: &Config) -> Result<ScanOutput> {
    let path_filter = Regex::new(&format!("(?i)^(?:{})$", config.path_filter_pattern)).map_err(|err| Error::Configuration {
        location: "dal_api::Config.path_filter_pattern".into(),
        message: err.to_string(),
    })?;

    let mut sources = Vec::new();
    let mut files = Vec::new();
    for root in &config.roots {
        let identity = root.display().to_string();
        let mut source = LogSource::new(identity.clone());
        match scan_root(root, &identity, &path_filter, &config.archive_extensions, &mut source, &mut files) {
            Ok(()) => sources.push(source),
            Err(err) => log::warn!("skipping unreadable root '{}': {err}", root.display()),
        }
    }
    Ok(ScanOutput { sources, files })
}

fn has_archive_extension(name: &str, extensions: &[String]) -> bool {
    let lower = name.to_lowercase();
    extensions.iter().any(|ext| lower.ends_with(&ext.to_lowercase()))
}

fn normalize(path: &Path) -> String {
    path.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/")
}

fn path_fields(filter: &Regex, pseudo_path: &str) -> Option<BTreeMap<String, String>> {
    let captures = filter.captures(pseudo_path)?;
    let mut fields = BTreeMap::new();
    for name in filter.capture_names().flatten() {
        if let Some(m) = captures.name(name) {
            fields.insert(name.to_owned(), m.as_str().to_owned());
        }
    }
    Some(fields)
}

fn scan_root(
    root: &Path,
    identity: &str,
    filter: &Regex,
    archive_extensions: &[String],
    source: &mut LogSource,
    files: &mut Vec<ScannedFile>,
) -> Result<()> {
    let metadata = root.metadata().map_err(|err| Error::InputAccess { path: root.display().to_string(), message: err.to_string() })?;

    if metadata.is_dir() {
        for entry in walkdir::WalkDir::new(root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("skipping unreadable entry under '{}': {err}", root.display());
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let pseudo_path = normalize(path);
            let basename = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            if let Some(fields) = path_fields(filter, &pseudo_path) {
                add_plain_file(identity, path, &pseudo_path, fields, source, files)?;
            } else if has_archive_extension(&basename, archive_extensions) {
                match std::fs::read(path) {
                    Ok(bytes) => recurse_into_archive(bytes, identity, &pseudo_path, filter, archive_extensions, source, files)?,
                    Err(err) => log::warn!("skipping unreadable archive '{}': {err}", path.display()),
                }
            }
        }
        return Ok(());
    }

    // bare file roots: either an archive by extension, or a single log file if the filter matches.
    let basename = root.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let pseudo_path = normalize(root);
    if has_archive_extension(&basename, archive_extensions) {
        let bytes = std::fs::read(root)?;
        recurse_into_archive(bytes, identity, &pseudo_path, filter, archive_extensions, source, files)?;
    } else if let Some(fields) = path_fields(filter, &pseudo_path) {
        add_plain_file(identity, root, &pseudo_path, fields, source, files)?;
    }
    Ok(())
}

fn add_plain_file(
    source_identity: &str,
    path: &Path,
    pseudo_path: &str,
    path_fields: BTreeMap<String, String>,
    source: &mut LogSource,
    files: &mut Vec<ScannedFile>,
) -> Result<()> {
    let metadata = path.metadata().map_err(|err| Error::InputAccess { path: path.display().to_string(), message: err.to_string() })?;
    let mtime: DateTime<Utc> = metadata.modified().map_err(|err| Error::InputAccess { path: path.display().to_string(), message: err.to_string() })?.into();
    source.observe_mtime(mtime);
    files.push(ScannedFile {
        file: LogSourceFile {
            source_identity: source_identity.to_owned(),
            path: path.display().to_string(),
            pseudo_path: pseudo_path.to_owned(),
            mtime,
            size: metadata.len(),
            path_fields,
            destination_base_path: None,
            destination_relative_path: None,
            offset: 0,
        },
        content: FileContent::Path(path.to_owned()),
    });
    Ok(())
}

fn recurse_into_archive(
    bytes: Vec<u8>,
    source_identity: &str,
    pseudo_prefix: &str,
    filter: &Regex,
    archive_extensions: &[String],
    source: &mut LogSource,
    files: &mut Vec<ScannedFile>,
) -> Result<()> {
    let Some(mut archive) = open_archive(bytes)? else {
        log::warn!("'{pseudo_prefix}' has an archive extension but is not a recognized tar or zip archive");
        return Ok(());
    };

    let mut seen = HashSet::new();
    let member_names = archive.members()?;
    for member in member_names {
        if !seen.insert(member.clone()) {
            continue; // some tar implementations duplicate entries
        }
        let member_pseudo = format!("{pseudo_prefix}/{member}");
        let basename = member.rsplit('/').next().unwrap_or(&member).to_owned();

        if let Some(fields) = path_fields(filter, &member_pseudo) {
            add_archive_member(&mut *archive, source_identity, &member, &member_pseudo, fields, source, files)?;
        } else if has_archive_extension(&basename, archive_extensions) {
            match archive.open(&member) {
                Ok(nested_bytes) => recurse_into_archive(nested_bytes, source_identity, &member_pseudo, filter, archive_extensions, source, files)?,
                Err(err) => log::warn!("skipping unreadable nested archive '{member_pseudo}': {err}"),
            }
        }
    }
    Ok(())
}

fn add_archive_member(
    archive: &mut dyn Archive,
    source_identity: &str,
    member: &str,
    member_pseudo: &str,
    path_fields: BTreeMap<String, String>,
    source: &mut LogSource,
    files: &mut Vec<ScannedFile>,
) -> Result<()> {
    let bytes = archive.open(member)?;
    let mtime = archive.mtime(member)?;
    let size = archive.size(member)?;
    source.observe_mtime(mtime);
    files.push(ScannedFile {
        file: LogSourceFile {
            source_identity: source_identity.to_owned(),
            path: member.to_owned(),
            pseudo_path: member_pseudo.to_owned(),
            mtime,
            size,
            path_fields,
            destination_base_path: None,
            destination_relative_path: None,
            offset: 0,
        },
        content: FileContent::Bytes(bytes),
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn scans_plain_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("foo")).unwrap();
        let mut f = File::create(dir.path().join("foo/a.log")).unwrap();
        writeln!(f, "hello").unwrap();
        drop(f);
        File::create(dir.path().join("ignored.txt")).unwrap();

        let config = Config {
            roots: vec![dir.path().to_owned()],
            path_filter_pattern: r".*/(?P<sub>[^/]+)/.*\.log".into(),
            archive_extensions: vec![".zip".into(), ".tar".into(), ".tar.gz".into(), ".tgz".into()],
        };
        let output = scan(&config).unwrap();
        assert_eq!(output.files.len(), 1);
        assert_eq!(output.files[0].file.path_fields.get("sub").unwrap(), "foo");
    }

    #[test]
    fn scans_nested_zip() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("logs.zip");
        {
            let mut buf = Vec::new();
            {
                let mut writer = zip::ZipWriter::new(Cursor::new(&mut buf));
                writer.start_file("inner/app.log", zip::write::FileOptions::<()>::default()).unwrap();
                writer.write_all(b"hi\n").unwrap();
                writer.finish().unwrap();
            }
            std::fs::write(&zip_path, buf).unwrap();
        }
        let config = Config {
            roots: vec![zip_path],
            path_filter_pattern: r".*\.log".into(),
            ..Config::default()
        };
        let output = scan(&config).unwrap();
        assert_eq!(output.files.len(), 1);
        assert!(output.files[0].file.pseudo_path.ends_with("logs.zip/inner/app.log"));
    }

    #[test]
    fn skips_unreadable_root_without_aborting() {
        let config = Config {
            roots: vec![PathBuf::from("/nonexistent/path/for/test")],
            ..Config::default()
        };
        let output = scan(&config).unwrap();
        assert!(output.files.is_empty());
        assert!(output.sources.is_empty());
    }
}
