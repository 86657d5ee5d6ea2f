//! The extract/reorder subsystem: computes a destination path per
//! scanned file, optionally joins log4j-style rotated files into one contiguous
//! output, optionally reduces destination directory nesting, then copies bytes.

use bll_api::ExtractConfig;
use chrono::{DateTime, Utc};
use common::Result;
use dal_api::FileContent;
use model::LogSourceFile;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const CHUNK_SIZE: usize = 10 * 1024 * 1024;
const RESERVED_PATH_CHARS: &[char] = &['"', '\\', '/', ':', '*', '?', '<', '>', '|'];

/// One planned byte-copy from a scanned file into the output tree.
pub struct CopyOp {
    pub content: FileContent,
    pub destination: PathBuf,
    pub offset: u64,
    pub source_mtime: DateTime<Utc>,
}

fn sanitize(raw: &str) -> String {
    raw.chars().map(|c| if RESERVED_PATH_CHARS.contains(&c) { '_' } else { c }).collect()
}

/// Named-group-derived subpath: path-filter captures, alphabetical by group name, sanitized.
fn subpath_for(file: &LogSourceFile) -> PathBuf {
    let mut path = PathBuf::new();
    for (_, value) in file.path_fields.iter() {
        path.push(sanitize(value));
    }
    path
}

fn is_bare_file_root(file: &LogSourceFile) -> bool {
    file.path == file.source_identity
}

/// `destination_relative_path`: the archive-member-local
/// path when the file came from inside an archive, else just the basename.
fn relative_path_for(file: &LogSourceFile) -> PathBuf {
    if is_bare_file_root(file) || Path::new(&file.path).is_absolute() {
        PathBuf::from(file.basename())
    } else {
        PathBuf::from(&file.path)
    }
}

fn numbered_source_dir(base: &Path, source_identity: &str) -> PathBuf {
    let name = Path::new(source_identity).file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "source".into());
    for n in 1.. {
        let candidate = base.join(format!("{name}-{n:03}"));
        if !candidate.exists() {
            return candidate;
        }
    }
    unreachable!("positive integers are infinite")
}

fn content_len(content: &FileContent) -> Result<u64> {
    match content {
        FileContent::Path(path) => Ok(fs::metadata(path)?.len()),
        FileContent::Bytes(bytes) => Ok(bytes.len() as u64),
    }
}

/// Splits a log4j-style rotated name `X`, `X.1`, `X.2`, ... into `(base, rotation)`,
/// where `rotation = 0` for the unsuffixed, current file.
fn rotation_of(relative: &Path) -> (PathBuf, u32) {
    let name = relative.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    match name.rsplit_once('.') {
        Some((base, suffix)) if suffix.chars().all(|c| c.is_ascii_digit()) && !suffix.is_empty() => {
            (relative.with_file_name(base), suffix.parse().unwrap_or(0))
        }
        _ => (relative.to_owned(), 0),
    }
}

struct Placed<'a> {
    file: &'a LogSourceFile,
    content: &'a FileContent,
    base: PathBuf,
    relative: PathBuf,
}

/// A planned copy before `base`/`relative` are joined into a final destination --
/// kept apart so [reduce_dirs] can shrink `relative` without losing track of which
/// base it must not cross.
struct Staged<'a> {
    base: PathBuf,
    relative: PathBuf,
    content: &'a FileContent,
    offset: u64,
    source_mtime: DateTime<Utc>,
}

/// Computes the copy plan for a batch of scanned files. Does not touch output bytes.
pub fn plan(files: &[(&LogSourceFile, &FileContent)], config: &ExtractConfig) -> Result<Vec<CopyOp>> {
    let mut base_for_source: HashMap<String, PathBuf> = HashMap::new();
    let mut placed = Vec::with_capacity(files.len());

    for (file, content) in files {
        let mut base = config.output_dir.clone();
        if let Some(tag) = &config.source_tag {
            base.push(sanitize(tag));
        }
        base.push(subpath_for(file));

        if config.keep_source_dirs && !is_bare_file_root(file) {
            base = base_for_source.entry(file.source_identity.clone()).or_insert_with(|| numbered_source_dir(&base, &file.source_identity)).clone();
        }

        placed.push(Placed { file, content, base, relative: relative_path_for(file) });
    }

    let mut staged = if config.join_log4j { join_log4j(placed)? } else { plain_copies(placed) };

    if config.reduce_dirs {
        reduce_dirs(&mut staged);
    }

    Ok(staged
        .into_iter()
        .map(|s| CopyOp { destination: s.base.join(s.relative), content: s.content.clone(), offset: s.offset, source_mtime: s.source_mtime })
        .collect())
}

fn plain_copies(placed: Vec<Placed>) -> Vec<Staged> {
    placed
        .into_iter()
        .map(|p| Staged { base: p.base, relative: p.relative, content: p.content, offset: 0, source_mtime: p.file.mtime })
        .collect()
}

fn join_log4j(placed: Vec<Placed>) -> Result<Vec<Staged>> {
    // group by (base dir, rotation-stripped relative path)
    let mut groups: BTreeMap<(PathBuf, PathBuf), Vec<(u32, Placed)>> = BTreeMap::new();
    for p in placed {
        let (stripped, rotation) = rotation_of(&p.relative);
        groups.entry((p.base.clone(), stripped)).or_default().push((rotation, p));
    }

    let mut staged = Vec::new();
    for ((base, stripped), mut members) in groups {
        members.sort_by(|a, b| b.0.cmp(&a.0)); // oldest (highest rotation number) first
        let mut offset = 0u64;
        for (_, placed) in members {
            let len = content_len(placed.content)?;
            staged.push(Staged { base: base.clone(), relative: stripped.clone(), content: placed.content, offset, source_mtime: placed.file.mtime });
            offset += len;
        }
    }
    Ok(staged)
}

/// Iteratively strips the common top directory from every `relative` path within
/// a base, stopping before stripping another level would collide two entries.
fn reduce_dirs(staged: &mut [Staged]) {
    let mut by_base: HashMap<PathBuf, Vec<usize>> = HashMap::new();
    for (i, s) in staged.iter().enumerate() {
        by_base.entry(s.base.clone()).or_default().push(i);
    }

    for indices in by_base.into_values() {
        loop {
            let strippable: Vec<bool> = indices.iter().map(|&i| staged[i].relative.components().count() > 1).collect();
            if !strippable.iter().any(|&b| b) {
                break;
            }

            let candidates: Vec<PathBuf> = indices
                .iter()
                .map(|&i| {
                    if staged[i].relative.components().count() > 1 {
                        let mut components = staged[i].relative.components();
                        components.next();
                        components.as_path().to_owned()
                    } else {
                        staged[i].relative.clone()
                    }
                })
                .collect();

            let mut seen = std::collections::HashSet::new();
            if !candidates.iter().all(|c| seen.insert(c.clone())) {
                break; // stripping another level would collide
            }

            for (&i, candidate) in indices.iter().zip(candidates.into_iter()) {
                staged[i].relative = candidate;
            }
        }
    }
}

/// Executes a copy plan: creates destination directories, stream-copies in 10 MiB
/// chunks, and sets each destination's mtime to `max(source_mtime, current)`.
pub fn execute(ops: &[CopyOp]) -> Result<()> {
    for op in ops {
        if let Some(parent) = op.destination.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut destination = if op.destination.exists() {
            OpenOptions::new().write(true).read(true).open(&op.destination)?
        } else {
            File::create(&op.destination)?
        };
        destination.seek(SeekFrom::Start(op.offset))?;

        let mut reader = dal_api::open_reader(&op.content)?;
        let mut buffer = vec![0u8; CHUNK_SIZE];
        loop {
            let read = reader.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            destination.write_all(&buffer[..read])?;
        }
        let current_mtime: DateTime<Utc> = destination.metadata()?.modified()?.into();
        let new_mtime = op.source_mtime.max(current_mtime);
        destination.set_modified(new_mtime.into())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap as Map;

    fn file(source_identity: &str, path: &str, pseudo_path: &str, fields: &[(&str, &str)]) -> LogSourceFile {
        LogSourceFile {
            source_identity: source_identity.into(),
            path: path.into(),
            pseudo_path: pseudo_path.into(),
            mtime: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            size: 0,
            path_fields: fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<Map<_, _>>(),
            destination_base_path: None,
            destination_relative_path: None,
            offset: 0,
        }
    }

    #[test]
    fn subpath_uses_named_groups_alphabetically() {
        let f = file("root", "/root/foo/a.log", "root/foo/a.log", &[("sub", "foo")]);
        let ops = plan(&[(&f, &FileContent::Bytes(vec![1]))], &ExtractConfig { output_dir: "/out".into(), ..ExtractConfig::default() }).unwrap();
        assert_eq!(ops[0].destination, PathBuf::from("/out/foo/a.log"));
    }

    #[test]
    fn join_log4j_orders_oldest_first_with_contiguous_offsets() {
        let base = file("root.tar", "app.log", "root.tar/app.log", &[]);
        let rot1 = file("root.tar", "app.log.1", "root.tar/app.log.1", &[]);
        let rot2 = file("root.tar", "app.log.2", "root.tar/app.log.2", &[]);
        let entries: Vec<(&LogSourceFile, &FileContent)> = vec![
            (&base, &FileContent::Bytes(vec![0u8; 3])),
            (&rot1, &FileContent::Bytes(vec![0u8; 5])),
            (&rot2, &FileContent::Bytes(vec![0u8; 7])),
        ];
        let config = ExtractConfig { output_dir: "/out".into(), join_log4j: true, ..ExtractConfig::default() };
        let mut ops = plan(&entries, &config).unwrap();
        ops.sort_by_key(|op| op.offset);
        assert_eq!(ops.len(), 3);
        assert!(ops.iter().all(|op| op.destination == PathBuf::from("/out/app.log")));
        assert_eq!(ops[0].offset, 0); // app.log.2, oldest
        assert_eq!(ops[1].offset, 7); // app.log.1
        assert_eq!(ops[2].offset, 12); // app.log
    }
}
