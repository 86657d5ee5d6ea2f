//! Resting place for [FileContent], the boundary type between the scanner (`dal`)
//! and any downstream consumer (matcher, extractor) that needs a matched file's bytes.

use common::Result;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::PathBuf;

/// Where to read a matched file's bytes from: directly off disk (directory/bare-file
/// roots), or from an in-memory buffer (archive members, since `tar` offers no
/// random access).
#[derive(Clone)]
pub enum FileContent {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// Opens a buffered byte stream for a scanned file.
pub fn open_reader(content: &FileContent) -> Result<Box<dyn BufRead>> {
    match content {
        FileContent::Path(path) => Ok(Box::new(BufReader::with_capacity(1024 * 1024, File::open(path)?))),
        FileContent::Bytes(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
    }
}

/// Reads the whole file into memory regardless of where it lives -- used by the
/// extractor, which needs to stream-copy from an arbitrary `offset`.
pub fn open_bytes(content: &FileContent) -> Result<Vec<u8>> {
    match content {
        FileContent::Path(path) => Ok(std::fs::read(path)?),
        FileContent::Bytes(bytes) => Ok(bytes.clone()),
    }
}
