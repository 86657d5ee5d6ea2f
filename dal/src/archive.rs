//! Unifies tar and zip behind the [dal_api::Archive] capability set.
//!
//! Archive content is opened sequentially for tar (auto-detecting gzip
//! compression via the gzip magic bytes) or randomly for zip. Member bytes are
//! buffered up front since `tar` offers no random access -- acceptable at the
//! sizes this engine targets, and it lets a member that is itself an archive be
//! recursed into from the buffered bytes without re-opening the parent.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use common::{Error, Result};
use dal_api::Archive;
use flate2::read::GzDecoder;
use std::io::{Cursor, Read};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const USTAR_OFFSET: usize = 257;
const USTAR_MAGIC: &[u8] = b"ustar";

/// Tries to open `bytes` as a tar (optionally gzip-compressed) archive, then as a
/// zip archive. Returns `None` if neither format is recognized.
pub fn open_archive(bytes: Vec<u8>) -> Result<Option<Box<dyn Archive>>> {
    if let Some(tar) = TarArchive::try_open(&bytes)? {
        return Ok(Some(Box::new(tar)));
    }
    match ZipArchive::try_open(bytes) {
        Ok(Some(zip)) => Ok(Some(Box::new(zip))),
        Ok(None) => Ok(None),
        Err(err) => Err(err),
    }
}

struct TarEntry {
    name: String,
    bytes: Vec<u8>,
    mtime: DateTime<Utc>,
}

pub struct TarArchive {
    entries: Vec<TarEntry>,
}

impl TarArchive {
    fn try_open(bytes: &[u8]) -> Result<Option<Self>> {
        let is_gzip = bytes.len() >= 2 && bytes[0..2] == GZIP_MAGIC;
        let decompressed;
        let raw: &[u8] = if is_gzip {
            let mut decoder = GzDecoder::new(bytes);
            let mut buf = Vec::new();
            if decoder.read_to_end(&mut buf).is_err() {
                return Ok(None);
            }
            decompressed = buf;
            &decompressed
        } else {
            bytes
        };

        if raw.len() < USTAR_OFFSET + USTAR_MAGIC.len() || &raw[USTAR_OFFSET..USTAR_OFFSET + USTAR_MAGIC.len()] != USTAR_MAGIC {
            return Ok(None);
        }

        let mut archive = tar::Archive::new(raw);
        let mut entries = Vec::new();
        let iter = archive
            .entries()
            .map_err(|err| Error::InputAccess { path: "<tar>".into(), message: err.to_string() })?;
        for entry in iter {
            let mut entry = entry.map_err(|err| Error::InputAccess { path: "<tar>".into(), message: err.to_string() })?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let name = entry.path().map_err(|err| Error::InputAccess { path: "<tar>".into(), message: err.to_string() })?.to_string_lossy().into_owned();
            let mtime = entry
                .header()
                .mtime()
                .ok()
                .and_then(|secs| Utc.timestamp_opt(secs as i64, 0).single())
                .unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().unwrap());
            let mut buf = Vec::new();
            entry
                .read_to_end(&mut buf)
                .map_err(|err| Error::InputAccess { path: name.clone(), message: err.to_string() })?;
            entries.push(TarEntry { name, bytes: buf, mtime });
        }
        Ok(Some(TarArchive { entries }))
    }
}

impl Archive for TarArchive {
    fn members(&mut self) -> Result<Vec<String>> {
        Ok(self.entries.iter().map(|e| e.name.clone()).collect())
    }

    fn open(&mut self, member: &str) -> Result<Vec<u8>> {
        self.entries
            .iter()
            .find(|e| e.name == member)
            .map(|e| e.bytes.clone())
            .ok_or_else(|| Error::InputAccess { path: member.into(), message: "member not found in tar archive".into() })
    }

    fn mtime(&mut self, member: &str) -> Result<DateTime<Utc>> {
        self.entries
            .iter()
            .find(|e| e.name == member)
            .map(|e| e.mtime)
            .ok_or_else(|| Error::InputAccess { path: member.into(), message: "member not found in tar archive".into() })
    }

    fn size(&mut self, member: &str) -> Result<u64> {
        self.entries
            .iter()
            .find(|e| e.name == member)
            .map(|e| e.bytes.len() as u64)
            .ok_or_else(|| Error::InputAccess { path: member.into(), message: "member not found in tar archive".into() })
    }
}

pub struct ZipArchive {
    inner: zip::ZipArchive<Cursor<Vec<u8>>>,
}

impl ZipArchive {
    fn try_open(bytes: Vec<u8>) -> Result<Option<Self>> {
        match zip::ZipArchive::new(Cursor::new(bytes)) {
            Ok(inner) => Ok(Some(ZipArchive { inner })),
            Err(zip::result::ZipError::InvalidArchive(_)) => Ok(None),
            Err(err) => Err(Error::InputAccess { path: "<zip>".into(), message: err.to_string() }),
        }
    }
}

impl Archive for ZipArchive {
    fn members(&mut self) -> Result<Vec<String>> {
        Ok(self.inner.file_names().map(str::to_owned).collect())
    }

    fn open(&mut self, member: &str) -> Result<Vec<u8>> {
        let mut file = self
            .inner
            .by_name(member)
            .map_err(|err| Error::InputAccess { path: member.into(), message: err.to_string() })?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .map_err(|err| Error::InputAccess { path: member.into(), message: err.to_string() })?;
        Ok(buf)
    }

    fn mtime(&mut self, member: &str) -> Result<DateTime<Utc>> {
        let file = self
            .inner
            .by_name(member)
            .map_err(|err| Error::InputAccess { path: member.into(), message: err.to_string() })?;
        Ok(file
            .last_modified()
            .and_then(|dt| {
                NaiveDate::from_ymd_opt(dt.year() as i32, dt.month() as u32, dt.day() as u32)
                    .and_then(|d| d.and_hms_opt(dt.hour() as u32, dt.minute() as u32, dt.second() as u32))
            })
            .map(|naive| Utc.from_utc_datetime(&naive))
            .unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().unwrap()))
    }

    fn size(&mut self, member: &str) -> Result<u64> {
        let file = self
            .inner
            .by_name(member)
            .map_err(|err| Error::InputAccess { path: member.into(), message: err.to_string() })?;
        Ok(file.size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build_zip() -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(Cursor::new(&mut buf));
            writer.start_file("a.log", zip::write::FileOptions::<()>::default()).unwrap();
            writer.write_all(b"hello\n").unwrap();
            writer.finish().unwrap();
        }
        buf
    }

    fn build_tar() -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut builder = tar::Builder::new(&mut buf);
            let data = b"hello\n";
            let mut header = tar::Header::new_ustar();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, "a.log", &data[..]).unwrap();
            builder.finish().unwrap();
        }
        buf
    }

    #[test]
    fn opens_zip_archive() {
        let handle = open_archive(build_zip()).unwrap().expect("should be recognized as zip");
        let mut handle = handle;
        assert_eq!(handle.members().unwrap(), vec!["a.log".to_owned()]);
        assert_eq!(handle.open("a.log").unwrap(), b"hello\n");
    }

    #[test]
    fn opens_tar_archive() {
        let handle = open_archive(build_tar()).unwrap().expect("should be recognized as tar");
        let mut handle = handle;
        assert_eq!(handle.members().unwrap(), vec!["a.log".to_owned()]);
        assert_eq!(handle.open("a.log").unwrap(), b"hello\n");
    }

    #[test]
    fn rejects_unrecognized_bytes() {
        assert!(open_archive(b"not an archive".to_vec()).unwrap().is_none());
    }
}
