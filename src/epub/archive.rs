/*!
 * Archive codec for EPUB containers.
 *
 * `Archive` decodes the input zip into an ordered path → bytes mapping that
 * remembers each entry's compression method and timestamp. `OutputArchive`
 * overlays replacement bytes on top of it and re-encodes: untouched entries
 * are raw-copied (their compressed bytes never pass through a codec), and
 * overwritten entries are recompressed with the method they had on input.
 */

use bytes::Bytes;
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read, Write};
use std::sync::Arc;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::errors::EpubError;

/// Entries the container format requires to stay byte-for-byte identical
pub const PROTECTED_ENTRIES: &[&str] = &["mimetype"];

/// Upper bound on the buffer reserved from a declared entry size
const MAX_PREALLOCATION: u64 = 1 << 20;

/// One file or directory of the input archive
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Path inside the archive
    pub path: String,
    /// Compression method used on input
    pub compression: CompressionMethod,
    /// Last modification time stored in the entry header
    pub last_modified: DateTime,
    /// Directory entries carry no data and are not reproduced on output
    pub is_dir: bool,
    /// Decompressed content
    pub data: Bytes,
    /// Position in the central directory
    zip_index: usize,
}

/// Decoded input archive
#[derive(Debug)]
pub struct Archive {
    raw: Bytes,
    entries: Vec<ArchiveEntry>,
    index: HashMap<String, usize>,
}

impl Archive {
    /// Decode every entry of a zip archive held in memory
    pub fn open(raw: impl Into<Bytes>) -> Result<Self, EpubError> {
        let raw = raw.into();
        let mut zip = ZipArchive::new(Cursor::new(raw.clone()))?;

        let mut entries = Vec::with_capacity(zip.len());
        let mut index = HashMap::with_capacity(zip.len());
        for zip_index in 0..zip.len() {
            let mut file = zip.by_index(zip_index)?;
            let path = file.name().to_string();
            let mut data = Vec::with_capacity(file.size().min(MAX_PREALLOCATION) as usize);
            file.read_to_end(&mut data)?;

            index.insert(path.clone(), entries.len());
            entries.push(ArchiveEntry {
                path,
                compression: file.compression(),
                last_modified: file.last_modified(),
                is_dir: file.is_dir(),
                data: Bytes::from(data),
                zip_index,
            });
        }

        debug!("Opened archive with {} entries", entries.len());
        Ok(Self { raw, entries, index })
    }

    /// Entries in central-directory order
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// File paths in archive order, directories excluded
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|entry| !entry.is_dir)
            .map(|entry| entry.path.as_str())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entry(path).is_some()
    }

    pub fn entry(&self, path: &str) -> Option<&ArchiveEntry> {
        self.index
            .get(path)
            .map(|&position| &self.entries[position])
            .filter(|entry| !entry.is_dir)
    }

    /// Content of a file entry
    pub fn get(&self, path: &str) -> Option<&Bytes> {
        self.entry(path).map(|entry| &entry.data)
    }

    /// Content of a file entry decoded as UTF-8
    pub fn read_string(&self, path: &str) -> Result<String, EpubError> {
        let data = self
            .get(path)
            .ok_or_else(|| EpubError::MissingEntry(path.to_string()))?;
        String::from_utf8(data.to_vec()).map_err(|_| EpubError::InvalidEncoding(path.to_string()))
    }
}

/// Output mapping that starts identical to its source and is selectively overwritten
#[derive(Debug)]
pub struct OutputArchive {
    source: Arc<Archive>,
    overrides: BTreeMap<String, Bytes>,
}

impl OutputArchive {
    pub fn new(source: Arc<Archive>) -> Self {
        Self {
            source,
            overrides: BTreeMap::new(),
        }
    }

    pub fn source(&self) -> &Archive {
        &self.source
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.source.paths()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.source.contains(path)
    }

    /// Current content of an entry, including overwrites
    pub fn get(&self, path: &str) -> Option<&Bytes> {
        self.overrides.get(path).or_else(|| self.source.get(path))
    }

    /// Replace the content of an existing entry
    pub fn overwrite(&mut self, path: &str, data: impl Into<Bytes>) -> Result<(), EpubError> {
        if PROTECTED_ENTRIES.contains(&path) {
            return Err(EpubError::ProtectedEntry(path.to_string()));
        }
        if !self.source.contains(path) {
            return Err(EpubError::MissingEntry(path.to_string()));
        }
        self.overrides.insert(path.to_string(), data.into());
        Ok(())
    }

    /// Paths overwritten so far, sorted
    pub fn modified_paths(&self) -> Vec<&str> {
        self.overrides.keys().map(String::as_str).collect()
    }

    /// Encode the output archive.
    ///
    /// Entry order follows the input. Directory entries are dropped.
    pub fn into_bytes(self) -> Result<Vec<u8>, EpubError> {
        let mut reader = ZipArchive::new(Cursor::new(self.source.raw.clone()))?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(self.source.raw.len())));

        for entry in self.source.entries.iter().filter(|entry| !entry.is_dir) {
            match self.overrides.get(&entry.path) {
                Some(data) => {
                    let options = FileOptions::default()
                        .compression_method(writable_compression(entry.compression))
                        .last_modified_time(entry.last_modified);
                    writer.start_file(entry.path.as_str(), options)?;
                    writer.write_all(data)?;
                }
                None => {
                    let file = reader.by_index_raw(entry.zip_index)?;
                    writer.raw_copy_file(file)?;
                }
            }
        }

        let cursor = writer.finish()?;
        debug!(
            "Encoded archive with {} rewritten entries",
            self.overrides.len()
        );
        Ok(cursor.into_inner())
    }
}

/// Methods this build cannot write fall back to deflate
fn writable_compression(method: CompressionMethod) -> CompressionMethod {
    match method {
        CompressionMethod::Stored => CompressionMethod::Stored,
        _ => CompressionMethod::Deflated,
    }
}
