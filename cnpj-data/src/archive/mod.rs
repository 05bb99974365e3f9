//! Streaming reader for the published ZIP archives.
//!
//! Entries are decompressed on the fly and never written to disk. Each line is
//! decoded with a single-byte encoding and split into fields with
//! [`tokenize`]. Rows are handed to a visitor one at a time, so memory use is
//! bounded by the longest line rather than by the archive.
#![forbid(unsafe_code)]

mod tokenize;

use std::io::{self, BufRead, BufReader};

use camino::{Utf8Path, Utf8PathBuf};
use encoding_rs::Encoding;
use log::debug;
use thiserror::Error;
use zip::ZipArchive;
use zip::result::ZipError;

pub use tokenize::tokenize;

/// Label of the encoding used by the publisher.
pub const DEFAULT_ENCODING: &str = "ISO-8859-1";

/// Errors raised while reading an archive.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArchiveError {
    /// The archive file could not be opened.
    #[error("failed to open archive {path}: {source}")]
    Open {
        /// Archive path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The file is not a readable ZIP archive.
    #[error("invalid ZIP archive {path}: {source}")]
    Zip {
        /// Archive path.
        path: Utf8PathBuf,
        /// Error reported by the ZIP reader.
        #[source]
        source: ZipError,
    },
    /// Decompressing an entry failed part way.
    #[error("failed to read entry {entry} of {path}: {source}")]
    ReadEntry {
        /// Archive path.
        path: Utf8PathBuf,
        /// Entry name inside the archive.
        entry: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The configured encoding label is not recognised.
    #[error("unknown text encoding {label:?}")]
    UnknownEncoding {
        /// Rejected label.
        label: String,
    },
}

/// Decoding options for archive entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderSettings {
    /// Encoding applied to every line.
    pub encoding: &'static Encoding,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            encoding: encoding_rs::WINDOWS_1252,
        }
    }
}

impl ReaderSettings {
    /// Select the encoding by its WHATWG label, e.g. `ISO-8859-1`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::UnknownEncoding`] when the label is not known.
    ///
    /// # Examples
    /// ```
    /// # use cnpj_data::archive::ReaderSettings;
    /// let settings = ReaderSettings::default()
    ///     .with_encoding_label("utf-8")
    ///     .expect("utf-8 is a known label");
    /// assert_eq!(settings.encoding.name(), "UTF-8");
    /// ```
    pub fn with_encoding_label(mut self, label: &str) -> Result<Self, ArchiveError> {
        self.encoding = Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
            ArchiveError::UnknownEncoding {
                label: label.to_owned(),
            }
        })?;
        Ok(self)
    }
}

/// One decoded line of an archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// Zero-based position of the row across every entry of the archive.
    pub index: u64,
    /// Fields in publication order.
    pub fields: Vec<String>,
}

/// Open ZIP archive yielding decoded rows.
pub struct ArchiveReader {
    path: Utf8PathBuf,
    archive: ZipArchive<std::fs::File>,
    settings: ReaderSettings,
}

impl std::fmt::Debug for ArchiveReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveReader")
            .field("path", &self.path)
            .field("entries", &self.archive.len())
            .field("encoding", &self.settings.encoding.name())
            .finish()
    }
}

impl ArchiveReader {
    /// Open the archive at `path` and read its central directory.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Open`] when the file cannot be opened and
    /// [`ArchiveError::Zip`] when it is not a ZIP archive.
    pub fn open(path: &Utf8Path, settings: ReaderSettings) -> Result<Self, ArchiveError> {
        let file = cnpj_fs::open_utf8_file(path)
            .map_err(|source| ArchiveError::Open {
                path: path.to_path_buf(),
                source,
            })?
            .into_std();
        let archive = ZipArchive::new(file).map_err(|source| ArchiveError::Zip {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            archive,
            settings,
        })
    }

    /// Path the archive was opened from.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Number of entries, directories included.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.archive.len()
    }

    /// Visit every row of every file entry in archive order.
    ///
    /// Blank lines are skipped and carriage returns are trimmed. The visitor
    /// stops the stream by returning an error, which is passed through
    /// unchanged. On success the number of visited rows is returned.
    ///
    /// # Errors
    ///
    /// Returns the visitor's error, or an [`ArchiveError`] converted into `E`
    /// when an entry cannot be decompressed.
    pub fn for_each_row<F, E>(&mut self, mut visit: F) -> Result<u64, E>
    where
        F: FnMut(RawRow) -> Result<(), E>,
        E: From<ArchiveError>,
    {
        let mut index: u64 = 0;
        for position in 0..self.archive.len() {
            let entry = self
                .archive
                .by_index(position)
                .map_err(|source| ArchiveError::Zip {
                    path: self.path.clone(),
                    source,
                })?;
            if entry.is_dir() {
                continue;
            }
            let entry_name = entry.name().to_owned();
            debug!("reading entry {entry_name} of {}", self.path);
            let mut reader = BufReader::new(entry);
            let mut line: Vec<u8> = Vec::new();
            loop {
                line.clear();
                let read = reader
                    .read_until(b'\n', &mut line)
                    .map_err(|source| ArchiveError::ReadEntry {
                        path: self.path.clone(),
                        entry: entry_name.clone(),
                        source,
                    })?;
                if read == 0 {
                    break;
                }
                let trimmed = line.trim_ascii();
                if trimmed.is_empty() {
                    continue;
                }
                let text = self.settings.encoding.decode_without_bom_handling(trimmed).0;
                visit(RawRow {
                    index,
                    fields: tokenize(&text),
                })?;
                index = index.saturating_add(1);
            }
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests;
