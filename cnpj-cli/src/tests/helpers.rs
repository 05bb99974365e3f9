//! Test helpers for building archive directories on disk.

use std::{fs, io::Write};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;
use zip::{ZipWriter, write::SimpleFileOptions};

pub(super) const PAISES: &[u8] = b"\"105\";\"BRASIL\"\n\"158\";\"CHILE\"\n\"589\";\"PERU\"\n";
pub(super) const MALFORMED_PAISES: &[u8] = b"\"105\";\"BRASIL\";\"EXTRA\"\n";

/// Temporary workspace holding an archive directory and a database path.
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        Self { _dir: dir, root }
    }

    pub(super) fn archives(&self) -> Utf8PathBuf {
        self.root.join("download")
    }

    pub(super) fn database(&self) -> Utf8PathBuf {
        self.root.join("cnpj.sqlite3")
    }

    pub(super) fn write_archive(&self, name: &str, contents: &[u8]) -> Utf8PathBuf {
        write_archive(&self.archives(), name, contents)
    }
}

pub(super) fn write_archive(dir: &Utf8Path, name: &str, contents: &[u8]) -> Utf8PathBuf {
    fs::create_dir_all(dir).expect("create archive directory");
    let path = dir.join(name);
    let mut writer = ZipWriter::new(fs::File::create(&path).expect("create archive"));
    writer
        .start_file("DATA", SimpleFileOptions::default())
        .expect("start entry");
    writer.write_all(contents).expect("write entry");
    writer.finish().expect("finish archive");
    path
}

pub(super) fn zipped(contents: &[u8]) -> Vec<u8> {
    let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    writer
        .start_file("DATA", SimpleFileOptions::default())
        .expect("start entry");
    writer.write_all(contents).expect("write entry");
    writer.finish().expect("finish archive").into_inner()
}

pub(super) fn count_rows(database: &Utf8Path, table: &str) -> i64 {
    let connection = rusqlite::Connection::open(database).expect("open database");
    connection
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .expect("count rows")
}
