//! ZIP fixtures shared by unit tests.

use std::io::Write;

use camino::Utf8PathBuf;
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Write a ZIP archive named `name` inside `dir`.
///
/// Entry names ending in `/` become directories.
pub(crate) fn write_archive(dir: &TempDir, name: &str, entries: &[(&str, &[u8])]) -> Utf8PathBuf {
    let path = utf8_dir(dir).join(name);
    let file = std::fs::File::create(&path).expect("create archive");
    let mut writer = ZipWriter::new(file);
    for (entry, contents) in entries {
        if entry.ends_with('/') {
            writer
                .add_directory(*entry, SimpleFileOptions::default())
                .expect("add directory");
        } else {
            writer
                .start_file(*entry, SimpleFileOptions::default())
                .expect("start entry");
            writer.write_all(contents).expect("write entry");
        }
    }
    writer.finish().expect("finish archive");
    path
}

/// UTF-8 view of a temporary directory.
pub(crate) fn utf8_dir(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("temporary path should be UTF-8")
}
