use camino::Utf8Path;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::{ArchiveError, ArchiveReader, DEFAULT_ENCODING, RawRow, ReaderSettings};
use crate::test_fixtures::{utf8_dir, write_archive};

#[fixture]
fn workdir() -> TempDir {
    TempDir::new().expect("failed to create temporary directory")
}

fn collect_rows(path: &Utf8Path, settings: ReaderSettings) -> Vec<RawRow> {
    let mut reader = ArchiveReader::open(path, settings).expect("open archive");
    let mut rows = Vec::new();
    reader
        .for_each_row(|row| {
            rows.push(row);
            Ok::<(), ArchiveError>(())
        })
        .expect("read rows");
    rows
}

#[rstest]
fn decodes_latin1_and_splits_quoted_fields(workdir: TempDir) {
    let contents: &[u8] = b"\"7107\";\"S\xc3O PAULO\"\r\n\"9701\";\"BRAS\xcdLIA\"\r\n";
    let path = write_archive(&workdir, "Municipios.zip", &[("MUNICCSV", contents)]);

    let rows = collect_rows(&path, ReaderSettings::default());

    assert_eq!(
        rows,
        vec![
            RawRow {
                index: 0,
                fields: vec!["7107".to_owned(), "SÃO PAULO".to_owned()],
            },
            RawRow {
                index: 1,
                fields: vec!["9701".to_owned(), "BRASÍLIA".to_owned()],
            },
        ]
    );
}

#[rstest]
fn counts_rows_across_entries_and_skips_blank_lines(workdir: TempDir) {
    let path = write_archive(
        &workdir,
        "Empresas0.zip",
        &[
            ("nested/", b"".as_slice()),
            ("PART1", b"\"a\";\"1\"\n\n\"b\";\"2\"\n".as_slice()),
            ("PART2", b"\"c\";\"3\"".as_slice()),
        ],
    );

    let rows = collect_rows(&path, ReaderSettings::default());

    let seen: Vec<(u64, String)> = rows
        .into_iter()
        .map(|row| (row.index, row.fields.join("|")))
        .collect();
    assert_eq!(
        seen,
        vec![
            (0, "a|1".to_owned()),
            (1, "b|2".to_owned()),
            (2, "c|3".to_owned()),
        ]
    );
}

#[rstest]
fn visitor_errors_stop_the_stream(workdir: TempDir) {
    let path = write_archive(&workdir, "Paises.zip", &[("P", b"1;A\n2;B\n3;C\n".as_slice())]);
    let mut reader = ArchiveReader::open(&path, ReaderSettings::default()).expect("open archive");
    let mut visited = 0_u32;

    let outcome = reader.for_each_row(|row| {
        visited += 1;
        if row.index == 1 {
            return Err(ArchiveError::UnknownEncoding {
                label: "stop".to_owned(),
            });
        }
        Ok(())
    });

    assert!(matches!(outcome, Err(ArchiveError::UnknownEncoding { .. })));
    assert_eq!(visited, 2);
}

#[rstest]
fn returns_number_of_rows_read(workdir: TempDir) {
    let path = write_archive(&workdir, "Cnaes.zip", &[("C", b"1;A\n2;B\n".as_slice())]);
    let mut reader = ArchiveReader::open(&path, ReaderSettings::default()).expect("open archive");
    let total = reader
        .for_each_row(|_| Ok::<(), ArchiveError>(()))
        .expect("read rows");
    assert_eq!(total, 2);
    assert_eq!(reader.entry_count(), 1);
    assert_eq!(reader.path(), path.as_path());
}

#[rstest]
fn rejects_files_that_are_not_archives(workdir: TempDir) {
    let path = utf8_dir(&workdir).join("Cnaes.zip");
    std::fs::write(&path, b"not a zip").expect("write file");
    let err = ArchiveReader::open(&path, ReaderSettings::default()).expect_err("must fail");
    assert!(matches!(err, ArchiveError::Zip { .. }));
}

#[rstest]
fn reports_missing_archives(workdir: TempDir) {
    let path = utf8_dir(&workdir).join("absent.zip");
    let err = ArchiveReader::open(&path, ReaderSettings::default()).expect_err("must fail");
    assert!(matches!(err, ArchiveError::Open { .. }));
}

#[rstest]
#[case(DEFAULT_ENCODING, "windows-1252")]
#[case("latin1", "windows-1252")]
#[case(" utf-8 ", "UTF-8")]
fn resolves_encoding_labels(#[case] label: &str, #[case] name: &str) {
    let settings = ReaderSettings::default()
        .with_encoding_label(label)
        .expect("known label");
    assert_eq!(settings.encoding.name(), name);
}

#[rstest]
fn rejects_unknown_encoding_labels() {
    let err = ReaderSettings::default()
        .with_encoding_label("klingon")
        .expect_err("unknown label");
    assert!(matches!(err, ArchiveError::UnknownEncoding { label } if label == "klingon"));
}
