use std::fs;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use cnpj_core::EntityKind;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::util::sanitise_base_url;
use super::{
    ArchiveRef, BaseUrl, NoProgress, RetrievalError, RetrievalSettings, StubSource,
    block_on_for_tests, fetch_all, fetch_archive,
};

const BASE: &str = "http://example.org/CNPJ/";
const CNAES_URL: &str = "http://example.org/CNPJ/Cnaes.zip";
const PAISES_URL: &str = "http://example.org/CNPJ/Paises.zip";

#[fixture]
fn destination() -> (TempDir, Utf8PathBuf) {
    let temp = TempDir::new().expect("failed to create temporary directory");
    let path = Utf8PathBuf::from_path_buf(temp.path().join("download"))
        .expect("temporary path should be UTF-8");
    (temp, path)
}

#[fixture]
fn settings() -> RetrievalSettings {
    RetrievalSettings::default()
        .with_max_retry(5)
        .with_block_size(4)
        .with_retry_delay(Duration::ZERO)
}

fn cnaes() -> ArchiveRef {
    ArchiveRef::new(CNAES_URL, "Cnaes.zip", EntityKind::Cnae)
}

fn fetch(
    source: &StubSource,
    archive: &ArchiveRef,
    dir: &Utf8Path,
    settings: &RetrievalSettings,
) -> Result<super::DownloadReport, RetrievalError> {
    block_on_for_tests(fetch_archive(source, archive, dir, settings, &NoProgress))
}

#[rstest]
fn writes_complete_archive_on_first_attempt(
    destination: (TempDir, Utf8PathBuf),
    settings: RetrievalSettings,
) {
    let (_temp, dir) = destination;
    let body = b"0123456789".to_vec();
    let source = StubSource::new(BASE).with_archive(CNAES_URL, body.clone());

    let report = fetch(&source, &cnaes(), &dir, &settings).expect("download should succeed");

    assert_eq!(report.attempts, 1);
    assert_eq!(report.bytes_written, 10);
    assert_eq!(report.output_path, dir.join("Cnaes.zip"));
    assert_eq!(fs::read(&report.output_path).expect("archive readable"), body);
}

#[rstest]
fn retries_truncated_bodies_from_scratch(
    destination: (TempDir, Utf8PathBuf),
    settings: RetrievalSettings,
) {
    let (_temp, dir) = destination;
    let body = b"abcdefghijklmnop".to_vec();
    let source = StubSource::new(BASE)
        .with_archive(CNAES_URL, body.clone())
        .truncating(CNAES_URL, 2)
        .watching_partial(dir.join("Cnaes.zip"));

    let report = fetch(&source, &cnaes(), &dir, &settings).expect("third attempt succeeds");

    assert_eq!(report.attempts, 3);
    assert_eq!(report.bytes_written, 16);
    assert_eq!(source.archive_requests(CNAES_URL), 3);
    assert_eq!(source.partial_seen(), vec![false, false, false]);
    assert_eq!(fs::read(&report.output_path).expect("archive readable"), body);
}

#[rstest]
fn gives_up_after_exactly_max_retry_attempts(
    destination: (TempDir, Utf8PathBuf),
    settings: RetrievalSettings,
) {
    let (_temp, dir) = destination;
    let source = StubSource::new(BASE)
        .with_archive(CNAES_URL, b"abcdefgh".to_vec())
        .truncating(CNAES_URL, u32::MAX);

    let err = fetch(&source, &cnaes(), &dir, &settings).expect_err("download must fail");

    match err {
        RetrievalError::DownloadExhausted { url, attempts } => {
            assert_eq!(url, CNAES_URL);
            assert_eq!(attempts, 5);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(source.archive_requests(CNAES_URL), 5);
    assert!(!dir.join("Cnaes.zip").exists(), "partial file must be removed");
}

#[rstest]
fn transport_errors_consume_attempts(
    destination: (TempDir, Utf8PathBuf),
    settings: RetrievalSettings,
) {
    let (_temp, dir) = destination;
    let source = StubSource::new(BASE);

    let err = fetch(&source, &cnaes(), &dir, &settings).expect_err("missing archive fails");

    assert!(matches!(
        err,
        RetrievalError::DownloadExhausted { attempts: 5, .. }
    ));
}

#[rstest]
fn accepts_archives_without_declared_length(
    destination: (TempDir, Utf8PathBuf),
    settings: RetrievalSettings,
) {
    let (_temp, dir) = destination;
    let source = StubSource::new(BASE).with_undeclared_archive(CNAES_URL, b"abc".to_vec());

    let report = fetch(&source, &cnaes(), &dir, &settings).expect("download should succeed");

    assert_eq!(report.attempts, 1);
    assert_eq!(report.bytes_written, 3);
}

#[rstest]
fn replaces_stale_files_in_destination(
    destination: (TempDir, Utf8PathBuf),
    settings: RetrievalSettings,
) {
    let (_temp, dir) = destination;
    fs::create_dir_all(&dir).expect("create destination");
    fs::write(dir.join("Cnaes.zip"), b"stale contents that are longer").expect("seed file");
    let source = StubSource::new(BASE).with_archive(CNAES_URL, b"fresh".to_vec());

    let report = fetch(&source, &cnaes(), &dir, &settings).expect("download should succeed");

    assert_eq!(fs::read(&report.output_path).expect("archive readable"), b"fresh");
}

#[rstest]
fn fetch_all_keeps_input_order_and_isolates_failures(
    destination: (TempDir, Utf8PathBuf),
    settings: RetrievalSettings,
) {
    let (_temp, dir) = destination;
    let source = StubSource::new(BASE)
        .with_archive(CNAES_URL, b"cnaes".to_vec())
        .with_archive(PAISES_URL, b"paises".to_vec())
        .truncating(PAISES_URL, u32::MAX);
    let archives = vec![
        ArchiveRef::new(PAISES_URL, "Paises.zip", EntityKind::Pais),
        cnaes(),
    ];

    let outcomes = block_on_for_tests(fetch_all(
        &source,
        &archives,
        &dir,
        &settings,
        &NoProgress,
        2,
    ));

    assert_eq!(outcomes.len(), 2);
    assert!(matches!(
        outcomes.first(),
        Some(Err(RetrievalError::DownloadExhausted { .. }))
    ));
    let report = match outcomes.get(1) {
        Some(Ok(report)) => report,
        other => panic!("expected the second archive to download: {other:?}"),
    };
    assert_eq!(report.archive.entity_kind, EntityKind::Cnae);
    assert_eq!(report.bytes_written, 5);
}

#[rstest]
#[case("http://example.org/CNPJ/", "http://example.org/CNPJ/")]
#[case("http://example.org/CNPJ", "http://example.org/CNPJ/")]
#[case("  http://example.org/CNPJ  ", "http://example.org/CNPJ/")]
fn sanitises_base_urls(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(sanitise_base_url(input), BaseUrl::from(expected));
}

#[rstest]
fn defaults_empty_base_url() {
    assert_eq!(
        sanitise_base_url("   "),
        BaseUrl::from(super::DEFAULT_BASE_URL)
    );
}

#[rstest]
fn names_archives_after_last_path_segment() {
    let url = url::Url::parse("http://example.org/CNPJ/Empresas3.zip").expect("valid URL");
    let archive = ArchiveRef::from_url(url, EntityKind::Empresa).expect("has a file name");
    assert_eq!(archive.local_name, "Empresas3.zip");
    assert_eq!(archive.url.as_ref(), "http://example.org/CNPJ/Empresas3.zip");

    let root = url::Url::parse("http://example.org/").expect("valid URL");
    assert!(ArchiveRef::from_url(root, EntityKind::Empresa).is_none());
}
