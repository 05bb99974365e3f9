//! Behavioural coverage for loading local archives into SQLite.

use std::{cell::RefCell, fs, io::Write, path::PathBuf};

use camino::Utf8PathBuf;
use cnpj_core::{EntityKind, SqliteStore};
use cnpj_data::{JobError, JobOutcome, LoadSettings, resolve_jobs, run_jobs};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const PAISES: &[u8] = b"\"105\";\"BRASIL\"\n\"158\";\"CHILE\"\n\"589\";\"PERU\"\n";
const CNAES: &[u8] = b"\"0111301\";\"CULTIVO DE ARROZ\"\n\"0111302\";\"CULTIVO DE MILHO\"\n";
const DUPLICATED_CNAES: &[u8] =
    b"\"0111301\";\"CULTIVO DE ARROZ\"\n\"0111301\";\"REPETIDO\"\n\"0111302\";\"CULTIVO DE MILHO\"\n";

#[fixture]
fn working_dir() -> TempDir {
    match TempDir::new() {
        Ok(dir) => dir,
        Err(err) => panic!("failed to create temporary directory: {err}"),
    }
}

#[fixture]
fn outcomes() -> RefCell<Option<Vec<JobOutcome>>> {
    RefCell::new(None)
}

#[fixture]
fn database() -> RefCell<Option<Utf8PathBuf>> {
    RefCell::new(None)
}

fn utf8(dir: &TempDir) -> Utf8PathBuf {
    match Utf8PathBuf::from_path_buf(dir.path().to_path_buf()) {
        Ok(path) => path,
        Err(path) => panic!("temporary path is not UTF-8: {path:?}"),
    }
}

fn download_dir(dir: &TempDir) -> Utf8PathBuf {
    utf8(dir).join("download")
}

fn write_archive(dir: &TempDir, name: &str, contents: &[u8]) {
    let target = download_dir(dir);
    fs::create_dir_all(&target).expect("create download directory");
    let file = fs::File::create(target.join(name)).expect("create archive file");
    let mut writer = ZipWriter::new(file);
    writer
        .start_file("DATA", SimpleFileOptions::default())
        .expect("start archive entry");
    writer.write_all(contents).expect("write archive entry");
    writer.finish().expect("finish archive");
}

fn parse_kind(raw: &str) -> EntityKind {
    raw.parse().expect("step names a known entity kind")
}

fn with_outcome<T>(
    outcomes: &RefCell<Option<Vec<JobOutcome>>>,
    kind: EntityKind,
    check: impl FnOnce(&JobOutcome) -> T,
) -> T {
    let borrowed = outcomes.borrow();
    let outcome = borrowed
        .as_ref()
        .expect("jobs must have run")
        .iter()
        .find(|outcome| outcome.entity_kind == kind)
        .expect("every requested kind has an outcome");
    check(outcome)
}

#[given("a download directory holding reference archives")]
fn reference_archives(#[from(working_dir)] dir: &TempDir) {
    write_archive(dir, "Paises.zip", PAISES);
    write_archive(dir, "Cnaes.zip", CNAES);
}

#[given("a download directory holding a cnae archive with a duplicated code")]
fn duplicated_cnae_archive(#[from(working_dir)] dir: &TempDir) {
    write_archive(dir, "Cnaes.zip", DUPLICATED_CNAES);
}

#[given("an establishment archive with a truncated row")]
fn truncated_establishment_archive(#[from(working_dir)] dir: &TempDir) {
    let fields: Vec<String> = (0..29).map(|index| format!("\"{index}\"")).collect();
    let row = format!("{}\n", fields.join(";"));
    write_archive(dir, "Estabelecimentos0.zip", row.as_bytes());
}

#[when("I load every entity kind into a fresh database")]
fn load_everything(
    #[from(working_dir)] dir: &TempDir,
    #[from(outcomes)] outcomes: &RefCell<Option<Vec<JobOutcome>>>,
    #[from(database)] database: &RefCell<Option<Utf8PathBuf>>,
) {
    let path = utf8(dir).join("db").join("cnpj.sqlite3");
    let store = match SqliteStore::initialise(&path) {
        Ok(store) => store,
        Err(err) => panic!("failed to initialise database: {err}"),
    };
    let jobs = match resolve_jobs(&EntityKind::ALL, &download_dir(dir)) {
        Ok(jobs) => jobs,
        Err(err) => panic!("failed to resolve jobs: {err}"),
    };
    let settings = LoadSettings::default().with_chunk_size(2);
    *outcomes.borrow_mut() = Some(run_jobs(&jobs, &store, &settings, true));
    *database.borrow_mut() = Some(path);
}

#[then("the {table} table holds {count} rows")]
fn table_holds(
    #[from(database)] database: &RefCell<Option<Utf8PathBuf>>,
    table: String,
    count: i64,
) {
    let path = database
        .borrow()
        .clone()
        .unwrap_or_else(|| panic!("database must be initialised"));
    let connection = match rusqlite::Connection::open(&path) {
        Ok(connection) => connection,
        Err(err) => panic!("failed to open {path}: {err}"),
    };
    let sql = format!("SELECT COUNT(*) FROM {table}");
    let rows: i64 = match connection.query_row(&sql, [], |row| row.get(0)) {
        Ok(value) => value,
        Err(err) => panic!("failed to count {table}: {err}"),
    };
    assert_eq!(rows, count);
}

#[then("every job succeeds")]
fn every_job_succeeds(#[from(outcomes)] outcomes: &RefCell<Option<Vec<JobOutcome>>>) {
    let borrowed = outcomes.borrow();
    let all = borrowed
        .as_ref()
        .unwrap_or_else(|| panic!("jobs must have run"));
    assert_eq!(all.len(), EntityKind::ALL.len());
    for outcome in all {
        if let Err(err) = &outcome.result {
            panic!("job {} failed: {err}", outcome.entity_kind);
        }
    }
}

#[then("the {kind} job skipped {count} rows")]
fn job_skipped(
    #[from(outcomes)] outcomes: &RefCell<Option<Vec<JobOutcome>>>,
    kind: String,
    count: u64,
) {
    with_outcome(outcomes, parse_kind(&kind), |outcome| match &outcome.result {
        Ok(report) => {
            assert_eq!(report.load.rows_skipped, count);
            assert_eq!(report.load.fallback_batches, 1);
        }
        Err(err) => panic!("job should succeed: {err}"),
    });
}

#[then("the {kind} job fails on row {row} of {file}")]
fn job_fails_on_row(
    #[from(outcomes)] outcomes: &RefCell<Option<Vec<JobOutcome>>>,
    kind: String,
    row: u64,
    file: String,
) {
    with_outcome(outcomes, parse_kind(&kind), |outcome| match &outcome.result {
        Err(JobError::RowIntegrity(details)) => {
            assert_eq!(details.row_index, row);
            assert_eq!(details.file, file);
            assert_eq!(details.expected, 30);
            assert_eq!(details.actual, 29);
        }
        Err(err) => panic!("unexpected error: {err}"),
        Ok(_) => panic!("job for {kind} should fail"),
    });
}

#[test]
fn scenario_indices_follow_feature_order() {
    let feature_path =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/features/load_pipeline.feature");
    let contents = match fs::read_to_string(&feature_path) {
        Ok(data) => data,
        Err(err) => panic!("failed to read feature file {feature_path:?}: {err}"),
    };
    let titles: Vec<&str> = contents
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Scenario: "))
        .collect();
    assert_eq!(
        titles,
        vec![
            "loading reference archives",
            "skipping a duplicated record",
            "stopping a job on a malformed row",
        ]
    );
}

macro_rules! register_scenario {
    ($name:ident, $index:literal) => {
        #[scenario(path = "tests/features/load_pipeline.feature", index = $index)]
        fn $name(
            working_dir: TempDir,
            outcomes: RefCell<Option<Vec<JobOutcome>>>,
            database: RefCell<Option<Utf8PathBuf>>,
        ) {
            let _ = (working_dir, outcomes, database);
        }
    };
}

register_scenario!(loading_reference_archives, 0);
register_scenario!(skipping_a_duplicated_record, 1);
register_scenario!(stopping_a_job_on_a_malformed_row, 2);
