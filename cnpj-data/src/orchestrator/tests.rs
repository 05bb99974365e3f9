use cnpj_core::test_support::MemoryStore;
use cnpj_core::{EntityKind, Value};
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::{JobError, LoadJob, LoadSettings, resolve_jobs, run_job, run_jobs};
use crate::test_fixtures::{utf8_dir, write_archive};

const PAISES: &[u8] = b"\"105\";\"BRASIL\"\n\"158\";\"CHILE\"\n\"589\";\"PERU\"\n";
const CNAES: &[u8] = b"\"0111301\";\"CULTIVO DE ARROZ\"\n\"0111302\";\"CULTIVO DE MILHO\"\n";
const QUALIFICACOES: &[u8] = b"\"05\";\"ADMINISTRADOR\"\n";

#[fixture]
fn workdir() -> TempDir {
    TempDir::new().expect("failed to create temporary directory")
}

fn settings() -> LoadSettings {
    LoadSettings::default().with_chunk_size(2)
}

#[rstest]
fn resolves_matching_archives_sorted_by_name(workdir: TempDir) {
    for name in ["Empresas1.zip", "Empresas0.zip", "Estabelecimentos0.zip", "Empresas.txt"] {
        std::fs::write(workdir.path().join(name), b"").expect("seed file");
    }
    let dir = utf8_dir(&workdir);

    let job = LoadJob::resolve(EntityKind::Empresa, &dir).expect("directory is readable");

    assert_eq!(
        job.source_files,
        vec![dir.join("Empresas0.zip"), dir.join("Empresas1.zip")]
    );
    assert_eq!(job.expected_column_count(), 7);
    assert_eq!(job.schema.table, "empresas");
}

#[rstest]
fn resolves_jobs_in_catalog_order(workdir: TempDir) {
    let dir = utf8_dir(&workdir);

    let jobs = resolve_jobs(&[EntityKind::Socio, EntityKind::Cnae], &dir).expect("readable");

    let kinds: Vec<EntityKind> = jobs.iter().map(|job| job.entity_kind).collect();
    assert_eq!(kinds, vec![EntityKind::Cnae, EntityKind::Socio]);
    assert!(jobs.iter().all(|job| job.source_files.is_empty()));
}

#[rstest]
fn reports_unreadable_directories(workdir: TempDir) {
    let missing = utf8_dir(&workdir).join("absent");

    let err = LoadJob::resolve(EntityKind::Pais, &missing).expect_err("directory is missing");

    assert!(matches!(
        err,
        JobError::ListDirectory {
            entity_kind: EntityKind::Pais,
            ..
        }
    ));
}

#[rstest]
fn loads_every_archive_of_a_job(workdir: TempDir) {
    let first = write_archive(&workdir, "Paises0.zip", &[("P0", PAISES)]);
    let second = write_archive(&workdir, "Paises1.zip", &[("P1", b"\"999\";\"ZZ\"\n".as_slice())]);
    let store = MemoryStore::single_writer();
    let job = LoadJob::new(EntityKind::Pais, vec![first, second]);

    let report = run_job(&job, &store, &settings()).expect("job succeeds");

    assert_eq!(report.files, 2);
    assert_eq!(report.load.rows_loaded, 4);
    assert_eq!(store.batch_sizes(), vec![2, 1, 1]);
    let codes: Vec<Option<i64>> = store
        .committed_for(EntityKind::Pais)
        .iter()
        .map(|record| record.get("codigo").and_then(Value::as_integer))
        .collect();
    assert_eq!(codes, vec![Some(105), Some(158), Some(589), Some(999)]);
}

#[rstest]
fn wrong_width_row_fails_before_touching_the_sink(workdir: TempDir) {
    let archive = write_archive(
        &workdir,
        "Paises.zip",
        &[("P", b"\"105\";\"BRASIL\";\"EXTRA\"\n\"158\";\"CHILE\"\n".as_slice())],
    );
    let store = MemoryStore::single_writer();
    let job = LoadJob::new(EntityKind::Pais, vec![archive]);

    let err = run_job(&job, &store, &settings()).expect_err("row width is wrong");

    match err {
        JobError::RowIntegrity(details) => {
            assert_eq!(details.entity_kind, EntityKind::Pais);
            assert_eq!(details.file, "Paises.zip");
            assert_eq!(details.row_index, 0);
            assert_eq!(details.expected, 2);
            assert_eq!(details.actual, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(store.batch_sizes().is_empty());
    assert_eq!(store.single_inserts(), 0);
    assert!(store.committed().is_empty());
}

#[rstest]
fn failing_job_does_not_stop_its_siblings(workdir: TempDir) {
    let cnaes = write_archive(&workdir, "Cnaes.zip", &[("C", CNAES)]);
    let broken = workdir.path().join("Paises.zip");
    std::fs::write(&broken, b"not a zip").expect("seed file");
    let broken_path = utf8_dir(&workdir).join("Paises.zip");
    let store = MemoryStore::concurrent();
    let jobs = vec![
        LoadJob::new(EntityKind::Cnae, vec![cnaes]),
        LoadJob::new(EntityKind::Pais, vec![broken_path]),
    ];

    let outcomes = run_jobs(&jobs, &store, &settings(), true);

    let kinds: Vec<EntityKind> = outcomes.iter().map(|outcome| outcome.entity_kind).collect();
    assert_eq!(kinds, vec![EntityKind::Cnae, EntityKind::Pais]);
    assert!(outcomes.first().is_some_and(super::JobOutcome::is_ok));
    assert!(matches!(
        outcomes.get(1).map(|outcome| &outcome.result),
        Some(Err(JobError::Archive(_)))
    ));
    assert_eq!(store.committed_for(EntityKind::Cnae).len(), 2);
}

#[rstest]
#[case(MemoryStore::single_writer(), true)]
#[case(MemoryStore::concurrent(), false)]
fn never_overlaps_sinks_without_concurrency(
    workdir: TempDir,
    #[case] store: MemoryStore,
    #[case] allowed: bool,
) {
    let jobs = vec![
        LoadJob::new(
            EntityKind::Cnae,
            vec![write_archive(&workdir, "Cnaes.zip", &[("C", CNAES)])],
        ),
        LoadJob::new(
            EntityKind::Pais,
            vec![write_archive(&workdir, "Paises.zip", &[("P", PAISES)])],
        ),
        LoadJob::new(
            EntityKind::Qualificacao,
            vec![write_archive(&workdir, "Qualificacoes.zip", &[("Q", QUALIFICACOES)])],
        ),
    ];

    let outcomes = run_jobs(&jobs, &store, &settings(), allowed);

    assert!(outcomes.iter().all(super::JobOutcome::is_ok));
    assert_eq!(store.max_active_sinks(), 1);
    assert_eq!(store.sinks_opened(), 3);
    assert_eq!(store.committed().len(), 6);
}

#[rstest]
fn concurrent_store_opens_one_sink_per_job(workdir: TempDir) {
    let jobs = vec![
        LoadJob::new(
            EntityKind::Cnae,
            vec![write_archive(&workdir, "Cnaes.zip", &[("C", CNAES)])],
        ),
        LoadJob::new(
            EntityKind::Pais,
            vec![write_archive(&workdir, "Paises.zip", &[("P", PAISES)])],
        ),
    ];
    let store = MemoryStore::concurrent();

    let outcomes = run_jobs(&jobs, &store, &settings(), true);

    assert!(outcomes.iter().all(super::JobOutcome::is_ok));
    assert_eq!(store.sinks_opened(), 2);
    assert_eq!(store.committed_for(EntityKind::Pais).len(), 3);
}
