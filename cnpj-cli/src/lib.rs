//! Command-line interface for the CNPJ open-data loader.
//!
//! `cnpj import` optionally downloads the published archives, creates the
//! SQLite tables, and loads every requested entity kind. Options layer as
//! flags over `CNPJ_CMDS_IMPORT_*` environment variables over configuration
//! files.
#![forbid(unsafe_code)]

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use cnpj_core::{EntityKind, SqliteStore, UnknownEntityKind};
use cnpj_data::archive::{DEFAULT_ENCODING, ReaderSettings};
use cnpj_data::retrieval::{
    ArchiveSource, DEFAULT_BASE_URL, HttpArchiveSource, MAX_RETRY, ProgressReporter,
    RetrievalSettings,
};
use cnpj_data::{
    DEFAULT_CHUNK_SIZE, DiscoverySettings, LoadSettings, fetch_all, list_archives, resolve_jobs,
    run_jobs,
};
use log::{error, info};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

mod error;
mod progress;

pub use error::CliError;
pub use progress::IndicatifProgress;

const ARG_DOWNLOAD: &str = "download";
const ARG_CONCURRENT: &str = "concurrent";
const ARG_DIRECTORY: &str = "directory";
const ARG_DATABASE: &str = "database";
const ARG_BASE_URL: &str = "base-url";
const ARG_ENCODING: &str = "encoding";
const ARG_CHUNK_SIZE: &str = "chunk-size";
const ARG_MAX_RETRY: &str = "max-retry";
const ARG_KINDS: &str = "kinds";

const DEFAULT_DIRECTORY: &str = "download";
const DEFAULT_DATABASE: &str = "cnpj.sqlite3";

/// Run the CNPJ CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns [`CliError`] when the configuration is invalid, when discovery or
/// database preparation fails, or when any download or load job failed.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Import(args) => {
            let config = args.into_config()?;
            run_import(&config)
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "cnpj",
    about = "Download and load the CNPJ open-data release into SQLite",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download the published archives and load them into SQLite.
    Import(ImportArgs),
}

/// CLI arguments for the `import` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Fetch the CNPJ archives from the publisher's index and load \
                  every entity kind into its own SQLite table. Options can \
                  come from CLI flags, configuration files, or environment \
                  variables.",
    about = "Download and load the CNPJ archives"
)]
#[ortho_config(prefix = "CNPJ")]
struct ImportArgs {
    /// Download the archives before loading them.
    #[arg(long = ARG_DOWNLOAD, value_name = "bool")]
    #[serde(default)]
    download: Option<bool>,
    /// Run downloads and load jobs in parallel where possible.
    #[arg(long = ARG_CONCURRENT, value_name = "bool")]
    #[serde(default)]
    concurrent: Option<bool>,
    /// Directory holding the downloaded archives.
    #[arg(long = ARG_DIRECTORY, value_name = "path")]
    #[serde(default)]
    directory: Option<Utf8PathBuf>,
    /// SQLite database file to create or extend.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    database: Option<Utf8PathBuf>,
    /// Index page listing the published archives.
    #[arg(long = ARG_BASE_URL, value_name = "url")]
    #[serde(default)]
    base_url: Option<String>,
    /// Text encoding of the archive contents.
    #[arg(long = ARG_ENCODING, value_name = "label")]
    #[serde(default)]
    encoding: Option<String>,
    /// Records inserted per transaction.
    #[arg(long = ARG_CHUNK_SIZE, value_name = "n")]
    #[serde(default)]
    chunk_size: Option<usize>,
    /// Attempts per download before giving up.
    #[arg(long = ARG_MAX_RETRY, value_name = "n")]
    #[serde(default)]
    max_retry: Option<u32>,
    /// Comma-separated entity kinds to import, e.g. `cnae,pais`.
    #[arg(long = ARG_KINDS, value_name = "list")]
    #[serde(default)]
    kinds: Option<String>,
}

impl ImportArgs {
    fn into_config(self) -> Result<ImportConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ImportConfig::try_from(merged)
    }
}

/// Effective options of one import run.
#[derive(Debug, Clone, PartialEq)]
struct ImportConfig {
    download: bool,
    concurrent: bool,
    directory: Utf8PathBuf,
    database: Utf8PathBuf,
    base_url: String,
    kinds: Vec<EntityKind>,
    discovery: DiscoverySettings,
    retrieval: RetrievalSettings,
    load: LoadSettings,
}

impl TryFrom<ImportArgs> for ImportConfig {
    type Error = CliError;

    fn try_from(args: ImportArgs) -> Result<Self, Self::Error> {
        let encoding = args.encoding.as_deref().unwrap_or(DEFAULT_ENCODING);
        let reader = ReaderSettings::default()
            .with_encoding_label(encoding)
            .map_err(CliError::Encoding)?;
        let max_retry = args.max_retry.unwrap_or(MAX_RETRY);
        Ok(Self {
            download: args.download.unwrap_or(true),
            concurrent: args.concurrent.unwrap_or(true),
            directory: args
                .directory
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DIRECTORY)),
            database: args
                .database
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE)),
            base_url: args
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            kinds: parse_kinds(args.kinds.as_deref())?,
            discovery: DiscoverySettings::default().with_max_retry(max_retry),
            retrieval: RetrievalSettings::default().with_max_retry(max_retry),
            load: LoadSettings::default()
                .with_chunk_size(args.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE))
                .with_reader(reader),
        })
    }
}

/// Parse a comma-separated kinds list. Absent or blank means every kind.
fn parse_kinds(raw: Option<&str>) -> Result<Vec<EntityKind>, UnknownEntityKind> {
    let Some(list) = raw.filter(|list| !list.trim().is_empty()) else {
        return Ok(EntityKind::ALL.to_vec());
    };
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::parse)
        .collect()
}

impl ImportConfig {
    fn log_parameters(&self) {
        info!("download: {}", self.download);
        info!("concurrent: {}", self.concurrent);
        info!("directory: {}", self.directory);
        info!("database: {}", self.database);
        info!("base url: {}", self.base_url);
        info!("encoding: {}", self.load.reader.encoding.name());
        info!("chunk size: {}", self.load.chunk_size);
        info!("max retry: {}", self.retrieval.max_retry);
        let kinds: Vec<&str> = self.kinds.iter().map(|kind| kind.identifier()).collect();
        info!("kinds: {}", kinds.join(","));
    }

    const fn download_workers(&self, archives: usize) -> usize {
        if self.concurrent { archives } else { 1 }
    }
}

fn run_import(config: &ImportConfig) -> Result<(), CliError> {
    config.log_parameters();
    let failed_downloads = if config.download {
        download(config)?
    } else {
        info!("skipping download, loading archives already in {}", config.directory);
        0
    };
    let failed_jobs = load(config)?;
    if failed_downloads == 0 && failed_jobs == 0 {
        info!("import complete");
        Ok(())
    } else {
        Err(CliError::Incomplete {
            failed_downloads,
            failed_jobs,
        })
    }
}

/// Download every archive of the configured kinds over HTTP.
fn download(config: &ImportConfig) -> Result<usize, CliError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let source = HttpArchiveSource::new(config.base_url.clone()).map_err(CliError::Source)?;
    let progress = IndicatifProgress::new();
    runtime.block_on(download_with(&source, config, &progress))
}

/// List and fetch the configured archives, returning how many failed.
async fn download_with<S, P>(
    source: &S,
    config: &ImportConfig,
    progress: &P,
) -> Result<usize, CliError>
where
    S: ArchiveSource + ?Sized,
    P: ProgressReporter + ?Sized,
{
    let archives = list_archives(source, &config.discovery, &config.kinds).await?;
    info!("found {} archives to download", archives.len());
    let outcomes = fetch_all(
        source,
        &archives,
        &config.directory,
        &config.retrieval,
        progress,
        config.download_workers(archives.len()),
    )
    .await;
    let failed = outcomes.iter().filter(|outcome| outcome.is_err()).count();
    if failed > 0 {
        error!("{failed} of {} downloads failed", archives.len());
    }
    Ok(failed)
}

/// Create the tables and run one load job per kind, returning how many failed.
fn load(config: &ImportConfig) -> Result<usize, CliError> {
    let store = SqliteStore::initialise(&config.database).map_err(|source| CliError::OpenStore {
        path: config.database.clone(),
        source,
    })?;
    let jobs = resolve_jobs(&config.kinds, &config.directory)?;
    let outcomes = run_jobs(&jobs, &store, &config.load, config.concurrent);
    let mut failed = 0_usize;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(report) => info!(
                "[{}] {} rows loaded, {} skipped from {} files",
                outcome.entity_kind.label(),
                report.load.rows_loaded,
                report.load.rows_skipped,
                report.files
            ),
            Err(err) => {
                failed = failed.saturating_add(1);
                error!("[{}] load failed: {err}", outcome.entity_kind.label());
            }
        }
    }
    Ok(failed)
}

#[cfg(test)]
mod tests;
