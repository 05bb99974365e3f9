use std::io;
use std::time::Instant;

use camino::Utf8Path;
use futures_util::{StreamExt, stream};
use log::{debug, warn};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::error::AttemptError;
use super::progress::{DownloadProgress, ProgressReporter};
use super::source::{ArchiveBody, ArchiveSource};
use super::util::pause;
use super::{ArchiveRef, DownloadReport, RetrievalError, RetrievalSettings, TransportError};

/// Outcome of a single attempt that did not produce a verified archive.
enum AttemptFailure {
    /// The publisher misbehaved; try again from scratch.
    Retry(AttemptError),
    /// The local filesystem failed; retrying cannot help.
    Abort(io::Error),
}

/// Download one archive into `destination`, retrying until the written size
/// matches the declared size or the attempt budget runs out.
///
/// The file is named after [`ArchiveRef::local_name`]. Any partial file left
/// by an earlier attempt is removed before the next one starts, so every
/// attempt begins from byte zero.
///
/// # Errors
///
/// Returns [`RetrievalError::DownloadExhausted`] when `settings.max_retry`
/// attempts all fail, and an I/O variant when the destination cannot be
/// prepared or written.
///
/// # Examples
/// ```no_run
/// # use camino::Utf8Path;
/// # use cnpj_core::EntityKind;
/// # use cnpj_data::retrieval::{
/// #     ArchiveRef, HttpArchiveSource, LogProgress, RetrievalSettings, fetch_archive,
/// # };
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let source = HttpArchiveSource::new("http://200.152.38.155/CNPJ/")?;
/// let archive = ArchiveRef::new(
///     "http://200.152.38.155/CNPJ/Cnaes.zip",
///     "Cnaes.zip",
///     EntityKind::Cnae,
/// );
/// let report = fetch_archive(
///     &source,
///     &archive,
///     Utf8Path::new("download"),
///     &RetrievalSettings::default(),
///     &LogProgress,
/// )
/// .await?;
/// assert_eq!(report.output_path, Utf8Path::new("download/Cnaes.zip"));
/// # Ok(())
/// # }
/// ```
pub async fn fetch_archive<S, P>(
    source: &S,
    archive: &ArchiveRef,
    destination: &Utf8Path,
    settings: &RetrievalSettings,
    progress: &P,
) -> Result<DownloadReport, RetrievalError>
where
    S: ArchiveSource + ?Sized,
    P: ProgressReporter + ?Sized,
{
    let outcome = fetch_with_retries(source, archive, destination, settings, progress).await;
    progress.finished(archive, outcome.as_ref());
    outcome
}

/// Download every archive in `archives`, keeping at most `workers` transfers
/// in flight.
///
/// Each archive carries its own retry budget and one failure never cancels
/// the others. Outcomes are returned in the order of `archives`.
pub async fn fetch_all<S, P>(
    source: &S,
    archives: &[ArchiveRef],
    destination: &Utf8Path,
    settings: &RetrievalSettings,
    progress: &P,
    workers: usize,
) -> Vec<Result<DownloadReport, RetrievalError>>
where
    S: ArchiveSource + ?Sized,
    P: ProgressReporter + ?Sized,
{
    let mut outcomes: Vec<(usize, Result<DownloadReport, RetrievalError>)> =
        stream::iter(archives.iter().enumerate())
            .map(|(position, archive)| async move {
                let outcome = fetch_archive(source, archive, destination, settings, progress).await;
                (position, outcome)
            })
            .buffer_unordered(workers.max(1))
            .collect()
            .await;
    outcomes.sort_by_key(|(position, _)| *position);
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}

async fn fetch_with_retries<S, P>(
    source: &S,
    archive: &ArchiveRef,
    destination: &Utf8Path,
    settings: &RetrievalSettings,
    progress: &P,
) -> Result<DownloadReport, RetrievalError>
where
    S: ArchiveSource + ?Sized,
    P: ProgressReporter + ?Sized,
{
    cnpj_fs::ensure_dir(destination).map_err(|source| RetrievalError::CreateDir {
        path: destination.to_path_buf(),
        source,
    })?;
    let output_path = destination.join(&archive.local_name);
    let label = archive.entity_kind.label();
    let max_retry = settings.max_retry.max(1);
    let mut attempt: u32 = 0;

    while attempt < max_retry {
        attempt = attempt.saturating_add(1);
        remove_partial(&output_path)?;
        match download_once(source, archive, &output_path, attempt, settings, progress).await {
            Ok(bytes_written) => {
                return Ok(DownloadReport {
                    archive: archive.clone(),
                    bytes_written,
                    attempts: attempt,
                    output_path,
                });
            }
            Err(AttemptFailure::Abort(source)) => {
                if let Err(err) = cnpj_fs::remove_file_if_exists(&output_path) {
                    warn!("[{label}] could not remove {output_path}: {err}");
                }
                return Err(RetrievalError::WriteArchive {
                    path: output_path,
                    source,
                });
            }
            Err(AttemptFailure::Retry(err)) => {
                warn!(
                    "[{label}] attempt {attempt}/{max_retry} for {} failed: {err}",
                    archive.local_name
                );
                if attempt < max_retry {
                    pause(settings.retry_delay).await;
                }
            }
        }
    }

    remove_partial(&output_path)?;
    Err(RetrievalError::DownloadExhausted {
        url: archive.url.to_string(),
        attempts: attempt,
    })
}

fn remove_partial(path: &Utf8Path) -> Result<(), RetrievalError> {
    let removed =
        cnpj_fs::remove_file_if_exists(path).map_err(|source| RetrievalError::RemovePartial {
            path: path.to_path_buf(),
            source,
        })?;
    if removed {
        debug!("removed partial archive {path}");
    }
    Ok(())
}

async fn download_once<S, P>(
    source: &S,
    archive: &ArchiveRef,
    output_path: &Utf8Path,
    attempt: u32,
    settings: &RetrievalSettings,
    progress: &P,
) -> Result<u64, AttemptFailure>
where
    S: ArchiveSource + ?Sized,
    P: ProgressReporter + ?Sized,
{
    let ArchiveBody {
        declared_len,
        mut reader,
    } = source
        .open_archive(&archive.url)
        .await
        .map_err(|err| AttemptFailure::Retry(err.into()))?;
    progress.started(archive, attempt, declared_len);

    let mut file = File::create(output_path.as_std_path())
        .await
        .map_err(AttemptFailure::Abort)?;
    let mut buffer = vec![0_u8; settings.block_size.max(1)];
    let mut bytes_written: u64 = 0;
    let started = Instant::now();

    loop {
        let read = reader.read(&mut buffer).await.map_err(|source| {
            AttemptFailure::Retry(AttemptError::Transport(TransportError::Network {
                url: archive.url.to_string(),
                source,
            }))
        })?;
        if read == 0 {
            break;
        }
        let block = buffer.get(..read).unwrap_or_default();
        file.write_all(block).await.map_err(AttemptFailure::Abort)?;
        bytes_written = bytes_written.saturating_add(u64::try_from(read).unwrap_or(u64::MAX));
        progress.advanced(
            archive,
            &DownloadProgress {
                attempt,
                bytes_written,
                bytes_expected: declared_len,
                elapsed: started.elapsed(),
            },
        );
    }
    file.flush().await.map_err(AttemptFailure::Abort)?;

    match declared_len {
        Some(expected) if expected != bytes_written => {
            Err(AttemptFailure::Retry(AttemptError::SizeMismatch {
                expected,
                actual: bytes_written,
            }))
        }
        Some(_) => Ok(bytes_written),
        None => {
            warn!(
                "[{}] {} has no declared size; accepting {bytes_written} bytes unverified",
                archive.entity_kind.label(),
                archive.local_name
            );
            Ok(bytes_written)
        }
    }
}
