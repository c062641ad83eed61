//! Resumable archive download
//!
//! Archives are streamed into `<archive>.part` in reads of `chunk_size`
//! bytes. A retry picks up from the partial file's length with a range
//! request; a server that answers with the whole body instead restarts the
//! file from zero. Once the stream ends the partial file is checked against
//! the expected size and checksum and only then renamed to its final name.

use crate::adapters::confluence::ExportService;
use crate::core::cancel::{with_timeout, CancelSignal};
use crate::core::export::progress::ProgressTracker;
use crate::core::pool::ConnectionPool;
use crate::core::verification::verify_file;
use crate::domain::{ExportError, ExportJob};
use futures::StreamExt;
use std::collections::VecDeque;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio_util::io::StreamReader;

/// A verified archive at its final path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub path: PathBuf,
    pub bytes: u64,
    pub checksum_verified: bool,
}

/// What one call to [`ChunkedDownloader::download`] transferred
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Bytes written by this call, excluding a resumed prefix
    pub bytes: u64,
    /// Chunk reads taken from the body
    pub reads: u64,
}

#[derive(Clone)]
pub struct ChunkedDownloader {
    service: Arc<dyn ExportService>,
    pool: ConnectionPool,
    tracker: Arc<ProgressTracker>,
    chunk_size: usize,
    timeout: Duration,
}

impl ChunkedDownloader {
    pub fn new(
        service: Arc<dyn ExportService>,
        pool: ConnectionPool,
        tracker: Arc<ProgressTracker>,
        chunk_size: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            service,
            pool,
            tracker,
            chunk_size: chunk_size.max(1),
            timeout,
        }
    }

    /// Transfers the archive of `job` into its partial file
    ///
    /// Resumes from whatever is already on disk. Every read fills a buffer of
    /// `chunk_size` bytes unless the body ends first. On return
    /// `job.bytes_downloaded` reflects the bytes written, including after a
    /// failure, so a retry can resume. An archive of unknown size, or a stream
    /// that ends short, overruns the expected size or disagrees with it, is an
    /// `Integrity` error.
    pub async fn download(
        &self,
        job: &mut ExportJob,
        cancel: &CancelSignal,
    ) -> Result<TransferStats, ExportError> {
        let url = job
            .download_url
            .clone()
            .ok_or_else(|| ExportError::JobFailed("No download URL for job".to_string()))?;

        let mut offset = partial_len(&job.partial_path).await?;
        if let Some(expected) = job.expected_size {
            if offset == expected {
                job.bytes_downloaded = offset;
                tracing::debug!(space_key = %job.space_key, bytes = offset, "Partial file already complete");
                return Ok(TransferStats::default());
            }
            if offset > expected {
                tracing::warn!(
                    space_key = %job.space_key,
                    partial_bytes = offset,
                    expected_bytes = expected,
                    "Partial file larger than archive, restarting"
                );
                offset = 0;
            }
        }
        job.bytes_downloaded = offset;

        let _lease = self.pool.acquire(cancel).await?;
        let stream = cancel
            .guard(with_timeout(
                self.timeout,
                "archive download",
                self.service.download_archive(&url, offset),
            ))
            .await?;

        let resumed = offset > 0 && stream.range_honored;
        if offset > 0 && !stream.range_honored {
            tracing::warn!(
                space_key = %job.space_key,
                offset = offset,
                "Server ignored range request, restarting download"
            );
        }
        let mut written = if resumed { offset } else { 0 };
        job.bytes_downloaded = written;

        let expected = match (job.expected_size, stream.total_size) {
            (Some(expected), Some(total)) if expected != total => {
                return Err(ExportError::Integrity(format!(
                    "Server reports {total} bytes but the export reported {expected}"
                )));
            }
            (Some(expected), _) => expected,
            (None, Some(total)) => {
                self.tracker.add_expected(total);
                job.expected_size = Some(total);
                total
            }
            (None, None) => {
                return Err(ExportError::Integrity(
                    "Server did not report the archive size".to_string(),
                ));
            }
        };

        tracing::info!(
            space_key = %job.space_key,
            offset = written,
            expected_bytes = expected,
            resumed = resumed,
            "Downloading archive"
        );

        let file = open_partial(&job.partial_path, resumed).await?;
        let mut writer = BufWriter::new(file);
        let mut reader = StreamReader::new(
            stream
                .body
                .map(|chunk| chunk.map(VecDeque::from).map_err(io::Error::other)),
        );
        let mut buf = vec![0u8; self.chunk_size];
        let mut stats = TransferStats::default();

        let transfer = loop {
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => break Err(ExportError::Cancelled),
                read = tokio::time::timeout(self.timeout, fill_chunk(&mut reader, &mut buf)) => read,
            };

            let filled = match read {
                Err(_) => {
                    break Err(ExportError::Transient(format!(
                        "Download stalled: chunk not received within {}s",
                        self.timeout.as_secs_f64()
                    )))
                }
                Ok(Err(e)) => break Err(body_error(e)),
                Ok(Ok(0)) => break Ok(()),
                Ok(Ok(filled)) => filled,
            };
            stats.reads += 1;

            let len = filled as u64;
            if written + len > expected {
                break Err(ExportError::Integrity(format!(
                    "Archive stream exceeded expected size of {expected} bytes"
                )));
            }
            if let Err(e) = writer.write_all(&buf[..filled]).await {
                break Err(ExportError::from(e));
            }
            written += len;
            stats.bytes += len;
            job.bytes_downloaded = written;
            self.tracker.add_bytes(len);
        };

        let flushed = finish_file(writer).await;
        transfer?;
        flushed?;

        if written < expected {
            return Err(ExportError::Integrity(format!(
                "Archive stream ended at {written} of {expected} bytes"
            )));
        }

        tracing::debug!(
            space_key = %job.space_key,
            bytes = written,
            reads = stats.reads,
            "Archive transfer finished"
        );
        Ok(stats)
    }

    /// Verifies the partial file of `job` and moves it to the final path
    ///
    /// # Errors
    ///
    /// `Integrity` on a size or checksum mismatch, `Storage` when the file
    /// cannot be read or renamed.
    pub async fn verify(&self, job: &mut ExportJob) -> Result<DownloadOutcome, ExportError> {
        let size = tokio::fs::metadata(&job.partial_path).await?.len();

        match job.expected_size {
            Some(expected) if size == expected => {}
            Some(expected) => {
                return Err(ExportError::Integrity(format!(
                    "Archive is {size} bytes, expected {expected}"
                )));
            }
            None => {
                return Err(ExportError::Integrity(format!(
                    "Archive size unknown, cannot verify {size} downloaded bytes"
                )));
            }
        }

        let checksum_verified = match &job.checksum {
            Some(checksum) => {
                if let Err(actual) = verify_file(checksum, &job.partial_path).await? {
                    return Err(ExportError::Integrity(format!(
                        "Checksum mismatch: expected {checksum}, got {actual}"
                    )));
                }
                true
            }
            None => false,
        };

        tokio::fs::rename(&job.partial_path, &job.final_path)
            .await
            .map_err(|e| {
                ExportError::Storage(format!(
                    "Failed to move archive to {}: {e}",
                    job.final_path.display()
                ))
            })?;

        Ok(DownloadOutcome {
            path: job.final_path.clone(),
            bytes: size,
            checksum_verified,
        })
    }

    /// Removes the partial file of `job` so the next attempt starts over
    pub async fn discard_partial(&self, job: &mut ExportJob) -> Result<(), ExportError> {
        job.reset_download();
        match tokio::fs::remove_file(&job.partial_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

async fn partial_len(path: &Path) -> Result<u64, ExportError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

async fn open_partial(path: &Path, append: bool) -> Result<File, ExportError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut options = OpenOptions::new();
    if append {
        options.append(true);
    } else {
        options.write(true).create(true).truncate(true);
    }
    Ok(options.open(path).await?)
}

/// Reads until `buf` is full or the body ends, returning the bytes read
async fn fill_chunk<R>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Recovers the service error carried through the body reader
fn body_error(e: io::Error) -> ExportError {
    let message = e.to_string();
    match e.into_inner().map(|inner| inner.downcast::<ExportError>()) {
        Some(Ok(inner)) => *inner,
        _ => ExportError::Transient(format!("download interrupted: {message}")),
    }
}

async fn finish_file(mut writer: BufWriter<File>) -> Result<(), ExportError> {
    writer.flush().await?;
    writer.into_inner().sync_all().await?;
    Ok(())
}
