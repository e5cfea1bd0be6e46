//! Streaming of resolved download links to disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use futures::StreamExt;
use reqwest::Url;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::config::DownloadConfig;
use crate::error::{Error, Result};
use crate::fs::{FileSystem, TokioFileSystem};
use crate::stats::{DownloadStatsTracker, FileStats};

/// Trait for receiving progress updates.
///
/// All methods have default no-op implementations for convenience.
pub trait DownloadProgress: Send + Sync {
    /// Called before sleeping for a waiting token.
    fn on_waiting(&self, _file_code: &str, _wait: Duration, _until: DateTime<Local>) {}

    /// Called when a file download starts. `total` is the announced size.
    fn on_file_start(&self, _name: &str, _total: Option<u64>) {}

    /// Called after each chunk with the cumulative bytes written.
    fn on_progress(&self, _name: &str, _transferred: u64, _total: Option<u64>) {}

    /// Called when a file download completes successfully.
    fn on_file_complete(&self, _name: &str, _stats: &FileStats) {}

    /// Called when a file download fails.
    fn on_error(&self, _name: &str, _error: &str) {}
}

/// A null progress implementation that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl DownloadProgress for NoProgress {}

/// What happened to a requested download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The file was written.
    Downloaded {
        /// Final path.
        path: PathBuf,
        /// Transfer statistics.
        stats: FileStats,
    },
    /// The destination already existed and overwriting is disabled.
    Skipped {
        /// Existing path.
        path: PathBuf,
    },
}

/// Returns the `.part` file path for a given final path.
fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// File name a download link is saved under: its last path segment.
#[must_use]
pub fn file_name_from_url(url: &Url) -> Option<String> {
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(str::to_string)
}

/// Writes resolved download links to the output directory.
pub struct Downloader<F: FileSystem = TokioFileSystem> {
    http: reqwest::Client,
    config: DownloadConfig,
    fs: F,
}

impl Downloader<TokioFileSystem> {
    /// Creates a new downloader with the default file system.
    #[must_use]
    pub const fn new(http: reqwest::Client, config: DownloadConfig) -> Self {
        Self {
            http,
            config,
            fs: TokioFileSystem,
        }
    }
}

impl<F: FileSystem> Downloader<F> {
    /// Creates a new downloader with a custom file system implementation.
    #[must_use]
    pub const fn with_fs(http: reqwest::Client, config: DownloadConfig, fs: F) -> Self {
        Self { http, config, fs }
    }

    /// Returns a reference to the download configuration.
    #[must_use]
    pub const fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Destination path for a download link.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Download`] if the link has no file name.
    pub fn output_path(&self, url: &Url) -> Result<PathBuf> {
        let name = file_name_from_url(url)
            .ok_or_else(|| Error::Download(format!("no file name in {url}")))?;
        Ok(self.config.output_dir.join(name))
    }

    /// Ensures the parent directory exists for a file path.
    async fn ensure_parent_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.fs.create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Downloads `url` using atomic `.part` file semantics.
    ///
    /// Writes to `{path}.part` during download, then renames to `{path}` on
    /// success. On error, cleans up the `.part` file if `cleanup_on_error`
    /// is enabled. Existing files are skipped unless `force_overwrite`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server answers with an
    /// error status, the file cannot be written, or the download is
    /// cancelled.
    pub async fn download(
        &self,
        url: &Url,
        progress: &Arc<dyn DownloadProgress>,
        cancellation_token: Option<CancellationToken>,
    ) -> Result<DownloadOutcome> {
        let path = self.output_path(url)?;
        if !self.config.force_overwrite && self.fs.file_exists(&path).await {
            log::info!("Skipping {}, already exists", path.display());
            return Ok(DownloadOutcome::Skipped { path });
        }

        self.ensure_parent_dir(&path).await?;
        let pp = part_path(&path);
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        let transfer = self.stream_to(url, &pp, &name, progress);
        let result = match cancellation_token {
            Some(token) => tokio::select! {
                res = transfer => res,
                () = token.cancelled() => Err(Error::Cancelled),
            },
            None => transfer.await,
        };

        match result {
            Ok(stats) => {
                self.fs.rename_file(&pp, &path).await?;
                progress.on_file_complete(&name, &stats);
                Ok(DownloadOutcome::Downloaded { path, stats })
            }
            Err(e) => {
                if self.config.cleanup_on_error {
                    let _ = self.fs.remove_file(&pp).await;
                }
                if !matches!(e, Error::Cancelled) {
                    progress.on_error(&name, &e.to_string());
                }
                Err(e)
            }
        }
    }

    async fn stream_to(
        &self,
        url: &Url,
        part: &Path,
        name: &str,
        progress: &Arc<dyn DownloadProgress>,
    ) -> Result<FileStats> {
        let response = self.http.get(url.clone()).send().await?.error_for_status()?;
        let total = response.content_length();
        progress.on_file_start(name, total);

        let mut file = self.fs.create_file(part).await?;
        let stats = DownloadStatsTracker::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            let transferred = stats.record_bytes(chunk.len() as u64);
            progress.on_progress(name, transferred, total);
        }
        file.flush().await?;

        if let Some(expected) = total
            && stats.transferred() != expected
        {
            return Err(Error::Download(format!(
                "{name}: received {} of {expected} bytes",
                stats.transferred()
            )));
        }
        Ok(stats.into_file_stats())
    }
}

/// Builds the HTTP client used for file transfers.
///
/// Only connecting is bounded; transfers of large files may take hours.
///
/// # Errors
///
/// Returns an error if the client cannot be built.
pub fn build_download_client(connect_timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .tcp_keepalive(Duration::from_secs(30))
        .build()
}
