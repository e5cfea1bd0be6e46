//! uptobox-dl - A library for downloading files from Uptobox.
//!
//! This library resolves Uptobox links (single files or shared folders) into
//! direct download URLs through the Uptobox API, and streams them to disk.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use uptobox_dl::{
//!     ApiConfig, Client, DownloadConfig, DownloadProgress, Downloader, NoProgress,
//!     WaitingTokenOrchestrator, collect_file_codes,
//! };
//!
//! # async fn example() -> uptobox_dl::Result<()> {
//! let client = Client::new(&ApiConfig::default().with_token("my-token"))?;
//! let collected = collect_file_codes(&client, ["https://uptobox.com/m5f0ce9h197j"]).await?;
//!
//! let downloader = Downloader::new(reqwest::Client::new(), DownloadConfig::default());
//! let progress: Arc<dyn DownloadProgress> = Arc::new(NoProgress);
//! for code in &collected.file_codes {
//!     let token = WaitingTokenOrchestrator::new(&client).acquire(code, None).await?;
//!     let link = client.get_download_link(code, &token).await?;
//!     downloader.download(&link, &progress, None).await?;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod client;
pub mod collect;
pub mod config;
pub mod download;
pub mod envelope;
pub mod error;
pub mod folder;
pub mod format;
pub mod fs;
pub mod link;
pub mod retry;
pub mod sleep;
pub mod stats;
pub mod transport;
pub mod types;
pub mod waiting;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export main types for convenience
pub use client::Client;
pub use collect::{CollectedCodes, collect_file_codes};
pub use config::{ApiConfig, AppConfig, DownloadConfig, RetryConfig};
pub use download::{DownloadOutcome, DownloadProgress, Downloader, NoProgress};
pub use envelope::{ResponseEnvelope, StatusClass};
pub use error::{ClientError, Error, Result};
pub use folder::{PAGE_SIZE, enumerate_folder};
pub use format::{format_bytes, format_duration};
pub use fs::{FileSystem, TokioFileSystem};
pub use link::{LinkType, classify_link, parse_file_code, parse_folder_reference};
pub use retry::{RetryOn, RetryPolicy};
pub use sleep::{Sleeper, TokioSleeper};
pub use stats::{DownloadStatsTracker, FileStats, SessionStats, SessionStatsBuilder};
pub use transport::{HttpTransport, ReqwestTransport};
pub use types::{FileCode, FileInfo, FolderItem, FolderPage, FolderReference, WaitingToken};
pub use waiting::WaitingTokenOrchestrator;
