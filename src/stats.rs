//! Download statistics types.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Statistics for a single file download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStats {
    /// Bytes written to disk.
    pub size: u64,
    /// Time taken to download the file.
    pub elapsed: Duration,
    /// Average download speed in bytes per second.
    pub average_speed: u64,
    /// Peak download speed in bytes per second.
    pub peak_speed: u64,
}

/// Statistics for a whole run.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// Number of files successfully downloaded.
    pub files_downloaded: usize,
    /// Number of files skipped (already existed).
    pub files_skipped: usize,
    /// Number of files that could not be resolved or downloaded.
    pub files_failed: usize,
    /// Total bytes downloaded.
    pub total_bytes: u64,
    /// Total elapsed time for the session.
    pub elapsed: Duration,
    /// Highest per-file peak speed in bytes per second.
    pub peak_speed: u64,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStats {
    /// Creates a new empty session stats.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            files_downloaded: 0,
            files_skipped: 0,
            files_failed: 0,
            total_bytes: 0,
            elapsed: Duration::ZERO,
            peak_speed: 0,
        }
    }

    /// Returns the average download speed in bytes per second.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn average_speed(&self) -> u64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.total_bytes as f64 / secs) as u64
        } else {
            0
        }
    }
}

/// Tracks bytes and speed while a file is being streamed.
pub struct DownloadStatsTracker {
    start_time: Instant,
    downloaded: AtomicU64,
    peak_speed: AtomicU64,
}

impl Default for DownloadStatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadStatsTracker {
    /// Starts tracking now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            downloaded: AtomicU64::new(0),
            peak_speed: AtomicU64::new(0),
        }
    }

    /// Records downloaded bytes and returns the total transferred so far.
    pub fn record_bytes(&self, bytes: u64) -> u64 {
        let total = self.downloaded.fetch_add(bytes, Ordering::Relaxed) + bytes;
        self.update_speed(self.average_speed());
        total
    }

    /// Updates the peak speed.
    pub fn update_speed(&self, speed: u64) {
        self.peak_speed.fetch_max(speed, Ordering::Relaxed);
    }

    /// Returns the number of bytes recorded.
    #[must_use]
    pub fn transferred(&self) -> u64 {
        self.downloaded.load(Ordering::Relaxed)
    }

    /// Returns the elapsed time since the download started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns the average speed in bytes per second.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn average_speed(&self) -> u64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            (self.transferred() as f64 / secs) as u64
        } else {
            0
        }
    }

    /// Returns the peak speed recorded.
    #[must_use]
    pub fn peak_speed(&self) -> u64 {
        self.peak_speed.load(Ordering::Relaxed)
    }

    /// Converts this tracker into final file statistics.
    #[must_use]
    pub fn into_file_stats(self) -> FileStats {
        FileStats {
            size: self.transferred(),
            elapsed: self.elapsed(),
            average_speed: self.average_speed(),
            peak_speed: self.peak_speed(),
        }
    }
}

/// Builder for accumulating session statistics during a run.
pub struct SessionStatsBuilder {
    files_downloaded: usize,
    files_skipped: usize,
    files_failed: usize,
    total_bytes: u64,
    start_time: Instant,
    peak_speed: u64,
}

impl Default for SessionStatsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStatsBuilder {
    /// Creates a new session stats builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            files_downloaded: 0,
            files_skipped: 0,
            files_failed: 0,
            total_bytes: 0,
            start_time: Instant::now(),
            peak_speed: 0,
        }
    }

    /// Records a completed file download.
    pub fn add_download(&mut self, file_stats: &FileStats) {
        self.files_downloaded += 1;
        self.total_bytes += file_stats.size;
        self.peak_speed = self.peak_speed.max(file_stats.peak_speed);
    }

    /// Records a file skipped because it already exists.
    pub const fn add_skipped(&mut self) {
        self.files_skipped += 1;
    }

    /// Records a file that failed.
    pub const fn add_failed(&mut self) {
        self.files_failed += 1;
    }

    /// Builds the final session statistics.
    #[must_use]
    pub fn build(self) -> SessionStats {
        SessionStats {
            files_downloaded: self.files_downloaded,
            files_skipped: self.files_skipped,
            files_failed: self.files_failed,
            total_bytes: self.total_bytes,
            elapsed: self.start_time.elapsed(),
            peak_speed: self.peak_speed,
        }
    }
}
