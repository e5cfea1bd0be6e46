//! Progress bar and summary reporting for CLI downloads.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Local};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::{DownloadProgress, FileInfo, FileStats, SessionStats, format_bytes, format_duration};

const SEPARATOR: &str = "────────────────────────────────────────────────────────────";

/// Creates a progress bar for a single file download.
///
/// Without a known size the bar degrades to a byte-counting spinner.
pub fn make_progress_bar(total: Option<u64>, name: &str) -> ProgressBar {
    let bar = match total {
        Some(size) => {
            let bar = ProgressBar::new(size);
            bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) @ {bytes_per_sec} - {msg}",
                )
                .expect("progress template is valid")
                .progress_chars("━━╌"),
            );
            bar
        }
        None => {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {bytes} @ {bytes_per_sec} - {msg}")
                    .expect("spinner template is valid"),
            );
            bar
        }
    };
    bar.set_message(name.to_string());
    bar.enable_steady_tick(Duration::from_millis(250));
    bar
}

/// Console progress reporter: one bar for the file being downloaded.
#[derive(Default)]
pub struct CliProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    /// Creates a reporter with no active bar.
    pub fn new() -> Self {
        Self::default()
    }

    fn take_bar(&self) -> Option<ProgressBar> {
        self.bar.lock().ok().and_then(|mut bar| bar.take())
    }
}

impl DownloadProgress for CliProgress {
    fn on_waiting(&self, file_code: &str, wait: Duration, until: DateTime<Local>) {
        println!(
            "  {file_code}: got waiting token, awaiting {} - until {}",
            format_duration(wait),
            until.format("%H:%M:%S")
        );
    }

    fn on_file_start(&self, name: &str, total: Option<u64>) {
        if let Ok(mut bar) = self.bar.lock() {
            *bar = Some(make_progress_bar(total, name));
        }
    }

    fn on_progress(&self, _name: &str, transferred: u64, _total: Option<u64>) {
        if let Ok(bar) = self.bar.lock()
            && let Some(bar) = bar.as_ref()
        {
            bar.set_position(transferred);
        }
    }

    fn on_file_complete(&self, name: &str, stats: &FileStats) {
        if let Some(bar) = self.take_bar() {
            bar.finish_and_clear();
        }
        println!(
            "  {} - {} in {} ({}/s avg)",
            style(name).green(),
            format_bytes(stats.size),
            format_duration(stats.elapsed),
            format_bytes(stats.average_speed),
        );
    }

    fn on_error(&self, name: &str, error: &str) {
        if let Some(bar) = self.take_bar() {
            bar.abandon();
        }
        eprintln!("  {} {name}: {error}", style("error").red());
    }
}

/// Prints a coloured warning line.
pub fn warn(message: &str) {
    eprintln!("{}", style(message).yellow());
}

/// Prints name and size for the files about to be downloaded.
pub fn print_file_list(infos: &[FileInfo]) {
    if infos.is_empty() {
        return;
    }

    println!("\n{SEPARATOR}");
    println!("Files to download:");
    println!("{SEPARATOR}");

    let mut total_size = 0;
    for info in infos {
        match (&info.file_name, info.file_size) {
            (Some(name), Some(size)) => {
                total_size += size;
                println!("  {} {name} ({})", info.file_code, format_bytes(size));
            }
            (Some(name), None) => println!("  {} {name}", info.file_code),
            _ => println!("  {} {}", info.file_code, style("(unavailable)").yellow()),
        }
    }

    println!("{SEPARATOR}");
    println!("  {} file(s), {} total", infos.len(), format_bytes(total_size));
    println!("{SEPARATOR}\n");
}

/// Prints a summary of download statistics.
pub fn print_summary(stats: &SessionStats) {
    if stats.files_downloaded == 0 && stats.files_skipped == 0 && stats.files_failed == 0 {
        return;
    }

    println!("\n{SEPARATOR}");
    println!("Download Summary");
    println!("{SEPARATOR}");

    if stats.files_downloaded > 0 {
        println!("  Files downloaded:  {}", stats.files_downloaded);
        println!("  Total size:        {}", format_bytes(stats.total_bytes));
        println!("  Total time:        {}", format_duration(stats.elapsed));
        println!(
            "  Average speed:     {}/s",
            format_bytes(stats.average_speed())
        );
        println!("  Peak speed:        {}/s", format_bytes(stats.peak_speed));
    }

    if stats.files_skipped > 0 {
        println!("  Files skipped:     {}", stats.files_skipped);
    }

    if stats.files_failed > 0 {
        println!(
            "  Files failed:      {}",
            style(stats.files_failed).red()
        );
    }

    println!("{SEPARATOR}");
}
