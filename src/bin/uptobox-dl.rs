//! uptobox-dl - download files and public folders from Uptobox.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match uptobox_dl::cli::run().await {
        Ok(stats) if stats.files_failed == 0 => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
