//! Waiting-token acquisition.
//!
//! Uptobox rate-limits direct links with a cooperative handshake: a
//! waiting-token request either returns a usable token, or a delay to honour
//! before asking again. [`WaitingTokenOrchestrator`] drives that handshake
//! for one file code at a time.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta};
use tokio_util::sync::CancellationToken;

use crate::client::Client;
use crate::download::{DownloadProgress, NoProgress};
use crate::error::{Error, Result};
use crate::sleep::{Sleeper, TokioSleeper};
use crate::transport::HttpTransport;
use crate::types::{FileCode, WaitingToken};

/// Polls the waiting-token endpoint until a usable token is issued.
pub struct WaitingTokenOrchestrator<'a, T: HttpTransport, S: Sleeper = TokioSleeper> {
    client: &'a Client<T>,
    sleeper: S,
    max_attempts: Option<u32>,
    cancellation: Option<CancellationToken>,
    progress: Arc<dyn DownloadProgress>,
}

impl<'a, T: HttpTransport> WaitingTokenOrchestrator<'a, T> {
    /// Creates an orchestrator that sleeps on the tokio timer.
    #[must_use]
    pub fn new(client: &'a Client<T>) -> Self {
        Self::with_sleeper(client, TokioSleeper)
    }
}

impl<'a, T: HttpTransport, S: Sleeper> WaitingTokenOrchestrator<'a, T, S> {
    /// Creates an orchestrator with a custom sleeper.
    #[must_use]
    pub fn with_sleeper(client: &'a Client<T>, sleeper: S) -> Self {
        Self {
            client,
            sleeper,
            max_attempts: None,
            cancellation: None,
            progress: Arc::new(NoProgress),
        }
    }

    /// Caps the number of waiting-token requests. Unbounded by default.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Aborts pending waits when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Reports each wait through `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn DownloadProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// Returns a waiting token usable for [`Client::get_download_link`].
    ///
    /// A response with no delay is returned at once, even without a token:
    /// accounts that skip the wait get no token at all. Otherwise the server
    /// delay (plus one second) is slept and the request repeated; the first
    /// token a repeated request yields is returned as-is.
    ///
    /// # Errors
    ///
    /// Propagates client and transport errors unchanged. Returns
    /// [`Error::WaitingTokenExhausted`] when the attempt cap is reached and
    /// [`Error::Cancelled`] when cancelled during a wait.
    pub async fn acquire(&self, file_code: &FileCode, password: Option<&str>) -> Result<WaitingToken> {
        let mut attempts: u32 = 0;
        loop {
            self.check_cancelled()?;
            let waiting = self.client.get_waiting_token(file_code, password).await?;
            attempts += 1;

            // No delay means nothing to wait for, token or not (premium accounts).
            let usable = waiting.delay == 0 || (attempts > 1 && waiting.token.is_some());
            if usable {
                log::debug!("Waiting token for {file_code} ready after {attempts} request(s)");
                return Ok(waiting);
            }

            if self.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(Error::WaitingTokenExhausted {
                    file_code: file_code.to_string(),
                    attempts,
                });
            }

            let wait = waiting.wait_duration();
            let until = deadline(wait);
            log::info!(
                "Got waiting token for {file_code}, awaiting {}s until {}",
                wait.as_secs(),
                until.format("%H:%M:%S")
            );
            self.progress.on_waiting(file_code.as_str(), wait, until);
            self.pause(wait).await?;
        }
    }

    async fn pause(&self, wait: Duration) -> Result<()> {
        match &self.cancellation {
            Some(token) => tokio::select! {
                () = self.sleeper.sleep(wait) => Ok(()),
                () = token.cancelled() => Err(Error::Cancelled),
            },
            None => {
                self.sleeper.sleep(wait).await;
                Ok(())
            }
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

/// Wall-clock time at which a wait of `wait` ends.
fn deadline(wait: Duration) -> DateTime<Local> {
    let now = Local::now();
    TimeDelta::from_std(wait)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(now)
}
