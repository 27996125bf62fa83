use std::time::Duration;

use engine_logging::LogSink;
use log::Level;
use tokio_util::sync::CancellationToken;

use crate::extract::extract_title;
use crate::fetch::{HttpTransport, ReqwestTransport};
use crate::{AttemptOutcome, FetchConfig, FetchResult};

/// The suspension between attempts.
#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Fetch-retry engine: up to `max_attempts` sequential attempts with a
/// constant delay in between, then title extraction on the first success.
///
/// Holds no mutable state, so one probe can serve independent calls
/// concurrently; every call starts a fresh attempt counter.
#[derive(Debug, Clone, Default)]
pub struct TitleProbe<T = ReqwestTransport, S = TokioSleeper> {
    transport: T,
    sleeper: S,
}

impl TitleProbe {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: HttpTransport, S: Sleeper> TitleProbe<T, S> {
    pub fn with_parts(transport: T, sleeper: S) -> Self {
        Self { transport, sleeper }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    pub async fn fetch_with_retry(
        &self,
        url: &str,
        config: &FetchConfig,
        log: &dyn LogSink,
    ) -> FetchResult {
        self.run(url, config, log, None).await
    }

    /// Like [`fetch_with_retry`](Self::fetch_with_retry), but stops with
    /// [`FetchResult::Cancelled`] once `cancel` fires. The token is checked
    /// before every attempt and raced against both the in-flight attempt and
    /// the delay, so cancellation never waits for the per-attempt timeout.
    pub async fn fetch_with_retry_cancellable(
        &self,
        url: &str,
        config: &FetchConfig,
        log: &dyn LogSink,
        cancel: &CancellationToken,
    ) -> FetchResult {
        self.run(url, config, log, Some(cancel)).await
    }

    async fn run(
        &self,
        url: &str,
        config: &FetchConfig,
        log: &dyn LogSink,
        cancel: Option<&CancellationToken>,
    ) -> FetchResult {
        let max_attempts = config.max_attempts.max(1);
        log.emit(Level::Info, &format!("Starting scraping for URL: {url}"));

        for attempt in 1..=max_attempts {
            if cancel.is_some_and(|token| token.is_cancelled()) {
                return cancelled(log, attempt - 1);
            }

            log.emit(Level::Debug, &format!("Attempt {attempt}/{max_attempts}"));

            let outcome = match cancel {
                Some(token) => {
                    tokio::select! {
                        _ = token.cancelled() => return cancelled(log, attempt),
                        outcome = self.transport.get(url, config.timeout) => outcome,
                    }
                }
                None => self.transport.get(url, config.timeout).await,
            };

            match outcome {
                AttemptOutcome::Success { body, status } => {
                    log.emit(
                        Level::Debug,
                        &format!("Attempt {attempt}/{max_attempts} succeeded with status {status}"),
                    );
                    return match extract_title(&body) {
                        Some(title) => {
                            log.emit(Level::Info, &format!("Website title found: {title}"));
                            FetchResult::Title(title)
                        }
                        None => {
                            log.emit(Level::Warn, "No title found on the page");
                            FetchResult::NoTitle
                        }
                    };
                }
                AttemptOutcome::Failure { kind, detail } => {
                    log.emit(
                        Level::Warn,
                        &format!("Attempt {attempt}/{max_attempts} failed ({kind}): {detail}"),
                    );
                }
            }

            if attempt == max_attempts {
                break;
            }

            log.emit(
                Level::Info,
                &format!(
                    "Retrying in {:.1} seconds...",
                    config.retry_delay.as_secs_f64()
                ),
            );
            match cancel {
                Some(token) => {
                    tokio::select! {
                        _ = token.cancelled() => return cancelled(log, attempt),
                        _ = self.sleeper.sleep(config.retry_delay) => {}
                    }
                }
                None => self.sleeper.sleep(config.retry_delay).await,
            }
        }

        log.emit(
            Level::Error,
            &format!("Failed to retrieve {url} after {max_attempts} attempts"),
        );
        FetchResult::Failed
    }
}

fn cancelled(log: &dyn LogSink, attempts_made: u32) -> FetchResult {
    log.emit(
        Level::Warn,
        &format!("Fetch cancelled after {attempts_made} attempt(s)"),
    );
    FetchResult::Cancelled
}
