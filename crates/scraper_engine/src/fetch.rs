use std::error::Error as _;
use std::io;
use std::time::Duration;

use engine_logging::engine_debug;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;

use crate::decode::decode_html;
use crate::{AttemptOutcome, FailureKind};

const DEFAULT_MAX_BODY_BYTES: u64 = 5 * 1024 * 1024;

/// One request/response cycle. Implementations must perform exactly one
/// network call per invocation.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> AttemptOutcome;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    user_agent: Option<String>,
    max_body_bytes: u64,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self {
            user_agent: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_agent(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: Some(user_agent.into()),
            ..Self::default()
        }
    }

    /// Stops reading the body after `max_bytes`. The title sits in the
    /// document head, so the prefix is decoded instead of failing.
    pub fn max_body_bytes(mut self, max_bytes: u64) -> Self {
        self.max_body_bytes = max_bytes;
        self
    }

    fn build_client(&self, timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        builder.build()
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, timeout: Duration) -> AttemptOutcome {
        let parsed = match reqwest::Url::parse(url) {
            Ok(parsed) => parsed,
            Err(err) => {
                return AttemptOutcome::failure(
                    FailureKind::OtherRequestError,
                    format!("invalid url {url:?}: {err}"),
                )
            }
        };
        let client = match self.build_client(timeout) {
            Ok(client) => client,
            Err(err) => return map_reqwest_error(err),
        };

        let response = match client.get(parsed).send().await {
            Ok(response) => response,
            Err(err) => return map_reqwest_error(err),
        };

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return AttemptOutcome::failure(
                FailureKind::HttpStatusError(status.as_u16()),
                status.to_string(),
            );
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let limit = self.max_body_bytes;
        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => return map_reqwest_error(err),
            };
            let room = usize::try_from(limit.saturating_sub(bytes.len() as u64)).unwrap_or(usize::MAX);
            if chunk.len() >= room {
                bytes.extend_from_slice(&chunk[..room]);
                engine_debug!("Body of {} truncated at {} bytes", url, limit);
                break;
            }
            bytes.extend_from_slice(&chunk);
        }

        let decoded = decode_html(&bytes, content_type.as_deref());
        if decoded.lossy {
            engine_debug!(
                "Body of {} had malformed {} sequences; decoded lossily",
                url,
                decoded.encoding_label
            );
        }

        AttemptOutcome::Success {
            body: decoded.html,
            status: status.as_u16(),
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> AttemptOutcome {
    let kind = if err.is_timeout() {
        FailureKind::Timeout
    } else if err.is_connect() || is_connection_drop(&err) {
        FailureKind::ConnectionError
    } else {
        FailureKind::OtherRequestError
    };
    AttemptOutcome::failure(kind, error_chain(&err))
}

/// Reset/refused sockets surface as an io::Error somewhere in the chain; a
/// peer that closes before answering surfaces as a hyper error instead.
fn is_connection_drop(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        if let Some(hyper_err) = cause.downcast_ref::<hyper::Error>() {
            if hyper_err.is_incomplete_message() || hyper_err.is_closed() {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

// reqwest's top-level message is terse ("error sending request"); the
// causes carry the useful part.
fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
