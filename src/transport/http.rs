//! HTTP range-request reader
//!
//! Requests `bytes=<offset-1>-` so the first byte of a partial response is
//! one the tail has already consumed. Seeing a 206 therefore proves the
//! range was honored, and that byte is dropped through `skip_bytes = 1`.
//! A 200 means the server ignored the range: the whole file comes back and
//! the first `offset` bytes are skipped instead.

use super::Transport;
use crate::config::BasicAuth;
use crate::error::{Error, Result};
use crate::types::{FetchResult, Offset};
use async_trait::async_trait;
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Configuration for the HTTP reader
#[derive(Debug, Clone)]
pub struct HttpReaderConfig {
    /// URL of the tailed file
    pub url: Url,
    /// Request timeout
    pub timeout: Duration,
    /// Basic auth credentials
    pub basic_auth: Option<BasicAuth>,
    /// User agent string
    pub user_agent: String,
}

impl HttpReaderConfig {
    /// Create a new config builder
    pub fn builder(url: Url) -> HttpReaderConfigBuilder {
        HttpReaderConfigBuilder {
            config: HttpReaderConfig {
                url,
                timeout: Duration::from_secs(crate::config::DEFAULT_REQUEST_TIMEOUT_SECS),
                basic_auth: None,
                user_agent: format!("{}/{}", crate::NAME, crate::VERSION),
            },
        }
    }
}

/// Builder for HTTP reader config
pub struct HttpReaderConfigBuilder {
    config: HttpReaderConfig,
}

impl HttpReaderConfigBuilder {
    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set basic auth credentials
    pub fn basic_auth(mut self, auth: Option<BasicAuth>) -> Self {
        self.config.basic_auth = auth;
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpReaderConfig {
        self.config
    }
}

/// Reads new bytes of a file served over HTTP
pub struct HttpReader {
    client: Client,
    config: HttpReaderConfig,
    /// Set once the server has been seen ignoring a Range header
    range_unsupported: bool,
    /// Total file length from the last response in this process
    last_total: Option<u64>,
}

impl HttpReader {
    /// Create a reader from config
    pub fn new(config: HttpReaderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            config,
            range_unsupported: false,
            last_total: None,
        })
    }

    /// Whether the server has been seen ignoring range requests
    pub fn range_unsupported(&self) -> bool {
        self.range_unsupported
    }

    async fn send(&self, offset: Offset) -> Result<Response> {
        let mut req = self.client.get(self.config.url.clone());

        if offset > 0 {
            req = req.header(RANGE, format!("bytes={}-", offset - 1));
        }

        if let Some(auth) = &self.config.basic_auth {
            req = req.basic_auth(&auth.username, auth.password.as_ref());
        }

        req.send().await.map_err(|e| self.classify(e))
    }

    fn classify(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                timeout_ms: self.config.timeout.as_millis() as u64,
            }
        } else {
            Error::Http(e)
        }
    }

    /// Reset in-process length tracking and report truncation
    fn truncated(&mut self) -> FetchResult {
        self.last_total = None;
        FetchResult::truncated()
    }

    /// Check the reported total length against the previous one
    fn total_shrank(&mut self, total: Option<u64>) -> bool {
        let Some(total) = total else {
            return false;
        };

        if let Some(previous) = self.last_total {
            if total < previous {
                info!(
                    "Total length decreased (old {previous}, new {total}), file was probably truncated. Resetting state."
                );
                return true;
            }
        }

        self.last_total = Some(total);
        false
    }
}

#[async_trait]
impl Transport for HttpReader {
    async fn fetch(&mut self, offset: Offset) -> Result<FetchResult> {
        let response = self.send(offset).await?;
        let status = response.status();

        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            info!("Server returned 416, file was probably truncated. Resetting state.");
            return Ok(self.truncated());
        }

        if status != StatusCode::OK && status != StatusCode::PARTIAL_CONTENT {
            return Err(Error::unexpected_status(status.as_u16()));
        }

        let partial = status == StatusCode::PARTIAL_CONTENT;
        if partial && offset == 0 {
            return Err(Error::UnexpectedPartialContent);
        }

        let content_range_total = if partial {
            total_from_content_range(&response)
        } else {
            None
        };

        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        let skip_bytes = if offset == 0 {
            0
        } else if partial {
            // Assumes the server starts the body at the requested byte
            if body.first().is_some_and(|&b| b != b'\n') {
                warn!(
                    "First byte of partial response at offset {} is not a newline",
                    offset - 1
                );
            }
            1
        } else {
            if !self.range_unsupported {
                warn!("Server doesn't support range requests.");
                self.range_unsupported = true;
            }
            if (body.len() as u64) < offset {
                info!(
                    "File is shorter than offset ({} < {offset}), file was probably truncated. Resetting state.",
                    body.len()
                );
                return Ok(self.truncated());
            }
            offset as usize
        };

        let total = if partial {
            content_range_total
        } else {
            Some(body.len() as u64)
        };
        if self.total_shrank(total) {
            return Ok(self.truncated());
        }

        if body.is_empty() {
            debug!("Empty response.");
            return Ok(FetchResult::empty());
        }

        Ok(FetchResult::data(body, skip_bytes))
    }

    fn describe(&self) -> String {
        self.config.url.to_string()
    }
}

impl std::fmt::Debug for HttpReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpReader")
            .field("config", &self.config)
            .field("range_unsupported", &self.range_unsupported)
            .field("last_total", &self.last_total)
            .finish_non_exhaustive()
    }
}

/// Extract the complete length from a `Content-Range` header
fn total_from_content_range(response: &Response) -> Option<u64> {
    let value = response.headers().get(CONTENT_RANGE)?.to_str().ok()?;
    let total = parse_content_range_total(value);
    if total.is_none() {
        debug!("Ignoring unusable Content-Range header: {value}");
    }
    total
}

/// Parse the total from `bytes <start>-<end>/<total>`
pub(crate) fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}
