//! Runtime configuration
//!
//! Turns the command-line URL and flags into a validated [`TailConfig`].
//! The URL scheme selects the transport.

use crate::error::{Error, Result};
use crate::types::{DEFAULT_SFTP_PORT, SFTP_PASSWORD_ENV};
use percent_encoding::percent_decode_str;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default number of seconds between polls
pub const DEFAULT_INTERVAL_SECS: u64 = 15;

/// Default per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// Source Config
// ============================================================================

/// Where the tailed file lives
#[derive(Clone, PartialEq, Eq)]
pub enum SourceConfig {
    /// File served over HTTP or HTTPS
    Http {
        /// URL without userinfo
        url: Url,
        /// Basic auth credentials taken from the URL
        basic_auth: Option<BasicAuth>,
    },
    /// File on an SFTP server
    Sftp {
        /// Server host name or address
        host: String,
        /// SSH port
        port: u16,
        /// Login user
        username: String,
        /// Login password
        password: String,
        /// Remote path, relative to the login directory unless absolute
        path: String,
    },
}

/// Username and password for HTTP basic auth
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: Option<String>,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { url, basic_auth } => f
                .debug_struct("Http")
                .field("url", &url.as_str())
                .field("basic_auth", basic_auth)
                .finish(),
            Self::Sftp {
                host,
                port,
                username,
                path,
                ..
            } => f
                .debug_struct("Sftp")
                .field("host", host)
                .field("port", port)
                .field("username", username)
                .field("password", &"***")
                .field("path", path)
                .finish(),
        }
    }
}

impl SourceConfig {
    /// Parse a source URL
    ///
    /// `env_password` is the value of `SFTP_PASSWORD`, used when an `sftp://`
    /// URL carries no password.
    pub fn from_url(raw: &str, env_password: Option<&str>) -> Result<Self> {
        let url = Url::parse(raw)?;

        match url.scheme() {
            "http" | "https" => Ok(Self::http(url)),
            "sftp" => Self::sftp(&url, env_password),
            other => Err(Error::config(format!(
                "Unsupported URL scheme '{other}' (expected http, https or sftp)"
            ))),
        }
    }

    fn http(mut url: Url) -> Self {
        let basic_auth = if url.username().is_empty() {
            None
        } else {
            Some(BasicAuth {
                username: decode(url.username()),
                password: url.password().map(decode),
            })
        };

        // Credentials travel in the Authorization header, not the URL
        let _ = url.set_username("");
        let _ = url.set_password(None);

        Self::Http { url, basic_auth }
    }

    fn sftp(url: &Url, env_password: Option<&str>) -> Result<Self> {
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::config("Missing host in sftp URL"))?
            .to_string();

        let username = decode(url.username());
        if username.is_empty() {
            return Err(Error::config("Missing user name in sftp URL"));
        }

        let password = url
            .password()
            .map(decode)
            .filter(|p| !p.is_empty())
            .or_else(|| env_password.filter(|p| !p.is_empty()).map(String::from))
            .ok_or_else(|| {
                Error::config(format!(
                    "Provide password in URL or through {SFTP_PASSWORD_ENV} environment variable"
                ))
            })?;

        // Drop the separator after the authority; "//abs" keeps one slash
        let path = url.path().strip_prefix('/').unwrap_or(url.path());
        let path = decode(path);
        if path.is_empty() {
            return Err(Error::config("Missing file path in sftp URL"));
        }

        Ok(Self::Sftp {
            host,
            port: url.port().unwrap_or(DEFAULT_SFTP_PORT),
            username,
            password,
            path,
        })
    }

    /// Short description for log messages, without credentials
    pub fn describe(&self) -> String {
        match self {
            Self::Http { url, .. } => url.to_string(),
            Self::Sftp {
                host,
                port,
                username,
                path,
                ..
            } => format!("sftp://{username}@{host}:{port}/{path}"),
        }
    }
}

fn decode(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

// ============================================================================
// Tail Config
// ============================================================================

/// Complete configuration for one tail run
#[derive(Debug, Clone)]
pub struct TailConfig {
    /// Source of the tailed file
    pub source: SourceConfig,
    /// Time between polls
    pub poll_interval: Duration,
    /// Timeout for each request or SFTP operation
    pub request_timeout: Duration,
    /// Checkpoint file, `None` disables checkpointing
    pub checkpoint_path: Option<PathBuf>,
}

impl TailConfig {
    /// Create a config with default timings and no checkpoint
    pub fn new(source: SourceConfig) -> Self {
        Self {
            source,
            poll_interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            checkpoint_path: None,
        }
    }

    /// Create a config builder for a source URL
    pub fn builder(url: impl Into<String>) -> TailConfigBuilder {
        TailConfigBuilder {
            url: url.into(),
            env_password: None,
            interval_secs: DEFAULT_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            checkpoint_path: None,
        }
    }
}

/// Builder for [`TailConfig`]
pub struct TailConfigBuilder {
    url: String,
    env_password: Option<String>,
    interval_secs: u64,
    request_timeout_secs: u64,
    checkpoint_path: Option<PathBuf>,
}

impl fmt::Debug for TailConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TailConfigBuilder")
            .field("url", &masked_url(&self.url))
            .field("env_password", &self.env_password.as_ref().map(|_| "***"))
            .field("interval_secs", &self.interval_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("checkpoint_path", &self.checkpoint_path)
            .finish()
    }
}

/// The URL with any password replaced by `***`
fn masked_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() {
                // Only fails for URLs that cannot carry credentials
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        }
        Err(_) => "<invalid url>".to_string(),
    }
}

impl TailConfigBuilder {
    /// Set the fallback SFTP password
    #[must_use]
    pub fn env_password(mut self, password: Option<String>) -> Self {
        self.env_password = password;
        self
    }

    /// Set the poll interval in seconds
    #[must_use]
    pub fn interval_secs(mut self, secs: u64) -> Self {
        self.interval_secs = secs;
        self
    }

    /// Set the request timeout in seconds
    #[must_use]
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Set the checkpoint file
    #[must_use]
    pub fn checkpoint_path(mut self, path: Option<PathBuf>) -> Self {
        self.checkpoint_path = path;
        self
    }

    /// Validate and build the config
    pub fn build(self) -> Result<TailConfig> {
        if self.interval_secs == 0 {
            return Err(Error::config("Poll interval must be at least 1 second"));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::config("Request timeout must be at least 1 second"));
        }

        let source = SourceConfig::from_url(&self.url, self.env_password.as_deref())?;

        Ok(TailConfig {
            source,
            poll_interval: Duration::from_secs(self.interval_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            checkpoint_path: self.checkpoint_path,
        })
    }
}
