//! SFTP seek reader
//!
//! Keeps one SSH connection and SFTP session open between polls. The
//! session is opened on first use and dropped on any failure, so the next
//! poll starts again from a fresh connection.

use super::Transport;
use crate::error::{Error, Result, ResultExt};
use crate::types::{FetchResult, Offset};
use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::Disconnect;
use russh_sftp::client::fs::File;
use russh_sftp::client::SftpSession as RusshSftpSession;
use std::future::Future;
use std::io::SeekFrom;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info};

// ============================================================================
// Session Traits
// ============================================================================

/// Opens authenticated SFTP sessions
#[async_trait]
pub trait SftpConnect: Send + Sync {
    /// Connect, authenticate and start the SFTP subsystem
    async fn connect(&self) -> Result<Box<dyn SftpSession>>;
}

/// An open SFTP session
#[async_trait]
pub trait SftpSession: Send {
    /// Open a remote file for reading
    async fn open(&mut self, path: &str) -> Result<Box<dyn RemoteFile>>;

    /// Close the session and the connection under it
    async fn close(&mut self);
}

/// A remote file opened for reading
#[async_trait]
pub trait RemoteFile: Send {
    /// Current size of the file in bytes
    async fn size(&mut self) -> Result<u64>;

    /// Seek to `offset` and read to end of file
    async fn read_from(&mut self, offset: Offset) -> Result<Vec<u8>>;
}

// ============================================================================
// Reader
// ============================================================================

/// Reads new bytes of a file on an SFTP server
pub struct SftpReader<C: SftpConnect> {
    connector: C,
    path: String,
    session: Option<Box<dyn SftpSession>>,
}

impl<C: SftpConnect> SftpReader<C> {
    /// Create a reader; nothing is connected until the first fetch
    pub fn new(connector: C, path: impl Into<String>) -> Self {
        Self {
            connector,
            path: path.into(),
            session: None,
        }
    }

    /// Whether a session is currently open
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    async fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
    }

    async fn read_new(&mut self, offset: Offset) -> Result<FetchResult> {
        if self.session.is_none() {
            let session = self
                .connector
                .connect()
                .await
                .transport_context("failed to connect")?;
            debug!("Opened SFTP session");
            self.session = Some(session);
        }

        let path = self.path.as_str();
        let Some(session) = self.session.as_mut() else {
            return Err(Error::transport("SFTP session unavailable"));
        };

        let mut file = session
            .open(path)
            .await
            .with_transport_context(|| format!("failed to open {path}"))?;

        let size = file
            .size()
            .await
            .with_transport_context(|| format!("failed to stat {path}"))?;

        if size < offset {
            info!("File truncated ({size} < {offset}). Resetting state.");
            return Ok(FetchResult::truncated());
        }

        if size == offset {
            return Ok(FetchResult::empty());
        }

        let body = file
            .read_from(offset)
            .await
            .with_transport_context(|| format!("failed to read {path} from {offset}"))?;

        // Seek gives an exact continuation point, nothing to skip
        Ok(FetchResult::data(body, 0))
    }
}

#[async_trait]
impl<C: SftpConnect> Transport for SftpReader<C> {
    async fn fetch(&mut self, offset: Offset) -> Result<FetchResult> {
        match self.read_new(offset).await {
            Ok(result) => Ok(result),
            Err(e) => {
                self.disconnect().await;
                Err(e)
            }
        }
    }

    fn describe(&self) -> String {
        format!("sftp file {}", self.path)
    }
}

// ============================================================================
// SSH Connector
// ============================================================================

/// Connects over SSH with password authentication
pub struct SshConnector {
    host: String,
    port: u16,
    username: String,
    password: String,
    timeout: Duration,
}

impl SshConnector {
    /// Create a connector
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            timeout,
        }
    }

    async fn establish(&self) -> Result<SshSession> {
        let config = Arc::new(client::Config::default());

        let address = (self.host.as_str(), self.port);
        let mut handle = client::connect(config, address, AcceptAnyHostKey)
            .await
            .map_err(|e| {
                Error::transport(format!("ssh connect to {}:{}: {e}", self.host, self.port))
            })?;

        let authenticated = handle
            .authenticate_password(self.username.as_str(), self.password.as_str())
            .await
            .map_err(|e| Error::transport(format!("ssh authentication: {e}")))?;
        if !authenticated {
            return Err(Error::transport(format!(
                "ssh authentication rejected for user {}",
                self.username
            )));
        }

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| Error::transport(format!("ssh channel: {e}")))?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| Error::transport(format!("sftp subsystem: {e}")))?;

        let sftp = RusshSftpSession::new(channel.into_stream())
            .await
            .map_err(|e| Error::transport(format!("sftp session: {e}")))?;

        Ok(SshSession {
            handle,
            sftp,
            timeout: self.timeout,
        })
    }
}

#[async_trait]
impl SftpConnect for SshConnector {
    async fn connect(&self) -> Result<Box<dyn SftpSession>> {
        let session = with_timeout(self.timeout, self.establish()).await?;
        Ok(Box::new(session))
    }
}

impl std::fmt::Debug for SshConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshConnector")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Host keys are not verified
struct AcceptAnyHostKey;

#[async_trait]
impl client::Handler for AcceptAnyHostKey {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh_keys::key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(true)
    }
}

struct SshSession {
    handle: Handle<AcceptAnyHostKey>,
    sftp: RusshSftpSession,
    timeout: Duration,
}

#[async_trait]
impl SftpSession for SshSession {
    async fn open(&mut self, path: &str) -> Result<Box<dyn RemoteFile>> {
        let sftp = &self.sftp;
        let file = with_timeout(self.timeout, async move {
            sftp.open(path)
                .await
                .map_err(|e| Error::transport(e.to_string()))
        })
        .await?;

        Ok(Box::new(SshRemoteFile {
            file,
            timeout: self.timeout,
        }))
    }

    async fn close(&mut self) {
        // The connection may already be dead, don't wait on it for long
        let sftp = &self.sftp;
        let closed = with_timeout(self.timeout, async move {
            sftp.close()
                .await
                .map_err(|e| Error::transport(e.to_string()))
        })
        .await;
        if let Err(e) = closed {
            debug!("Error closing SFTP session: {e}");
        }

        let handle = &self.handle;
        let disconnected = with_timeout(self.timeout, async move {
            handle
                .disconnect(Disconnect::ByApplication, "", "en")
                .await
                .map_err(|e| Error::transport(e.to_string()))
        })
        .await;
        if let Err(e) = disconnected {
            debug!("Error closing SSH connection: {e}");
        }
    }
}

struct SshRemoteFile {
    file: File,
    timeout: Duration,
}

#[async_trait]
impl RemoteFile for SshRemoteFile {
    /// Stat the open handle, so a rotation after `open` can't mix files
    async fn size(&mut self) -> Result<u64> {
        let file = &self.file;
        let metadata = with_timeout(self.timeout, async move {
            file.metadata()
                .await
                .map_err(|e| Error::transport(e.to_string()))
        })
        .await?;

        metadata
            .size
            .ok_or_else(|| Error::transport("server did not report a file size"))
    }

    async fn read_from(&mut self, offset: Offset) -> Result<Vec<u8>> {
        let file = &mut self.file;
        with_timeout(self.timeout, async move {
            file.seek(SeekFrom::Start(offset)).await?;
            let mut body = Vec::new();
            file.read_to_end(&mut body).await?;
            Ok(body)
        })
        .await
    }
}

/// Bound an SFTP operation by the request timeout
async fn with_timeout<T>(timeout: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| Error::transport(format!("timed out after {timeout:?}")))?
}
