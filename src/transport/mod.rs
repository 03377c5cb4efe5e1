//! Transport module
//!
//! Fetches the part of a remote file that lies past the current offset.
//!
//! # Transports
//!
//! - **HTTP**: GET with a `Range` header that re-reads one already consumed
//!   byte, falling back to a full download when the server ignores ranges
//! - **SFTP**: one lazily opened SSH session, seek to the offset and read to
//!   end of file
//!
//! Both report truncation through [`FetchResult::truncated`] rather than
//! as an error.

mod http;
mod sftp;

pub use http::{HttpReader, HttpReaderConfig};
pub use sftp::{RemoteFile, SftpConnect, SftpReader, SftpSession, SshConnector};

use crate::config::{SourceConfig, TailConfig};
use crate::error::Result;
use crate::types::{FetchResult, Offset};
use async_trait::async_trait;

/// A remote file that can be read from an offset to its end
#[async_trait]
pub trait Transport: Send {
    /// Fetch everything from `offset` to the end of the remote file
    async fn fetch(&mut self, offset: Offset) -> Result<FetchResult>;

    /// Human readable source description for logs
    fn describe(&self) -> String;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn fetch(&mut self, offset: Offset) -> Result<FetchResult> {
        (**self).fetch(offset).await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Build the transport selected by the source URL scheme
pub fn build_transport(config: &TailConfig) -> Result<Box<dyn Transport>> {
    match &config.source {
        SourceConfig::Http { url, basic_auth } => {
            let reader_config = HttpReaderConfig::builder(url.clone())
                .timeout(config.request_timeout)
                .basic_auth(basic_auth.clone())
                .build();
            Ok(Box::new(HttpReader::new(reader_config)?))
        }
        SourceConfig::Sftp {
            host,
            port,
            username,
            password,
            path,
        } => {
            let connector = SshConnector::new(
                host.clone(),
                *port,
                username.clone(),
                password.clone(),
                config.request_timeout,
            );
            Ok(Box::new(SftpReader::new(connector, path.clone())))
        }
    }
}


#[cfg(test)]
mod sftp_tests;
