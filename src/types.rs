//! Common types shared between transports and the tail engine

use bytes::Bytes;

/// Byte position in the remote file, just past the last consumed line.
pub type Offset = u64;

/// Environment variable consulted for the SFTP password when the URL has none
pub const SFTP_PASSWORD_ENV: &str = "SFTP_PASSWORD";

/// Default SSH port for `sftp://` URLs without an explicit port
pub const DEFAULT_SFTP_PORT: u16 = 22;

/// Raw result of one transport fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResult {
    /// Bytes fetched from the remote file
    pub bytes: Bytes,
    /// Leading bytes of `bytes` that were already consumed in earlier polls
    pub skip_bytes: usize,
    /// The remote file shrank below the current offset
    pub truncated: bool,
}

impl FetchResult {
    /// Create a result carrying fetched data
    pub fn data(bytes: impl Into<Bytes>, skip_bytes: usize) -> Self {
        Self {
            bytes: bytes.into(),
            skip_bytes,
            truncated: false,
        }
    }

    /// Create a result with nothing new
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a result signalling truncation or rotation
    pub fn truncated() -> Self {
        Self {
            truncated: true,
            ..Self::default()
        }
    }

    /// Bytes left after dropping the overlap with consumed data
    pub fn new_bytes(&self) -> &[u8] {
        self.bytes.get(self.skip_bytes..).unwrap_or(&[])
    }
}
