//! Tests for the SFTP reader, using an in-memory session

use super::*;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Shared state behind the fake server
#[derive(Default)]
struct FakeServer {
    contents: Vec<u8>,
    connects: usize,
    closes: usize,
    fail_next_read: bool,
    refuse_connect: bool,
    /// Contents that replace the path right after the next open
    rotate_after_open: Option<Vec<u8>>,
}

#[derive(Clone, Default)]
struct FakeConnector {
    server: Arc<Mutex<FakeServer>>,
}

impl FakeConnector {
    fn with_contents(contents: &[u8]) -> Self {
        let connector = Self::default();
        connector.server.lock().unwrap().contents = contents.to_vec();
        connector
    }

    fn set_contents(&self, contents: &[u8]) {
        self.server.lock().unwrap().contents = contents.to_vec();
    }

    fn append(&self, more: &[u8]) {
        self.server.lock().unwrap().contents.extend_from_slice(more);
    }

    fn rotate_after_next_open(&self, contents: &[u8]) {
        self.server.lock().unwrap().rotate_after_open = Some(contents.to_vec());
    }

    fn connects(&self) -> usize {
        self.server.lock().unwrap().connects
    }

    fn closes(&self) -> usize {
        self.server.lock().unwrap().closes
    }
}

#[async_trait]
impl SftpConnect for FakeConnector {
    async fn connect(&self) -> Result<Box<dyn SftpSession>> {
        let mut server = self.server.lock().unwrap();
        if server.refuse_connect {
            return Err(Error::transport("connection refused"));
        }
        server.connects += 1;
        Ok(Box::new(FakeSession {
            server: Arc::clone(&self.server),
        }))
    }
}

struct FakeSession {
    server: Arc<Mutex<FakeServer>>,
}

#[async_trait]
impl SftpSession for FakeSession {
    async fn open(&mut self, path: &str) -> Result<Box<dyn RemoteFile>> {
        if path != "logs/app.log" {
            return Err(Error::transport("no such file"));
        }
        let mut server = self.server.lock().unwrap();
        // An open handle keeps the file it was opened on, like an inode
        let contents = server.contents.clone();
        if let Some(rotated) = server.rotate_after_open.take() {
            server.contents = rotated;
        }
        Ok(Box::new(FakeFile {
            server: Arc::clone(&self.server),
            contents,
        }))
    }

    async fn close(&mut self) {
        self.server.lock().unwrap().closes += 1;
    }
}

struct FakeFile {
    server: Arc<Mutex<FakeServer>>,
    contents: Vec<u8>,
}

#[async_trait]
impl RemoteFile for FakeFile {
    async fn size(&mut self) -> Result<u64> {
        Ok(self.contents.len() as u64)
    }

    async fn read_from(&mut self, offset: u64) -> Result<Vec<u8>> {
        let mut server = self.server.lock().unwrap();
        if server.fail_next_read {
            server.fail_next_read = false;
            return Err(Error::transport("connection reset"));
        }
        Ok(self.contents[offset as usize..].to_vec())
    }
}

// ============================================================================
// Fetch Tests
// ============================================================================

#[tokio::test]
async fn test_connects_lazily_and_reuses_session() {
    let connector = FakeConnector::with_contents(b"foo\nbar\n");
    let mut reader = SftpReader::new(connector.clone(), "logs/app.log");

    assert!(!reader.is_connected());
    assert_eq!(connector.connects(), 0);

    let result = reader.fetch(0).await.unwrap();
    assert_eq!(result.new_bytes(), b"foo\nbar\n");
    assert_eq!(result.skip_bytes, 0);
    assert!(reader.is_connected());

    connector.append(b"baz\n");
    let result = reader.fetch(8).await.unwrap();
    assert_eq!(result.new_bytes(), b"baz\n");

    assert_eq!(connector.connects(), 1);
}

#[tokio::test]
async fn test_unchanged_file_returns_nothing() {
    let connector = FakeConnector::with_contents(b"foo\n");
    let mut reader = SftpReader::new(connector, "logs/app.log");

    let result = reader.fetch(4).await.unwrap();
    assert!(result.new_bytes().is_empty());
    assert!(!result.truncated);
}

#[tokio::test]
async fn test_reads_partial_line_from_exact_offset() {
    let connector = FakeConnector::with_contents(b"foo\nbar\nbaz");
    let mut reader = SftpReader::new(connector, "logs/app.log");

    let result = reader.fetch(8).await.unwrap();
    assert_eq!(result.new_bytes(), b"baz");
    assert_eq!(result.skip_bytes, 0);
}

#[tokio::test]
async fn test_smaller_file_is_truncation() {
    let connector = FakeConnector::with_contents(b"foo\nbar\n");
    let mut reader = SftpReader::new(connector.clone(), "logs/app.log");

    connector.set_contents(b"x\n");
    let result = reader.fetch(8).await.unwrap();
    assert!(result.truncated);
    assert!(result.new_bytes().is_empty());

    // Truncation is not a failure, the session stays open
    assert!(reader.is_connected());
    assert_eq!(connector.closes(), 0);
}

#[tokio::test]
async fn test_rotation_after_open_reads_the_opened_file() {
    let connector = FakeConnector::with_contents(b"foo\nbar\nbaz\n");
    let mut reader = SftpReader::new(connector.clone(), "logs/app.log");

    // Size and data both come from the handle, not the path
    connector.rotate_after_next_open(b"x\n");
    let result = reader.fetch(8).await.unwrap();
    assert!(!result.truncated);
    assert_eq!(result.new_bytes(), b"baz\n");

    // The next poll opens the new file and sees the shrink
    let result = reader.fetch(12).await.unwrap();
    assert!(result.truncated);
}

#[tokio::test]
async fn test_read_failure_disconnects_and_reconnects() {
    let connector = FakeConnector::with_contents(b"foo\n");
    let mut reader = SftpReader::new(connector.clone(), "logs/app.log");

    reader.fetch(0).await.unwrap();
    connector.append(b"bar\n");
    connector.server.lock().unwrap().fail_next_read = true;

    let err = reader.fetch(4).await.unwrap_err();
    assert!(matches!(err, Error::TransportIo { .. }));
    assert!(err.to_string().contains("failed to read logs/app.log from 4"));
    assert!(!reader.is_connected());
    assert_eq!(connector.closes(), 1);

    let result = reader.fetch(4).await.unwrap();
    assert_eq!(result.new_bytes(), b"bar\n");
    assert_eq!(connector.connects(), 2);
}

#[tokio::test]
async fn test_open_failure_disconnects() {
    let connector = FakeConnector::with_contents(b"foo\n");
    let mut reader = SftpReader::new(connector.clone(), "logs/missing.log");

    let err = reader.fetch(0).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Transport error: failed to open logs/missing.log: no such file"
    );
    assert!(!reader.is_connected());
    assert_eq!(connector.closes(), 1);
}

#[tokio::test]
async fn test_connect_failure_is_transport_error() {
    let connector = FakeConnector::default();
    connector.server.lock().unwrap().refuse_connect = true;
    let mut reader = SftpReader::new(connector.clone(), "logs/app.log");

    let err = reader.fetch(0).await.unwrap_err();
    assert!(err.to_string().contains("failed to connect: connection refused"));
    assert!(!reader.is_connected());

    connector.server.lock().unwrap().refuse_connect = false;
    reader.fetch(0).await.unwrap();
    assert!(reader.is_connected());
}
