//! Tests for the tail engine

use super::*;
use crate::error::Error;
use crate::types::FetchResult;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

/// Returns queued results in order, then "nothing new"
#[derive(Default)]
struct ScriptedTransport {
    responses: VecDeque<Result<FetchResult>>,
    offsets_seen: Vec<Offset>,
}

impl ScriptedTransport {
    fn new(responses: Vec<Result<FetchResult>>) -> Self {
        Self {
            responses: responses.into(),
            offsets_seen: Vec::new(),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&mut self, offset: Offset) -> Result<FetchResult> {
        self.offsets_seen.push(offset);
        self.responses
            .pop_front()
            .unwrap_or_else(|| Ok(FetchResult::empty()))
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

/// In-memory file read from an exact offset, like a seeking transport
#[derive(Clone, Default)]
struct MemoryFile {
    contents: Arc<Mutex<Vec<u8>>>,
}

impl MemoryFile {
    fn append(&self, bytes: &[u8]) {
        self.contents.lock().unwrap().extend_from_slice(bytes);
    }

    fn replace(&self, bytes: &[u8]) {
        *self.contents.lock().unwrap() = bytes.to_vec();
    }
}

#[async_trait]
impl Transport for MemoryFile {
    async fn fetch(&mut self, offset: Offset) -> Result<FetchResult> {
        let contents = self.contents.lock().unwrap();
        let size = contents.len() as u64;
        if size < offset {
            return Ok(FetchResult::truncated());
        }
        Ok(FetchResult::data(contents[offset as usize..].to_vec(), 0))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Writer that always fails
struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "broken pipe",
        ))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn output_lines(out: &[u8]) -> Vec<String> {
    String::from_utf8(out.to_vec())
        .unwrap()
        .lines()
        .map(String::from)
        .collect()
}

// ============================================================================
// Poll Tests
// ============================================================================

#[tokio::test]
async fn test_partial_line_waits_for_newline() {
    let file = MemoryFile::default();
    file.append(b"foo\nbar\n");
    let mut engine = TailEngine::new(file.clone(), CheckpointStore::disabled());
    let mut out = Vec::new();

    let outcome = engine.poll_once(&mut out).await.unwrap();
    assert_eq!(outcome, PollOutcome::Lines { count: 2, offset: 8 });

    file.append(b"baz");
    let outcome = engine.poll_once(&mut out).await.unwrap();
    assert_eq!(outcome.line_count(), 0);
    assert_eq!(engine.offset(), 8);

    file.append(b"\n");
    let outcome = engine.poll_once(&mut out).await.unwrap();
    assert_eq!(outcome, PollOutcome::Lines { count: 1, offset: 12 });

    assert_eq!(output_lines(&out), vec!["foo", "bar", "baz"]);
    assert_eq!(engine.stats().lines_emitted, 3);
    assert_eq!(engine.stats().bytes_consumed, 12);
}

#[tokio::test]
async fn test_skip_bytes_are_dropped_before_splitting() {
    let transport = ScriptedTransport::new(vec![Ok(FetchResult::data(&b"\nbaz\n"[..], 1))]);
    let mut engine = TailEngine::new(transport, CheckpointStore::disabled()).with_offset(8);
    let mut out = Vec::new();

    engine.poll_once(&mut out).await.unwrap();

    assert_eq!(output_lines(&out), vec!["baz"]);
    assert_eq!(engine.offset(), 12);
}

#[tokio::test]
async fn test_full_body_fallback_skips_consumed_prefix() {
    let transport =
        ScriptedTransport::new(vec![Ok(FetchResult::data(&b"foo\nbar\nbaz\n"[..], 8))]);
    let mut engine = TailEngine::new(transport, CheckpointStore::disabled()).with_offset(8);
    let mut out = Vec::new();

    engine.poll_once(&mut out).await.unwrap();

    assert_eq!(output_lines(&out), vec!["baz"]);
    assert_eq!(engine.offset(), 12);
}

#[tokio::test]
async fn test_truncation_resets_and_persists_zero() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tail.offset");
    let store = CheckpointStore::new(&path);

    let file = MemoryFile::default();
    file.append(b"one\ntwo\n");
    let mut engine = TailEngine::new(file.clone(), store.clone());
    let mut out = Vec::new();

    engine.poll_once(&mut out).await.unwrap();
    assert_eq!(store.load().await.unwrap(), 8);

    file.replace(b"x\n");
    let outcome = engine.poll_once(&mut out).await.unwrap();
    assert!(outcome.is_truncated());
    assert_eq!(engine.offset(), 0);
    assert_eq!(store.load().await.unwrap(), 0);
    assert_eq!(output_lines(&out), vec!["one", "two"]);

    // The rotated file is read from the start on the next poll
    engine.poll_once(&mut out).await.unwrap();
    assert_eq!(output_lines(&out), vec!["one", "two", "x"]);
    assert_eq!(store.load().await.unwrap(), 2);
    assert_eq!(engine.stats().truncations, 1);
}

#[tokio::test]
async fn test_transport_error_keeps_offset_and_skips_persist() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tail.offset");
    let store = CheckpointStore::new(&path);
    store.save(5).await.unwrap();

    let transport = ScriptedTransport::new(vec![
        Err(Error::transport("connection reset")),
        Ok(FetchResult::data(&b"ok\n"[..], 0)),
    ]);
    let mut engine = TailEngine::new(transport, store.clone());
    engine.load_checkpoint().await.unwrap();
    std::fs::remove_file(&path).unwrap();

    let mut out = Vec::new();
    let err = engine.poll_once(&mut out).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(engine.offset(), 5);
    assert!(!path.exists());
    assert_eq!(engine.stats().errors, 1);

    // Same offset is retried
    engine.poll_once(&mut out).await.unwrap();
    assert_eq!(engine.transport().offsets_seen, vec![5, 5]);
    assert_eq!(engine.offset(), 8);
    assert_eq!(store.load().await.unwrap(), 8);
}

#[tokio::test]
async fn test_nothing_new_keeps_offset() {
    let transport = ScriptedTransport::default();
    let mut engine = TailEngine::new(transport, CheckpointStore::disabled()).with_offset(42);
    let mut out = Vec::new();

    let outcome = engine.poll_once(&mut out).await.unwrap();
    assert_eq!(outcome, PollOutcome::Lines { count: 0, offset: 42 });
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_checkpoint_failure_is_counted_not_fatal() {
    let dir = tempdir().unwrap();
    let store = CheckpointStore::new(dir.path().join("missing-dir").join("tail.offset"));
    let transport = ScriptedTransport::new(vec![Ok(FetchResult::data(&b"a\n"[..], 0))]);
    let mut engine = TailEngine::new(transport, store);
    let mut out = Vec::new();

    let outcome = engine.poll_once(&mut out).await.unwrap();
    assert_eq!(outcome.line_count(), 1);
    assert_eq!(engine.offset(), 2);
    assert_eq!(engine.stats().checkpoint_failures, 1);
}

#[tokio::test]
async fn test_load_checkpoint_rejects_corrupt_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tail.offset");
    std::fs::write(&path, "-5\n").unwrap();

    let mut engine = TailEngine::new(ScriptedTransport::default(), CheckpointStore::new(&path));
    let err = engine.load_checkpoint().await.unwrap_err();
    assert!(matches!(err, Error::InvalidCheckpoint { .. }));
}

// ============================================================================
// Run Loop Tests
// ============================================================================

#[tokio::test]
async fn test_run_stops_on_shutdown_and_saves() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tail.offset");

    let file = MemoryFile::default();
    file.append(b"first\nsecond\npart");
    let mut engine = TailEngine::new(file, CheckpointStore::new(&path))
        .with_poll_interval(Duration::from_secs(3600));
    let mut out = Vec::new();

    engine
        .run(&mut out, std::future::ready(()))
        .await
        .unwrap();

    assert_eq!(output_lines(&out), vec!["first", "second"]);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "13\n");
    assert_eq!(engine.stats().polls, 1);
}

#[tokio::test]
async fn test_run_survives_transport_errors() {
    let transport = ScriptedTransport::new(vec![
        Err(Error::unexpected_status(500)),
        Err(Error::Timeout { timeout_ms: 5000 }),
        Ok(FetchResult::data(&b"late\n"[..], 0)),
    ]);
    let mut engine = TailEngine::new(transport, CheckpointStore::disabled())
        .with_poll_interval(Duration::from_millis(5));
    let mut out = Vec::new();

    engine
        .run(&mut out, tokio::time::sleep(Duration::from_millis(500)))
        .await
        .unwrap();

    assert_eq!(output_lines(&out), vec!["late"]);
    assert_eq!(engine.stats().errors, 2);
    assert!(engine.stats().polls >= 3);
}

#[tokio::test]
async fn test_run_stops_when_output_fails() {
    let transport = ScriptedTransport::new(vec![Ok(FetchResult::data(&b"a\n"[..], 0))]);
    let mut engine = TailEngine::new(transport, CheckpointStore::disabled());

    let err = engine
        .run(&mut BrokenPipe, std::future::pending::<()>())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Output { .. }));
    assert_eq!(engine.offset(), 0);
}
