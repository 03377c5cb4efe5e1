//! Tail engine module
//!
//! The poll loop: fetch from the current offset, split complete lines,
//! write them out, persist the new offset, sleep, repeat.
//!
//! # Overview
//!
//! The engine module provides:
//! - `TailEngine` - Owns one transport and the checkpoint store
//! - `PollOutcome` - What a single poll did
//! - `TailStats` - Counters for the whole run
//!
//! Polls never overlap. Transport errors are logged and the same offset
//! is retried on the next poll; only a failing output stops the loop.

mod types;

pub use types::{PollOutcome, TailStats};

use crate::checkpoint::CheckpointStore;
use crate::error::{Error, Result};
use crate::extract::extract_lines;
use crate::transport::Transport;
use crate::types::Offset;
use std::future::Future;
use std::io::Write;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Drives polling of one remote file
pub struct TailEngine<T: Transport> {
    /// Transport for the tailed file
    transport: T,
    /// Checkpoint store
    checkpoint: CheckpointStore,
    /// Offset just past the last emitted line
    offset: Offset,
    /// Time between polls
    poll_interval: Duration,
    /// Statistics
    stats: TailStats,
}

impl<T: Transport> TailEngine<T> {
    /// Create a new engine starting at offset 0
    pub fn new(transport: T, checkpoint: CheckpointStore) -> Self {
        Self {
            transport,
            checkpoint,
            offset: 0,
            poll_interval: Duration::from_secs(crate::config::DEFAULT_INTERVAL_SECS),
            stats: TailStats::default(),
        }
    }

    /// Set the poll interval
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Start from a known offset instead of the checkpoint
    #[must_use]
    pub fn with_offset(mut self, offset: Offset) -> Self {
        self.offset = offset;
        self
    }

    /// Current offset
    pub fn offset(&self) -> Offset {
        self.offset
    }

    /// Get statistics
    pub fn stats(&self) -> &TailStats {
        &self.stats
    }

    /// Get the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Load the offset from the checkpoint store
    ///
    /// A corrupt checkpoint is returned as an error; continuing from a
    /// guessed offset could skip or repeat lines.
    pub async fn load_checkpoint(&mut self) -> Result<Offset> {
        self.offset = self.checkpoint.load().await?;
        debug!("Loaded checkpoint offset {}", self.offset);
        Ok(self.offset)
    }

    /// Save the current offset
    ///
    /// Failures are logged and counted before being returned.
    pub async fn persist(&mut self) -> Result<()> {
        let result = self.checkpoint.save(self.offset).await;
        if let Err(e) = &result {
            warn!("Failed to save state: {e}");
            self.stats.add_checkpoint_failure();
        }
        result
    }

    /// Run a single fetch, extract, emit and persist cycle
    pub async fn poll_once<W: Write>(&mut self, out: &mut W) -> Result<PollOutcome> {
        self.stats.add_poll();

        let fetched = match self.transport.fetch(self.offset).await {
            Ok(fetched) => fetched,
            Err(e) => {
                self.stats.add_error();
                return Err(e);
            }
        };

        if fetched.truncated {
            self.stats.add_truncation();
            self.offset = 0;
            let _ = self.persist().await;
            return Ok(PollOutcome::Truncated);
        }

        let start = self.offset;
        let extracted = extract_lines(fetched.new_bytes(), start);

        for line in &extracted.lines {
            writeln!(out, "{line}").map_err(|e| Error::output(e.to_string()))?;
        }
        out.flush().map_err(|e| Error::output(e.to_string()))?;

        self.stats
            .add_lines(extracted.lines.len(), extracted.consumed(start));
        self.offset = extracted.new_offset;
        let _ = self.persist().await;

        Ok(PollOutcome::Lines {
            count: extracted.lines.len(),
            offset: self.offset,
        })
    }

    /// Poll until `shutdown` completes, then save a final checkpoint
    ///
    /// Only the sleep between polls is raced against `shutdown`; a poll in
    /// flight always finishes first.
    pub async fn run<W, F>(&mut self, out: &mut W, shutdown: F) -> Result<()>
    where
        W: Write,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            "Tailing {} from offset {}",
            self.transport.describe(),
            self.offset
        );

        loop {
            match self.poll_once(out).await {
                Ok(outcome) => debug!("Poll finished: {outcome:?}"),
                Err(e) if e.is_retryable() => error!("Error fetching file: {e}"),
                Err(e) => {
                    let _ = self.persist().await;
                    return Err(e);
                }
            }

            tokio::select! {
                () = &mut shutdown => break,
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        info!("Caught signal, saving state and exiting.");
        let _ = self.persist().await;
        info!("Tail statistics: {:?}", self.stats);

        Ok(())
    }
}

impl<T: Transport> std::fmt::Debug for TailEngine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TailEngine")
            .field("source", &self.transport.describe())
            .field("checkpoint", &self.checkpoint)
            .field("offset", &self.offset)
            .field("poll_interval", &self.poll_interval)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests;
