//! Engine types
//!
//! Per-poll outcomes and running statistics for the tail engine.

use crate::types::Offset;

/// What a single successful poll did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// New data was processed
    Lines {
        /// Number of lines written
        count: usize,
        /// Offset after the poll
        offset: Offset,
    },
    /// The remote file shrank and the offset was reset to 0
    Truncated,
}

impl PollOutcome {
    /// Number of lines written by this poll
    pub fn line_count(&self) -> usize {
        match self {
            Self::Lines { count, .. } => *count,
            Self::Truncated => 0,
        }
    }

    /// Check if this poll detected truncation
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Truncated)
    }
}

/// Statistics for a tail run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TailStats {
    /// Polls attempted
    pub polls: usize,
    /// Lines written to the output
    pub lines_emitted: usize,
    /// Bytes consumed into the offset
    pub bytes_consumed: u64,
    /// Truncations detected
    pub truncations: usize,
    /// Failed fetches
    pub errors: usize,
    /// Failed checkpoint saves
    pub checkpoint_failures: usize,
}

impl TailStats {
    /// Add a poll
    pub fn add_poll(&mut self) {
        self.polls += 1;
    }

    /// Add emitted lines and the bytes they covered
    pub fn add_lines(&mut self, count: usize, bytes: u64) {
        self.lines_emitted += count;
        self.bytes_consumed += bytes;
    }

    /// Add a truncation
    pub fn add_truncation(&mut self) {
        self.truncations += 1;
    }

    /// Add an error
    pub fn add_error(&mut self) {
        self.errors += 1;
    }

    /// Add a checkpoint failure
    pub fn add_checkpoint_failure(&mut self) {
        self.checkpoint_failures += 1;
    }
}
