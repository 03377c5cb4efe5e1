//! Checkpoint module
//!
//! Persists the tail offset between runs so a restarted process picks up
//! where the previous one stopped.
//!
//! # Format
//!
//! The checkpoint file holds one non-negative decimal integer followed by
//! a newline, e.g. `1024\n`.

mod store;

pub use store::{parse_checkpoint, CheckpointStore};
