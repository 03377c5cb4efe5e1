//! # remote-tail
//!
//! `tail -f` for files you can only reach over HTTP or SFTP.
//!
//! Each poll fetches what was appended since the last one, prints the
//! complete lines and remembers the byte offset just past them. The offset
//! can be checkpointed to a file so a restarted process resumes without
//! repeating or skipping lines.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use remote_tail::{build_transport, CheckpointStore, TailConfig, TailEngine};
//!
//! #[tokio::main]
//! async fn main() -> remote_tail::Result<()> {
//!     let config = TailConfig::builder("https://example.com/app.log")
//!         .interval_secs(5)
//!         .build()?;
//!
//!     let transport = build_transport(&config)?;
//!     let mut engine = TailEngine::new(transport, CheckpointStore::new("app.offset"));
//!     engine.load_checkpoint().await?;
//!     let shutdown = async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     };
//!     engine.run(&mut std::io::stdout(), shutdown).await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         TailEngine                           │
//! │   fetch(offset) → extract lines → write → save checkpoint    │
//! └──────────────────────────────────────────────────────────────┘
//!                │                  │                  │
//! ┌──────────────┴──────┬───────────┴──────┬───────────┴────────┐
//! │      Transport      │     Extract      │     Checkpoint     │
//! ├─────────────────────┼──────────────────┼────────────────────┤
//! │ HTTP Range          │ complete lines   │ offset file        │
//! │ SFTP seek           │ partial tail     │ atomic rename      │
//! └─────────────────────┴──────────────────┴────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and constants
pub mod types;

/// Runtime configuration from URL and flags
pub mod config;

/// Offset checkpointing
pub mod checkpoint;

/// Line splitting
pub mod extract;

/// HTTP and SFTP readers
pub mod transport;

/// Poll loop
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use checkpoint::CheckpointStore;
pub use config::{SourceConfig, TailConfig};
pub use engine::{PollOutcome, TailEngine, TailStats};
pub use error::{Error, Result};
pub use extract::{extract_lines, Extracted};
pub use transport::{build_transport, Transport};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
