//! # AIF Telemetry
//!
//! Structured logging for the agent-testing backend.
//!
//! ## Features
//! - Structured logging with `tracing`
//! - Human-readable or JSON-lines console output, filtered by `RUST_LOG`
//! - Span helpers for evaluations, judge calls, retries and store access
//!
//! ## Usage
//!
//! ```rust
//! use aif_telemetry::{init_telemetry, info};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_telemetry("aif-runner")?;
//!     info!(agent.id = "agent-1", "evaluation queued");
//!     Ok(())
//! }
//! ```

pub mod init;
pub mod spans;

// Re-export tracing macros for convenience
pub use tracing::{Instrument, Span, debug, error, info, instrument, trace, warn};

pub use init::{LogFormat, init_json_telemetry, init_telemetry, init_with_format};
pub use spans::*;
