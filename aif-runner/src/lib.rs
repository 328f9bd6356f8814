//! # aif-runner
//!
//! Test cycle for AI agents.
//!
//! ## Overview
//!
//! - [`TestCycle`] - Loads an agent, evaluates it, stores the result and approves or flags it
//! - [`AgentJob`] / [`BatchReport`] - Many agents at once, with bounded concurrency
//! - [`AifConfig`] - Retry policies and evaluator settings, loaded from TOML
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use aif_runner::{AifConfig, AgentJob, TestCycle};
//! use std::sync::Arc;
//!
//! let config = AifConfig::load("aif.toml")?;
//! config.init_telemetry()?;
//!
//! let cycle = TestCycle::from_config(my_store, Arc::new(my_judge), &config);
//! let report = cycle.run_batch(vec![AgentJob::new("agent-42", observations)]).await;
//! for (agent_id, err) in report.failed() {
//!     eprintln!("{agent_id}: {err}");
//! }
//! ```

mod config;
mod cycle;

pub use config::{AifConfig, DEFAULT_MAX_CONCURRENCY};
pub use cycle::{AgentJob, BatchItem, BatchReport, CycleOutcome, TestCycle};

pub use aif_store::APPROVAL_THRESHOLD;
