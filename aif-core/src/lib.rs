//! # aif-core
//!
//! Core types shared by the AI Factory agent-testing crates.
//!
//! ## Overview
//!
//! - [`AifError`] / [`Result`] - The closed failure taxonomy every external call reports
//! - [`FailureKind`] - Payload-free tag of a failure, used in logs and retry events
//! - [`JudgeClient`] - The LLM judge capability the evaluator consumes
//! - [`AgentProfile`] / [`TestCaseObservation`] - What gets judged
//!
//! Transports (database drivers, LLM vendor SDKs) live outside this workspace and are
//! injected through the traits defined here and in `aif-store`.

pub mod error;
pub mod judge;
pub mod types;

pub use error::{AifError, FailureKind, Result, db_codes};
pub use judge::{JudgeClient, JudgeRequest, JudgeResponse};
pub use types::{AgentProfile, TestCaseObservation};
