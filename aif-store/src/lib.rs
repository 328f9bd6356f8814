//! # aif-store
//!
//! Persistence capability for the agent-testing backend.
//!
//! ## Overview
//!
//! - [`TestStore`] - Agent versions, skills and test results behind one async trait
//! - [`InMemoryTestStore`] - Process-local implementation
//! - [`RetryingStore`] - Runs every call of another store under a [`RetryPolicy`](aif_retry::RetryPolicy)
//! - [`testing::FlakyStore`] - Injects failures into another store
//!
//! Every failure is an [`AifError::Database`](aif_core::AifError::Database)
//! carrying a [`db_codes`](aif_core::db_codes) value, so the retry classifier
//! can tell constraint errors from transient ones.
//!
//! ## Example
//!
//! ```rust,ignore
//! use aif_store::{AgentVersion, InMemoryTestStore, RetryingStore, TestStore};
//!
//! let store = RetryingStore::new(InMemoryTestStore::new().with_agent(AgentVersion::new("a1")));
//! let pending = store.get_agents_needing_testing(10).await?;
//! ```

pub mod inmemory;
pub mod records;
pub mod retrying;
pub mod store;
pub mod testing;

pub use inmemory::InMemoryTestStore;
pub use records::{
    APPROVAL_THRESHOLD, AgentStatus, AgentVersion, HealthStatus, NewSkill, Skill,
    TestResultRecord, is_approved,
};
pub use retrying::RetryingStore;
pub use store::TestStore;
