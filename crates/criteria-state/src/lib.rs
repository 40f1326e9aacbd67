//! Criteria-State: persistence for Criteria Studio
//!
//! Storage is split into narrow async traits so services depend only on
//! what they touch:
//!
//! - `CriterionStore`: current state of each criterion
//! - `SnapshotLog`: append-only published versions
//! - `IssueTracker`: issues against a criterion
//! - `AiRunLedger`: append-only regeneration audit
//! - `StatementStore`: standalone problem statements
//!
//! `CriteriaStore` bundles all five. Two backends implement it:
//! [`fakes::MemoryCriteriaStore`] and [`SurrealCriteriaStore`].

mod config;
mod error;
pub mod fakes;
mod migrations;
mod schema;
pub mod storage_traits;
pub mod surreal_store;

pub use config::CloudConfig;
pub use error::{StateError, StorageError};
pub use storage_traits::{
    AiRunLedger, AiRunRecord, ContentDigest, CriteriaStore, CriterionRecord, CriterionSnapshot,
    CriterionStatus, CriterionStore, IssueRecord, IssueStatus, IssueTracker, IssueType,
    SnapshotLog, StatementRecord, StatementStore, StorageResult, Transition,
};
pub use surreal_store::SurrealCriteriaStore;

/// Result type for connection and schema setup
pub type Result<T> = std::result::Result<T, StateError>;
