//! Payment pattern inference and reconciliation.
//!
//! Infers each entity's payment cadence and fee model from its history,
//! flags expected payments that never arrived, spots oversized payments
//! that may cover them, and reconciles the inferences against the
//! recorded contract settings.

pub mod config;
pub mod engine;
pub mod error;
pub mod fee;
pub mod gaps;
pub mod ingest;
pub mod makeup;
pub mod missing;
pub mod provider;
pub mod reconcile;
pub mod report;
pub mod rng;
pub mod schedule;
pub mod store;
pub mod summary;
pub mod synth;
pub mod types;

pub use config::AuditConfig;
pub use engine::{AuditEngine, AuditOutcome};
pub use error::{AuditError, AuditResult};
pub use provider::{DataProvider, MemoryProvider};
pub use report::{AuditReport, ReportFormat};
pub use store::LedgerStore;
