//! Periodic, deadline-bounded collection of host metrics.
//!
//! [`system::orchestrator::Orchestrator`] fans out to one [`system::source::Source`]
//! per metric category on every tick, publishes the merged [`system::snapshot::Snapshot`]
//! through a lock-free cell, keeps a bounded [`system::history::HistoryStore`] and pushes
//! each snapshot to subscriber queues on a best-effort basis.

pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod system;

pub use error::VitalsError;
