//! vt-sync - Data Freshness & Reconciliation Engine
//!
//! Decides, for every incoming health-metric sample, whether it should
//! overwrite what is already stored for that user and day, arbitrating
//! between independently syncing sources by priority and measured-at
//! timestamp, and keeping an auditable trail of every decision.

pub mod audit;
pub mod intake;
pub mod services;
pub mod store;
pub mod types;

pub use services::freshness_engine::FreshnessEngine;
pub use services::reconciler::Reconciler;
pub use types::{ApplyResult, RecordKey};
