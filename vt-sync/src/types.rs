//! Shared types for the reconciliation module

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vt_common::metrics::FreshnessDecision;

/// Serialization unit for reconciliation: one field of one user's day
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub field: String,
}

/// Outcome of one applied sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    pub decision: FreshnessDecision,
    /// Whether the store was written (accepted decisions only)
    pub written: bool,
}

/// Counters for one intake drain cycle
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DrainSummary {
    /// Rows taken from the pending queue
    pub processed: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// Rows dropped by validation
    pub invalid: usize,
    /// Rows left queued after a storage failure, to be retried next cycle
    pub failed: usize,
}
