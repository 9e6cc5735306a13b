//! Freshness Decision Engine
//!
//! Compares an incoming sample against the stored provenance of one field
//! and decides whether the sample should overwrite it. One uniform policy
//! for every provider: source priority first, measured-at timestamp as the
//! tiebreaker within a priority level.
//!
//! The engine is pure: no storage access, no side effects beyond the
//! returned decision, safe to call concurrently and in dry runs.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use tracing::debug;

use vt_common::metrics::{DecisionReason, FieldProvenance, FreshnessDecision, IncomingSample};

/// Per-field arbitration between data sources
///
/// Decision policy, first matching rule wins:
/// 1. No existing provenance → accept.
/// 2. Higher-priority incoming source → accept, regardless of timestamps.
/// 3. Lower-priority incoming source → reject, regardless of timestamps.
/// 4. Equal priority → accept only a strictly newer measured-at; ties
///    reject, which makes repeated re-imports idempotent.
///
/// Rejection is a normal outcome, never an error. Input validity (a
/// registered source, a present measurement timestamp) is established
/// upstream when a `RawSample` is validated.
pub struct FreshnessEngine;

impl FreshnessEngine {
    pub fn new() -> Self {
        Self
    }

    /// Decide whether `incoming` overwrites the field currently described
    /// by `existing`. `imported_at` is the stamp the applier will put on
    /// the field if the decision is accepted.
    pub fn decide(
        &self,
        incoming: &IncomingSample,
        existing: Option<&FieldProvenance>,
        imported_at: DateTime<Utc>,
    ) -> FreshnessDecision {
        let incoming_provenance = incoming.provenance(imported_at);

        let Some(existing) = existing else {
            return FreshnessDecision {
                accepted: true,
                reason: DecisionReason::NoExistingData,
                incoming: incoming_provenance,
                existing: None,
            };
        };

        let (accepted, reason) = match incoming
            .source
            .priority()
            .cmp(&existing.source.priority())
        {
            Ordering::Greater => (true, DecisionReason::HigherPrioritySource),
            Ordering::Less => (false, DecisionReason::LowerPrioritySource),
            // Same priority (including the same source re-imported):
            // measured-at instants arbitrate, strictly newer wins
            Ordering::Equal => {
                if incoming.measured_at > existing.measured_at {
                    (true, DecisionReason::NewerTimestamp)
                } else {
                    (false, DecisionReason::ExistingNewerOrSameAge)
                }
            }
        };

        debug!(
            field = %incoming.field,
            incoming_source = %incoming.source,
            existing_source = %existing.source,
            accepted,
            reason = %reason,
            "freshness decision"
        );

        FreshnessDecision {
            accepted,
            reason,
            incoming: incoming_provenance,
            existing: Some(existing.clone()),
        }
    }
}

impl Default for FreshnessEngine {
    fn default() -> Self {
        Self::new()
    }
}
