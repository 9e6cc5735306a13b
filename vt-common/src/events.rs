//! Event types and event bus for the VitalTrack modules
//!
//! Reconciliation outcomes are broadcast so the dashboard layer can refresh
//! without polling. Emission is non-blocking; slow or absent subscribers
//! never affect reconciliation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::metrics::DecisionReason;
use crate::sources::SourceId;

/// VitalTrack event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VtEvent {
    /// An incoming sample won arbitration and was written
    SampleAccepted {
        user_id: Uuid,
        date: NaiveDate,
        field: String,
        source: SourceId,
        reason: DecisionReason,
        timestamp: DateTime<Utc>,
    },

    /// An incoming sample lost arbitration; nothing was written
    SampleRejected {
        user_id: Uuid,
        date: NaiveDate,
        field: String,
        source: SourceId,
        reason: DecisionReason,
        timestamp: DateTime<Utc>,
    },

    /// A sample failed validation and was dropped
    SampleInvalid {
        user_id: Uuid,
        field: String,
        detail: String,
        timestamp: DateTime<Utc>,
    },

    /// One intake drain cycle finished
    SyncCycleCompleted {
        processed: usize,
        accepted: usize,
        rejected: usize,
        invalid: usize,
        timestamp: DateTime<Utc>,
    },
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally: non-blocking publish, multiple
/// concurrent subscribers, automatic cleanup when subscribers drop.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<VtEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<VtEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns the subscriber count, or `Err` if nobody is listening.
    /// Callers treat both outcomes as success.
    pub fn emit(&self, event: VtEvent) -> Result<usize, broadcast::error::SendError<VtEvent>> {
        self.tx.send(event)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
