//! Reconciliation Applier
//!
//! Owns the read-decide-write sequence for incoming samples. All work on a
//! single (user, date, field) key is serialized behind a keyed async mutex
//! acquired before the read and released after the write; work on different
//! keys shares nothing and proceeds fully in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::info;

use vt_common::events::{EventBus, VtEvent};
use vt_common::metrics::{DailyHealthRecord, IncomingSample};
use vt_common::time;
use vt_common::{Error, Result};

use crate::audit::{AuditEntry, AuditSink};
use crate::services::freshness_engine::FreshnessEngine;
use crate::store::RecordStore;
use crate::types::{ApplyResult, RecordKey};

/// Applies incoming samples to stored records through the freshness policy
pub struct Reconciler {
    store: Arc<dyn RecordStore>,
    audit: Arc<dyn AuditSink>,
    events: EventBus,
    engine: FreshnessEngine,
    /// Per-key serialization scopes. Entries are created on first use and
    /// kept for the process lifetime; one per distinct key seen.
    locks: Mutex<HashMap<RecordKey, Arc<Mutex<()>>>>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn RecordStore>, audit: Arc<dyn AuditSink>, events: EventBus) -> Self {
        Self {
            store,
            audit,
            events,
            engine: FreshnessEngine::new(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Apply one sample to the (user, `date`) record
    ///
    /// Reads a fresh snapshot, asks the decision engine whether the
    /// sample's field should be overwritten, writes back only on accept,
    /// and audits the decision either way. Applying the identical sample
    /// twice yields accept-then-reject and exactly one write.
    ///
    /// On a storage failure the decision is discarded and the error is
    /// surfaced; the caller retries the whole sample later. No partial
    /// field mutation is possible.
    pub async fn apply(&self, date: NaiveDate, sample: &IncomingSample) -> Result<ApplyResult> {
        if sample.measured_at.naive_local() > time::attribution_deadline(date) {
            return Err(Error::InvalidInput(format!(
                "sample for field {:?} measured at {} cannot belong to {}",
                sample.field, sample.measured_at, date
            )));
        }

        let key = RecordKey {
            user_id: sample.user_id,
            date,
            field: sample.field.clone(),
        };
        let key_lock = self.lock_for(key).await;
        let _guard = key_lock.lock().await;

        // Snapshot must be read under the lock: a concurrent accept on the
        // same key between read and write would otherwise be overwritten
        // without ever being compared against.
        let mut record = self
            .store
            .read_record(sample.user_id, date)
            .await?
            .unwrap_or_else(|| DailyHealthRecord::empty(sample.user_id, date));

        let existing = record.field(&sample.field).map(|e| e.provenance.clone());
        let decision = self.engine.decide(sample, existing.as_ref(), time::now());

        let written = if decision.accepted {
            record.set_field(&sample.field, sample.value, decision.incoming.clone());
            self.store.write_record(&record).await?;
            true
        } else {
            false
        };

        info!(
            user_id = %sample.user_id,
            date = %date,
            field = %sample.field,
            source = %sample.source,
            accepted = decision.accepted,
            reason = %decision.reason,
            "sample reconciled"
        );

        self.audit
            .record(&AuditEntry {
                user_id: sample.user_id,
                date,
                field: sample.field.clone(),
                decision: decision.clone(),
            })
            .await;

        let event = if decision.accepted {
            VtEvent::SampleAccepted {
                user_id: sample.user_id,
                date,
                field: sample.field.clone(),
                source: sample.source,
                reason: decision.reason,
                timestamp: time::now(),
            }
        } else {
            VtEvent::SampleRejected {
                user_id: sample.user_id,
                date,
                field: sample.field.clone(),
                source: sample.source,
                reason: decision.reason,
                timestamp: time::now(),
            }
        };
        // Nobody listening is fine
        let _ = self.events.emit(event);

        Ok(ApplyResult { decision, written })
    }

    async fn lock_for(&self, key: RecordKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(key).or_default().clone()
    }
}
