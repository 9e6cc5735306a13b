//! Pending-sample intake
//!
//! Import orchestrators (one per provider, outside this module) append raw
//! samples to the `pending_samples` table; `drain_pending` validates each
//! row, buckets it to a calendar date, and applies it through the
//! reconciler. One sample's failure never blocks the rest of the batch.
//!
//! Orchestrators must set `measured_at` to the provider's reported
//! measurement time, never the import/fetch time; the entire freshness
//! comparison rests on that distinction.

use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use vt_common::db::models::PendingSampleRow;
use vt_common::events::VtEvent;
use vt_common::metrics::{RawSample, SleepSession};
use vt_common::time::{self, parse_measured_at};
use vt_common::{Error, Result};

use crate::services::reconciler::Reconciler;
use crate::services::sleep_attributor;
use crate::types::DrainSummary;

/// Append a raw sample to the pending queue (the orchestrator handoff)
pub async fn enqueue_sample(pool: &SqlitePool, raw: &RawSample) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO pending_samples (
            id, user_id, field, value, source, measured_at, sleep_end, device_id, queued_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(raw.user_id.to_string())
    .bind(&raw.field)
    .bind(raw.value)
    .bind(&raw.source)
    .bind(&raw.measured_at)
    .bind(&raw.sleep_end)
    .bind(&raw.device_id)
    .bind(time::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

/// Take one batch off the queue and reconcile it
///
/// Invalid rows are dropped (with a `SampleInvalid` event); rows that hit a
/// storage failure stay queued and are retried on a later cycle, which is
/// safe because re-applying a sample is idempotent.
pub async fn drain_pending(
    pool: &SqlitePool,
    reconciler: &Reconciler,
    batch_size: i64,
) -> Result<DrainSummary> {
    let rows: Vec<PendingSampleRow> = sqlx::query_as(
        r#"
        SELECT id, user_id, field, value, source, measured_at, sleep_end, device_id
        FROM pending_samples
        ORDER BY queued_at
        LIMIT ?
        "#,
    )
    .bind(batch_size)
    .fetch_all(pool)
    .await?;

    let mut summary = DrainSummary::default();

    for row in rows {
        summary.processed += 1;
        let row_id = row.id.clone();

        match process_row(reconciler, row).await {
            Ok(accepted) => {
                if accepted {
                    summary.accepted += 1;
                } else {
                    summary.rejected += 1;
                }
                delete_sample(pool, &row_id).await?;
            }
            Err(Error::InvalidInput(detail)) => {
                summary.invalid += 1;
                warn!(row_id = %row_id, "dropping invalid sample: {}", detail);
                delete_sample(pool, &row_id).await?;
            }
            Err(e) => {
                // Storage trouble: leave the row queued for the next cycle
                summary.failed += 1;
                warn!(row_id = %row_id, "sample deferred: {}", e);
            }
        }
    }

    info!(
        processed = summary.processed,
        accepted = summary.accepted,
        rejected = summary.rejected,
        invalid = summary.invalid,
        failed = summary.failed,
        "intake drain cycle complete"
    );
    let _ = reconciler.events().emit(VtEvent::SyncCycleCompleted {
        processed: summary.processed,
        accepted: summary.accepted,
        rejected: summary.rejected,
        invalid: summary.invalid,
        timestamp: time::now(),
    });

    Ok(summary)
}

/// Validate, bucket, and apply one queued row; `Ok(accepted)`
async fn process_row(reconciler: &Reconciler, row: PendingSampleRow) -> Result<bool> {
    let raw = row.into_raw_sample()?;

    let result = validate_and_apply(reconciler, &raw).await;
    if let Err(Error::InvalidInput(detail)) = &result {
        let _ = reconciler.events().emit(VtEvent::SampleInvalid {
            user_id: raw.user_id,
            field: raw.field.clone(),
            detail: detail.clone(),
            timestamp: time::now(),
        });
    }
    result
}

async fn validate_and_apply(reconciler: &Reconciler, raw: &RawSample) -> Result<bool> {
    let sample = raw.validate()?;

    // Sleep-session rows carry the session end; their derived metrics
    // bucket under the attributed sleep date. Everything else buckets
    // under the measured-at local date.
    let date = match raw.sleep_end.as_deref() {
        Some(end) => {
            let session = SleepSession::new(sample.measured_at, parse_measured_at(end)?)?;
            sleep_attributor::attribute(&session)
        }
        None => sample.measured_at.date_naive(),
    };

    let applied = reconciler.apply(date, &sample).await?;
    Ok(applied.decision.accepted)
}

async fn delete_sample(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM pending_samples WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
