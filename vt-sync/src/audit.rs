//! Append-only audit trail of freshness decisions
//!
//! Every decision is recorded, accepted or not. A sink failure must never
//! fail the reconciliation that produced it: failures are logged at `warn`
//! and swallowed.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::warn;
use uuid::Uuid;

use vt_common::metrics::FreshnessDecision;
use vt_common::time;
use vt_common::Result;

/// One audit record: the decision plus the key it was made for
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub field: String,
    pub decision: FreshnessDecision,
}

/// Append-only decision log
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record a decision. Infallible from the caller's point of view.
    async fn record(&self, entry: &AuditEntry);
}

/// SQLite sink writing to the `reconciliation_audit` table
pub struct SqliteAuditSink {
    pool: SqlitePool,
}

impl SqliteAuditSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn insert(&self, entry: &AuditEntry) -> Result<()> {
        let decision = &entry.decision;
        sqlx::query(
            r#"
            INSERT INTO reconciliation_audit (
                id, user_id, date, field, accepted, reason,
                incoming_source, incoming_measured_at,
                existing_source, existing_measured_at, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(entry.user_id.to_string())
        .bind(entry.date.to_string())
        .bind(&entry.field)
        .bind(decision.accepted as i64)
        .bind(decision.reason.as_str())
        .bind(decision.incoming.source.as_str())
        .bind(decision.incoming.measured_at.to_rfc3339())
        .bind(decision.existing.as_ref().map(|p| p.source.as_str()))
        .bind(decision.existing.as_ref().map(|p| p.measured_at.to_rfc3339()))
        .bind(time::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AuditSink for SqliteAuditSink {
    async fn record(&self, entry: &AuditEntry) {
        if let Err(e) = self.insert(entry).await {
            warn!(
                user_id = %entry.user_id,
                field = %entry.field,
                "audit entry dropped: {}",
                e
            );
        }
    }
}
