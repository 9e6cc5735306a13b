//! Persistence collaborator for daily health records
//!
//! The reconciler reads and writes exclusively through [`RecordStore`];
//! it never caches records across calls, so every decision is made against
//! a freshly read snapshot. The SQLite implementation keeps one row per
//! populated field, which gives field-level provenance columns directly.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use uuid::Uuid;

use vt_common::db::models::MetricFieldRow;
use vt_common::metrics::DailyHealthRecord;
use vt_common::Result;

/// Read/write access to per-day records
///
/// Implementations must provide read-your-writes consistency for a single
/// caller. Cross-call locking is not required here; the reconciler owns
/// per-key serialization.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read the stored record for (user, date), or `None` if absent
    async fn read_record(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<DailyHealthRecord>>;

    /// Persist the record, replacing stored field rows with its contents
    async fn write_record(&self, record: &DailyHealthRecord) -> Result<()>;
}

/// SQLite-backed record store over the `daily_metric_fields` table
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn read_record(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<DailyHealthRecord>> {
        let rows: Vec<MetricFieldRow> = sqlx::query_as(
            r#"
            SELECT user_id, date, field, value, source, measured_at, imported_at, device_id
            FROM daily_metric_fields
            WHERE user_id = ? AND date = ?
            "#,
        )
        .bind(user_id.to_string())
        .bind(date.to_string())
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut record = DailyHealthRecord::empty(user_id, date);
        for row in rows {
            let (field, entry) = row.into_field_entry()?;
            record.fields.insert(field, entry);
        }
        Ok(Some(record))
    }

    async fn write_record(&self, record: &DailyHealthRecord) -> Result<()> {
        // One upsert per field; records are mutated a field at a time, so
        // this touches exactly the rows the applier changed or confirmed.
        for (field, entry) in &record.fields {
            sqlx::query(
                r#"
                INSERT INTO daily_metric_fields (
                    user_id, date, field, value, source, measured_at, imported_at, device_id
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (user_id, date, field) DO UPDATE SET
                    value = excluded.value,
                    source = excluded.source,
                    measured_at = excluded.measured_at,
                    imported_at = excluded.imported_at,
                    device_id = excluded.device_id
                "#,
            )
            .bind(record.user_id.to_string())
            .bind(record.date.to_string())
            .bind(field)
            .bind(entry.value)
            .bind(entry.provenance.source.as_str())
            .bind(entry.provenance.measured_at.to_rfc3339())
            .bind(entry.provenance.imported_at.to_rfc3339())
            .bind(&entry.provenance.device_id)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }
}
