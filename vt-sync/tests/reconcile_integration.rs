// Integration tests for the read-decide-write reconciliation path.
//
// Uses in-memory SQLite; no network, no fixtures.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate};
use sqlx::SqlitePool;
use uuid::Uuid;

use vt_common::db::apply_schema;
use vt_common::events::EventBus;
use vt_common::metrics::{DailyHealthRecord, DecisionReason, IncomingSample};
use vt_common::sources::SourceId;
use vt_common::Error;
use vt_sync::audit::SqliteAuditSink;
use vt_sync::store::{RecordStore, SqliteRecordStore};
use vt_sync::Reconciler;

async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    apply_schema(&pool).await.unwrap();
    pool
}

fn reconciler(pool: &SqlitePool) -> Reconciler {
    Reconciler::new(
        Arc::new(SqliteRecordStore::new(pool.clone())),
        Arc::new(SqliteAuditSink::new(pool.clone())),
        EventBus::new(64),
    )
}

fn ts(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).unwrap()
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn sample(
    user_id: Uuid,
    field: &str,
    value: f64,
    source: SourceId,
    measured_at: &str,
) -> IncomingSample {
    IncomingSample {
        user_id,
        field: field.to_string(),
        value,
        source,
        measured_at: ts(measured_at),
        device_id: None,
    }
}

async fn audit_rows(pool: &SqlitePool) -> Vec<(String, i64, String)> {
    sqlx::query_as("SELECT field, accepted, reason FROM reconciliation_audit ORDER BY rowid")
        .fetch_all(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_first_sample_creates_record_lazily() {
    let pool = setup_test_db().await;
    let reconciler = reconciler(&pool);
    let store = SqliteRecordStore::new(pool.clone());
    let user_id = Uuid::new_v4();
    let day = date("2025-08-14");

    assert!(store.read_record(user_id, day).await.unwrap().is_none());

    let result = reconciler
        .apply(
            day,
            &sample(user_id, "steps", 7000.0, SourceId::GoogleFit, "2025-08-14T23:00:00Z"),
        )
        .await
        .unwrap();
    assert!(result.written);
    assert_eq!(result.decision.reason, DecisionReason::NoExistingData);

    let record = store.read_record(user_id, day).await.unwrap().unwrap();
    assert_eq!(record.field("steps").unwrap().value, 7000.0);
}

#[tokio::test]
async fn test_higher_priority_source_overwrites_despite_older_timestamp() {
    let pool = setup_test_db().await;
    let reconciler = reconciler(&pool);
    let store = SqliteRecordStore::new(pool.clone());
    let user_id = Uuid::new_v4();
    let day = date("2025-08-14");

    // Stored: GoogleFit steps=7000 measured 23:00Z
    reconciler
        .apply(
            day,
            &sample(user_id, "steps", 7000.0, SourceId::GoogleFit, "2025-08-14T23:00:00Z"),
        )
        .await
        .unwrap();

    // Incoming: HealthConnect steps=7768 measured an hour EARLIER
    let result = reconciler
        .apply(
            day,
            &sample(user_id, "steps", 7768.0, SourceId::HealthConnect, "2025-08-14T22:00:00Z"),
        )
        .await
        .unwrap();

    assert!(result.written);
    assert_eq!(result.decision.reason, DecisionReason::HigherPrioritySource);

    let record = store.read_record(user_id, day).await.unwrap().unwrap();
    let entry = record.field("steps").unwrap();
    assert_eq!(entry.value, 7768.0);
    assert_eq!(entry.provenance.source, SourceId::HealthConnect);
}

#[tokio::test]
async fn test_manual_entry_survives_newer_automatic_import() {
    let pool = setup_test_db().await;
    let reconciler = reconciler(&pool);
    let store = SqliteRecordStore::new(pool.clone());
    let user_id = Uuid::new_v4();
    let day = date("2025-08-14");

    reconciler
        .apply(
            day,
            &sample(user_id, "weight_kg", 72.5, SourceId::Manual, "2025-08-14T08:00:00Z"),
        )
        .await
        .unwrap();

    let result = reconciler
        .apply(
            day,
            &sample(user_id, "weight_kg", 73.1, SourceId::HealthConnect, "2025-08-14T09:00:00Z"),
        )
        .await
        .unwrap();

    assert!(!result.written);
    assert_eq!(result.decision.reason, DecisionReason::LowerPrioritySource);

    let record = store.read_record(user_id, day).await.unwrap().unwrap();
    assert_eq!(record.field("weight_kg").unwrap().value, 72.5);
    assert_eq!(
        record.field("weight_kg").unwrap().provenance.source,
        SourceId::Manual
    );
}

#[tokio::test]
async fn test_applying_identical_sample_twice_is_idempotent() {
    let pool = setup_test_db().await;
    let reconciler = reconciler(&pool);
    let store = SqliteRecordStore::new(pool.clone());
    let user_id = Uuid::new_v4();
    let day = date("2025-08-14");
    let s = sample(user_id, "steps", 9100.0, SourceId::MiFitness, "2025-08-14T21:00:00Z");

    let first = reconciler.apply(day, &s).await.unwrap();
    let second = reconciler.apply(day, &s).await.unwrap();

    assert!(first.written);
    assert!(!second.written);
    assert_eq!(
        second.decision.reason,
        DecisionReason::ExistingNewerOrSameAge
    );

    // The stored provenance still comes from the first write
    let record = store.read_record(user_id, day).await.unwrap().unwrap();
    assert_eq!(
        record.field("steps").unwrap().provenance.imported_at,
        first.decision.incoming.imported_at
    );

    let rows = audit_rows(&pool).await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].1, 1);
    assert_eq!(rows[1].1, 0);
    assert_eq!(rows[1].2, "existing data is newer or same age");
}

#[tokio::test]
async fn test_two_sources_own_different_fields_of_the_same_day() {
    let pool = setup_test_db().await;
    let reconciler = reconciler(&pool);
    let store = SqliteRecordStore::new(pool.clone());
    let user_id = Uuid::new_v4();
    let day = date("2025-08-14");

    reconciler
        .apply(
            day,
            &sample(user_id, "steps", 7768.0, SourceId::GoogleFit, "2025-08-14T23:00:00Z"),
        )
        .await
        .unwrap();
    reconciler
        .apply(
            day,
            &sample(
                user_id,
                "resting_heart_rate",
                52.0,
                SourceId::MiFitness,
                "2025-08-14T07:00:00Z",
            ),
        )
        .await
        .unwrap();

    let record = store.read_record(user_id, day).await.unwrap().unwrap();
    assert_eq!(record.field("steps").unwrap().provenance.source, SourceId::GoogleFit);
    assert_eq!(
        record.field("resting_heart_rate").unwrap().provenance.source,
        SourceId::MiFitness
    );
}

#[tokio::test]
async fn test_sample_past_attribution_deadline_is_invalid() {
    let pool = setup_test_db().await;
    let reconciler = reconciler(&pool);
    let user_id = Uuid::new_v4();

    // Measured two days after the day it claims to belong to
    let result = reconciler
        .apply(
            date("2025-08-14"),
            &sample(user_id, "steps", 100.0, SourceId::GoogleFit, "2025-08-16T12:00:00Z"),
        )
        .await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));

    // Nothing was decided, nothing audited
    assert!(audit_rows(&pool).await.is_empty());
}

struct WriteFailingStore;

#[async_trait::async_trait]
impl RecordStore for WriteFailingStore {
    async fn read_record(
        &self,
        _user_id: Uuid,
        _date: NaiveDate,
    ) -> vt_common::Result<Option<DailyHealthRecord>> {
        Ok(None)
    }

    async fn write_record(&self, _record: &DailyHealthRecord) -> vt_common::Result<()> {
        Err(sqlx::Error::PoolClosed.into())
    }
}

#[tokio::test]
async fn test_storage_failure_discards_decision_without_audit() {
    let pool = setup_test_db().await;
    let reconciler = Reconciler::new(
        Arc::new(WriteFailingStore),
        Arc::new(SqliteAuditSink::new(pool.clone())),
        EventBus::new(64),
    );
    let user_id = Uuid::new_v4();

    let result = reconciler
        .apply(
            date("2025-08-14"),
            &sample(user_id, "steps", 100.0, SourceId::GoogleFit, "2025-08-14T12:00:00Z"),
        )
        .await;
    assert!(matches!(result, Err(Error::Database(_))));

    // The in-memory decision was discarded before any audit entry
    assert!(audit_rows(&pool).await.is_empty());
}
