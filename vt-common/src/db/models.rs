//! Database row models and conversions to domain types
//!
//! Timestamps are stored as RFC 3339 text so the measured-at offset survives
//! the round trip; dates as ISO `YYYY-MM-DD`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metrics::{FieldEntry, FieldProvenance, RawSample};
use crate::time::parse_measured_at;
use crate::{Error, Result};

/// Row of `daily_metric_fields`
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MetricFieldRow {
    pub user_id: String,
    pub date: String,
    pub field: String,
    pub value: f64,
    pub source: String,
    pub measured_at: String,
    pub imported_at: String,
    pub device_id: Option<String>,
}

impl MetricFieldRow {
    /// Convert into the field-name/entry pair of a daily record
    pub fn into_field_entry(self) -> Result<(String, FieldEntry)> {
        let source = self.source.parse()?;
        let measured_at = parse_measured_at(&self.measured_at)?;
        let imported_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&self.imported_at)
            .map_err(|e| {
                Error::InvalidInput(format!(
                    "stored imported_at {:?} is unparseable: {}",
                    self.imported_at, e
                ))
            })?
            .with_timezone(&Utc);

        Ok((
            self.field,
            FieldEntry {
                value: self.value,
                provenance: FieldProvenance {
                    source,
                    measured_at,
                    imported_at,
                    device_id: self.device_id,
                },
            },
        ))
    }
}

/// Parse a stored `YYYY-MM-DD` date column
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    raw.parse()
        .map_err(|e| Error::InvalidInput(format!("stored date {:?} is unparseable: {}", raw, e)))
}

/// Parse a stored user id column
pub fn parse_user_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|e| Error::InvalidInput(format!("stored user id {:?} is unparseable: {}", raw, e)))
}

/// Row of `pending_samples`
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PendingSampleRow {
    pub id: String,
    pub user_id: String,
    pub field: String,
    pub value: f64,
    pub source: String,
    pub measured_at: Option<String>,
    pub sleep_end: Option<String>,
    pub device_id: Option<String>,
}

impl PendingSampleRow {
    /// Convert into the unvalidated orchestrator handoff type
    pub fn into_raw_sample(self) -> Result<RawSample> {
        Ok(RawSample {
            user_id: parse_user_id(&self.user_id)?,
            field: self.field,
            value: self.value,
            source: self.source,
            measured_at: self.measured_at,
            sleep_end: self.sleep_end,
            device_id: self.device_id,
        })
    }
}
