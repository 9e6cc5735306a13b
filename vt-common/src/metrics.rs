//! Core metric types: daily records, field provenance, samples, decisions
//!
//! A `DailyHealthRecord` holds one day's metrics for one user, each field
//! carrying the provenance of the sample that last wrote it. Records are
//! created lazily on first accepted write and are mutated one field at a
//! time by the reconciliation applier, never replaced wholesale.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::sources::SourceId;
use crate::time::parse_measured_at;
use crate::{Error, Result};

/// Which source, at what measured time, produced a stored field's value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldProvenance {
    pub source: SourceId,
    /// Time the physical measurement occurred, as reported by the source,
    /// with its originating UTC offset. Never the import/fetch time.
    pub measured_at: DateTime<FixedOffset>,
    /// Time this value was written by the applier
    pub imported_at: DateTime<Utc>,
    pub device_id: Option<String>,
}

/// One stored field: value plus the provenance that put it there
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub value: f64,
    pub provenance: FieldProvenance,
}

/// One user's metrics for one calendar date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyHealthRecord {
    pub user_id: Uuid,
    pub date: NaiveDate,
    /// Field name (e.g. `steps`, `resting_heart_rate`) → value + provenance
    pub fields: HashMap<String, FieldEntry>,
}

impl DailyHealthRecord {
    /// Empty record for a (user, date) pair that has no stored data yet
    pub fn empty(user_id: Uuid, date: NaiveDate) -> Self {
        Self {
            user_id,
            date,
            fields: HashMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldEntry> {
        self.fields.get(name)
    }

    /// Replace one field's value and provenance, leaving all others intact
    pub fn set_field(&mut self, name: &str, value: f64, provenance: FieldProvenance) {
        self.fields
            .insert(name.to_string(), FieldEntry { value, provenance });
    }
}

/// Validated sample produced by an import orchestrator, consumed by the
/// reconciliation engine and discarded after a decision is made
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingSample {
    pub user_id: Uuid,
    pub field: String,
    pub value: f64,
    pub source: SourceId,
    pub measured_at: DateTime<FixedOffset>,
    pub device_id: Option<String>,
}

impl IncomingSample {
    /// Provenance this sample would stamp on a field if accepted
    pub fn provenance(&self, imported_at: DateTime<Utc>) -> FieldProvenance {
        FieldProvenance {
            source: self.source,
            measured_at: self.measured_at,
            imported_at,
            device_id: self.device_id.clone(),
        }
    }
}

/// Unvalidated orchestrator handoff row
///
/// Source and timestamp arrive as provider-reported strings; `validate`
/// is where unregistered sources and missing or unparseable measurement
/// timestamps surface as [`Error::InvalidInput`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSample {
    pub user_id: Uuid,
    pub field: String,
    pub value: f64,
    pub source: String,
    /// RFC 3339 with offset; for sleep-session rows this is the session start
    pub measured_at: Option<String>,
    /// Session end, present only for sleep-session rows
    pub sleep_end: Option<String>,
    pub device_id: Option<String>,
}

impl RawSample {
    /// Validate into an [`IncomingSample`], dropping nothing silently
    pub fn validate(&self) -> Result<IncomingSample> {
        let source: SourceId = self.source.parse()?;
        let raw_ts = self.measured_at.as_deref().ok_or_else(|| {
            Error::InvalidInput(format!(
                "sample for field {:?} has no measurement timestamp",
                self.field
            ))
        })?;
        let measured_at = parse_measured_at(raw_ts)?;

        Ok(IncomingSample {
            user_id: self.user_id,
            field: self.field.clone(),
            value: self.value,
            source,
            measured_at,
            device_id: self.device_id.clone(),
        })
    }
}

/// Fixed reason set for freshness decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    NoExistingData,
    HigherPrioritySource,
    LowerPrioritySource,
    NewerTimestamp,
    ExistingNewerOrSameAge,
}

impl DecisionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionReason::NoExistingData => "no existing data",
            DecisionReason::HigherPrioritySource => "higher-priority source",
            DecisionReason::LowerPrioritySource => "lower-priority source",
            DecisionReason::NewerTimestamp => "newer timestamp, same-priority source",
            DecisionReason::ExistingNewerOrSameAge => "existing data is newer or same age",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one freshness comparison; returned to the caller and logged,
/// never persisted as state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreshnessDecision {
    pub accepted: bool,
    pub reason: DecisionReason,
    pub incoming: FieldProvenance,
    pub existing: Option<FieldProvenance>,
}

/// A sleep session as reported by a provider
///
/// Construction enforces `end > start`, so downstream consumers (the
/// sleep-night attributor in particular) can assume a positive duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SleepSession {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

impl SleepSession {
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Result<Self> {
        if end <= start {
            return Err(Error::InvalidInput(format!(
                "sleep session end {} is not after start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }

    /// Whole minutes between start and end
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}
