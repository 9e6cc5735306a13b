//! Health-data source registry and priority table
//!
//! Every sample carries a `SourceId` naming where the measurement came from.
//! The set of sources is closed and known at build time; arbitration between
//! them uses the priority table below, not per-provider conditionals.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Registered origin of a health-metric sample
///
/// Variant order is the discriminant order used to index [`PRIORITY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    /// Manual entry through the dashboard; always wins arbitration
    Manual,
    /// Android Health Connect sync
    HealthConnect,
    /// Google Fit REST sync
    GoogleFit,
    /// Mi Fitness backup importer
    MiFitness,
}

/// Rank per source, indexed by discriminant. Higher rank wins arbitration.
///
/// Adding a provider is one new variant plus one line here. Ranks are
/// distinct: ties across different sources are not part of the order.
const PRIORITY: [u8; 4] = [
    40, // Manual
    30, // HealthConnect
    20, // GoogleFit
    10, // MiFitness
];

impl SourceId {
    /// All registered sources, in priority-table order
    pub const ALL: [SourceId; 4] = [
        SourceId::Manual,
        SourceId::HealthConnect,
        SourceId::GoogleFit,
        SourceId::MiFitness,
    ];

    /// Rank of this source in the priority order
    pub fn priority(self) -> u8 {
        PRIORITY[self as usize]
    }

    /// Stable identifier used in storage and on the wire
    pub fn as_str(self) -> &'static str {
        match self {
            SourceId::Manual => "manual",
            SourceId::HealthConnect => "health_connect",
            SourceId::GoogleFit => "google_fit",
            SourceId::MiFitness => "mi_fitness",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(SourceId::Manual),
            "health_connect" => Ok(SourceId::HealthConnect),
            "google_fit" => Ok(SourceId::GoogleFit),
            "mi_fitness" => Ok(SourceId::MiFitness),
            other => Err(Error::InvalidInput(format!(
                "unregistered source identifier: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_is_uniquely_highest() {
        for source in SourceId::ALL {
            if source != SourceId::Manual {
                assert!(SourceId::Manual.priority() > source.priority());
            }
        }
    }

    #[test]
    fn test_priority_order_is_strict() {
        // No two sources share a rank
        for a in SourceId::ALL {
            for b in SourceId::ALL {
                if a != b {
                    assert_ne!(a.priority(), b.priority(), "{} vs {}", a, b);
                }
            }
        }
    }

    #[test]
    fn test_health_connect_outranks_google_fit() {
        assert!(SourceId::HealthConnect.priority() > SourceId::GoogleFit.priority());
    }

    #[test]
    fn test_from_str_round_trip() {
        for source in SourceId::ALL {
            assert_eq!(source.as_str().parse::<SourceId>().unwrap(), source);
        }
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        let err = "fitbit".parse::<SourceId>().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
