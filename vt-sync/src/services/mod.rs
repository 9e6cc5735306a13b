//! Reconciliation services

pub mod freshness_engine;
pub mod reconciler;
pub mod sleep_attributor;
