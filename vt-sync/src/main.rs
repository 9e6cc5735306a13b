//! vt-sync - Health Data Reconciliation Service
//!
//! Drains the pending-sample queue on an interval, pushing each sample
//! through the freshness decision engine and reconciliation applier.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use vt_common::config;
use vt_common::db;
use vt_common::events::EventBus;
use vt_sync::audit::SqliteAuditSink;
use vt_sync::intake;
use vt_sync::store::SqliteRecordStore;
use vt_sync::Reconciler;

const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;
const DRAIN_BATCH_SIZE: i64 = 500;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting vt-sync (health data reconciliation)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let cli_root = std::env::args().nth(1);
    let root_folder = config::resolve_root_folder(cli_root.as_deref());
    std::fs::create_dir_all(&root_folder)?;

    let db_path = config::database_path(&root_folder);
    info!("Database: {}", db_path.display());
    let pool = db::init_database(&db_path).await?;

    let event_bus = EventBus::new(256);
    let store = Arc::new(SqliteRecordStore::new(pool.clone()));
    let audit = Arc::new(SqliteAuditSink::new(pool.clone()));
    let reconciler = Reconciler::new(store, audit, event_bus);

    let interval_secs = config::load_toml_config()
        .ok()
        .and_then(|c| c.sync_interval_secs)
        .unwrap_or(DEFAULT_SYNC_INTERVAL_SECS);
    info!("Drain interval: {}s", interval_secs);

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = intake::drain_pending(&pool, &reconciler, DRAIN_BATCH_SIZE).await {
                    warn!("drain cycle failed: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
