//! Database initialization
//!
//! Creates the database on first run and brings the schema up idempotently;
//! safe to call on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use sqlite options to create database if it doesn't exist
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode: concurrent readers with one writer, needed while several
    // provider sync tasks target the same database
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    apply_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables if missing (idempotent - safe to call multiple times)
///
/// Exposed separately so tests can apply the schema to in-memory pools.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_daily_metric_fields_table(pool).await?;
    create_pending_samples_table(pool).await?;
    create_reconciliation_audit_table(pool).await?;
    Ok(())
}

async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// One row per populated field of a daily record, provenance inline
async fn create_daily_metric_fields_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS daily_metric_fields (
            user_id TEXT NOT NULL,
            date TEXT NOT NULL,
            field TEXT NOT NULL,
            value REAL NOT NULL,
            source TEXT NOT NULL,
            measured_at TEXT NOT NULL,
            imported_at TEXT NOT NULL,
            device_id TEXT,
            PRIMARY KEY (user_id, date, field)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Staging table the import orchestrators append to; drained by vt-sync
async fn create_pending_samples_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pending_samples (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            field TEXT NOT NULL,
            value REAL NOT NULL,
            source TEXT NOT NULL,
            measured_at TEXT,
            sleep_end TEXT,
            device_id TEXT,
            queued_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Append-only log of every freshness decision
async fn create_reconciliation_audit_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reconciliation_audit (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            date TEXT NOT NULL,
            field TEXT NOT NULL,
            accepted INTEGER NOT NULL,
            reason TEXT NOT NULL,
            incoming_source TEXT NOT NULL,
            incoming_measured_at TEXT NOT NULL,
            existing_source TEXT,
            existing_measured_at TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
