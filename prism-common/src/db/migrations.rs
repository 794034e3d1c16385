//! Database schema migrations
//!
//! Versioned schema migrations tracked in the `schema_version` table.
//! Running them against an already-migrated database is a no-op, so every
//! consumer of the sandbox may call [`run_migrations`] on startup.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases migrated by older builds depend on them
//! 2. **Always add new migrations** - one function per schema change, bump `CURRENT_SCHEMA_VERSION`
//! 3. **Portable SQL only** - statements must run on both SQLite and MySQL

use crate::Result;
use sqlx::AnyPool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i64 = 3;

async fn create_schema_version_table(pool: &AnyPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version BIGINT PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Get current schema version from database
///
/// Returns 0 for a database that has never been migrated
pub async fn get_schema_version(pool: &AnyPool) -> Result<i64> {
    create_schema_version_table(pool).await?;

    let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &AnyPool, version: i64) -> Result<()> {
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
///
/// Returns the number of migrations applied (0 when already up to date).
pub async fn run_migrations(pool: &AnyPool) -> Result<u32> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(0);
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(0);
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    let mut applied = 0;

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        applied += 1;
        info!("Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        applied += 1;
        info!("Migration v2 completed");
    }

    if current_version < 3 {
        migrate_v3(pool).await?;
        set_schema_version(pool, 3).await?;
        applied += 1;
        info!("Migration v3 completed");
    }

    Ok(applied)
}

/// Migration v1: sandbox library tables
async fn migrate_v1(pool: &AnyPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS albums (
            album_uid VARCHAR(64) PRIMARY KEY,
            album_name VARCHAR(255) NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS photos (
            photo_uid VARCHAR(64) PRIMARY KEY,
            photo_title VARCHAR(255) NOT NULL DEFAULT '',
            taken_at TIMESTAMP NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS photo_files (
            file_hash VARCHAR(64) PRIMARY KEY,
            photo_uid VARCHAR(64) NOT NULL,
            file_name VARCHAR(1024) NOT NULL,
            file_type VARCHAR(32) NOT NULL,
            file_size BIGINT NOT NULL DEFAULT 0,
            FOREIGN KEY (photo_uid) REFERENCES photos(photo_uid) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Migration v2: favorite flag on photos
async fn migrate_v2(pool: &AnyPool) -> Result<()> {
    sqlx::query("ALTER TABLE photos ADD COLUMN photo_favorite INTEGER NOT NULL DEFAULT 0")
        .execute(pool)
        .await?;

    Ok(())
}

/// Migration v3: key/value settings
///
/// `key` is reserved in MySQL, hence the prefixed column names.
async fn migrate_v3(pool: &AnyPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            setting_key VARCHAR(255) PRIMARY KEY,
            setting_value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
