//! Database connection setup
//!
//! Connections go through sqlx's `Any` driver so the sandbox can target either
//! an SQLite file/in-memory database or a MySQL server, selected by
//! `database_driver` and `database_dsn`.

use crate::config::{DatabaseDriver, Params};
use crate::{Error, Result};
use sqlx::any::{AnyPoolOptions, install_default_drivers};
use sqlx::{AnyPool, Executor};
use std::path::PathBuf;
use tracing::info;

/// Open a connection pool for the configured database
///
/// **Behavior:**
/// - DSN scheme must match the configured driver, otherwise `Error::Config`
/// - SQLite file databases get their parent directory created
/// - In-memory SQLite is pinned to a single long-lived connection, since every
///   new connection would otherwise see an empty database
pub async fn connect(params: &Params) -> Result<AnyPool> {
    install_default_drivers();

    let driver = params.database_driver;
    let dsn = params.database_dsn.as_str();

    if !dsn.starts_with(driver.scheme()) {
        return Err(Error::Config(format!(
            "database_dsn does not match driver '{}' (expected '{}' prefix)",
            driver,
            driver.scheme()
        )));
    }

    let mut options = AnyPoolOptions::new();

    if driver == DatabaseDriver::Sqlite {
        match sqlite_file_path(dsn) {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                options = options.max_connections(5);
            }
            None => {
                options = options
                    .min_connections(1)
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None);
            }
        }

        options = options.after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("PRAGMA foreign_keys = ON").await?;
                Ok(())
            })
        });
    } else {
        options = options.max_connections(10);
    }

    let pool = options.connect(dsn).await?;

    info!(driver = %driver, "Database connection established");

    Ok(pool)
}

/// File backing an SQLite DSN, `None` for in-memory databases
fn sqlite_file_path(dsn: &str) -> Option<PathBuf> {
    let rest = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();

    if path.is_empty() || path == ":memory:" || rest.contains("mode=memory") {
        None
    } else {
        Some(PathBuf::from(path))
    }
}
