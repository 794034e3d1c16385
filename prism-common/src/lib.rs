//! # Prism Common Library
//!
//! Shared code for the Prism sandbox tooling:
//! - Parameter resolution (working directories, database connection)
//! - Layered configuration (CLI, environment, TOML, compiled defaults)
//! - Database connection and schema migrations
//! - Process-wide bootstrap of the migrated backend

pub mod bootstrap;
pub mod config;
pub mod db;
pub mod error;

pub use config::{DatabaseDriver, Params, ParamsOverrides};
pub use error::{Error, Result};
