//! Command-line/environment layer for parameter resolution
//!
//! Flattened into each binary's `Args` so the fixture provisioner and the
//! server accept the same flags and resolve identical parameters.

use super::{expand_path, DatabaseDriver, Params, ParamsOverrides, TomlConfig};
use crate::Result;
use clap::builder::BoolishValueParser;
use clap::Args;
use std::path::{Path, PathBuf};

/// Parameter flags shared by all Prism binaries
#[derive(Args, Debug, Clone, Default)]
pub struct ParamsArgs {
    /// Enable debug logging (env accepts 1/0, yes/no, on/off, true/false)
    #[arg(long, env = "PRISM_DEBUG", value_parser = BoolishValueParser::new())]
    pub debug: bool,

    /// TOML config file
    #[arg(long, env = "PRISM_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Assets root; the sandbox lives in <assets-path>/testdata
    #[arg(long, env = "PRISM_ASSETS_PATH")]
    pub assets_path: Option<String>,

    /// Cache directory (default <assets-path>/testdata/cache)
    #[arg(long, env = "PRISM_CACHE_PATH")]
    pub cache_path: Option<PathBuf>,

    /// Originals directory (default <assets-path>/testdata/originals)
    #[arg(long, env = "PRISM_ORIGINALS_PATH")]
    pub originals_path: Option<PathBuf>,

    /// Import directory (default <assets-path>/testdata/import)
    #[arg(long, env = "PRISM_IMPORT_PATH")]
    pub import_path: Option<PathBuf>,

    /// Export directory (default <assets-path>/testdata/export)
    #[arg(long, env = "PRISM_EXPORT_PATH")]
    pub export_path: Option<PathBuf>,

    /// darktable-cli binary used for RAW conversion
    #[arg(long, env = "PRISM_DARKTABLE_CLI")]
    pub darktable_cli: Option<PathBuf>,

    /// Database driver (sqlite, mysql)
    #[arg(long, env = "PRISM_DATABASE_DRIVER")]
    pub database_driver: Option<DatabaseDriver>,

    /// Database connection URL
    #[arg(long, env = "PRISM_DATABASE_DSN")]
    pub database_dsn: Option<String>,
}

impl ParamsArgs {
    /// Highest-priority override layer (arguments and environment)
    pub fn overrides(&self) -> ParamsOverrides {
        ParamsOverrides {
            debug: self.debug.then_some(true),
            config_file: self.config_file_path(),
            assets_path: self.assets_path.as_deref().map(expand_path),
            cache_path: self.cache_path.clone(),
            originals_path: self.originals_path.clone(),
            import_path: self.import_path.clone(),
            export_path: self.export_path.clone(),
            darktable_cli: self.darktable_cli.clone(),
            database_driver: self.database_driver,
            database_dsn: self.database_dsn.clone(),
        }
    }

    /// Load the config file named by `--config-file`, if any
    pub fn load_toml(&self) -> Result<TomlConfig> {
        match self.config_file_path() {
            Some(path) => TomlConfig::load(&path),
            None => Ok(TomlConfig::default()),
        }
    }

    /// Resolve parameters from all layers
    ///
    /// Returns the loaded TOML config alongside so callers can read sections
    /// that are not part of [`Params`] (e.g. `[fixtures]`).
    pub fn resolve(&self) -> Result<(Params, TomlConfig)> {
        let toml_config = self.load_toml()?;
        let base_dir = self
            .config_file_path()
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let params = self
            .overrides()
            .or(toml_config.overrides(&base_dir))
            .into_params();

        Ok((params, toml_config))
    }

    fn config_file_path(&self) -> Option<PathBuf> {
        self.config_file.as_deref().map(expand_path)
    }
}
