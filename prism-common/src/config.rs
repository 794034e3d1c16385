//! Parameter resolution and layered configuration
//!
//! The resolved [`Params`] is the single source of truth for every working
//! directory the sandbox uses. The fixture provisioner, the route layer and the
//! schema bootstrap each resolve it independently, so resolution must be a pure
//! function of its inputs.
//!
//! Override priority, highest first:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled defaults

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

pub mod cli;

pub use cli::ParamsArgs;

/// Sandbox subtree below the assets root
pub const TEST_DATA_DIR: &str = "testdata";

/// Default path of the darktable command-line converter
pub const DEFAULT_DARKTABLE_CLI: &str = "/usr/bin/darktable-cli";

/// Default sandbox connection string (private in-memory database)
pub const DEFAULT_DATABASE_DSN: &str = "sqlite::memory:";

/// Supported database drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    #[default]
    Sqlite,
    Mysql,
}

impl DatabaseDriver {
    /// URL scheme a DSN for this driver must start with
    pub fn scheme(&self) -> &'static str {
        match self {
            DatabaseDriver::Sqlite => "sqlite:",
            DatabaseDriver::Mysql => "mysql:",
        }
    }
}

impl fmt::Display for DatabaseDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseDriver::Sqlite => write!(f, "sqlite"),
            DatabaseDriver::Mysql => write!(f, "mysql"),
        }
    }
}

impl FromStr for DatabaseDriver {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(DatabaseDriver::Sqlite),
            "mysql" => Ok(DatabaseDriver::Mysql),
            other => Err(format!("unsupported database driver '{}'", other)),
        }
    }
}

/// Resolved sandbox parameters
///
/// Immutable once built. Construct with [`Params::resolve`] or
/// [`ParamsOverrides::into_params`]; share as `&Params` or `Arc<Params>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    pub debug: bool,
    pub config_file: Option<PathBuf>,
    pub assets_path: PathBuf,
    pub cache_path: PathBuf,
    pub originals_path: PathBuf,
    pub import_path: PathBuf,
    pub export_path: PathBuf,
    pub darktable_cli: PathBuf,
    pub database_driver: DatabaseDriver,
    pub database_dsn: String,
}

impl Params {
    /// Derive the full parameter set from an assets root
    ///
    /// **Derivation:**
    /// - `testdata  = <assets>/testdata`
    /// - `cache     = <testdata>/cache`
    /// - `originals = <testdata>/originals`
    /// - `import    = <testdata>/import`
    /// - `export    = <testdata>/export`
    ///
    /// A relative path override is joined onto the assets root; an absolute one
    /// is used as given. The assets root itself is only normalized lexically,
    /// never made absolute.
    ///
    /// **Precondition:** derived paths are absolute only when `assets_path` is.
    /// A relative root yields relative paths that depend on the working
    /// directory of whoever later touches them; pass user input through
    /// [`expand_path`] first (as [`ParamsArgs::resolve`] does).
    ///
    /// Total and side-effect free: nothing here touches the filesystem.
    pub fn resolve(assets_path: impl AsRef<Path>, overrides: &ParamsOverrides) -> Params {
        let assets_path = normalize(assets_path.as_ref());
        let test_data = assets_path.join(TEST_DATA_DIR);

        let derived = |value: &Option<PathBuf>, subdir: &str| match value {
            Some(path) => normalize(&assets_path.join(path)),
            None => test_data.join(subdir),
        };

        Params {
            debug: overrides.debug.unwrap_or(false),
            config_file: overrides.config_file.clone(),
            cache_path: derived(&overrides.cache_path, "cache"),
            originals_path: derived(&overrides.originals_path, "originals"),
            import_path: derived(&overrides.import_path, "import"),
            export_path: derived(&overrides.export_path, "export"),
            darktable_cli: overrides
                .darktable_cli
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DARKTABLE_CLI)),
            database_driver: overrides.database_driver.unwrap_or_default(),
            database_dsn: overrides
                .database_dsn
                .clone()
                .unwrap_or_else(|| DEFAULT_DATABASE_DSN.to_string()),
            assets_path,
        }
    }

    /// Compiled-default sandbox parameters (workspace `assets/` directory)
    pub fn sandbox() -> Params {
        Params::resolve(default_assets_path(), &ParamsOverrides::default())
    }

    /// Parent of cache/originals/import/export; archive extraction target
    pub fn testdata_path(&self) -> PathBuf {
        self.assets_path.join(TEST_DATA_DIR)
    }

    /// Directories removed by a sandbox purge, in removal order
    pub fn sandbox_dirs(&self) -> [&Path; 4] {
        [
            self.import_path.as_path(),
            self.export_path.as_path(),
            self.originals_path.as_path(),
            self.cache_path.as_path(),
        ]
    }

    pub fn server_path(&self) -> PathBuf {
        self.assets_path.join("server")
    }

    /// Static files served under `/assets`
    pub fn http_public_path(&self) -> PathBuf {
        self.server_path().join("public")
    }

    pub fn http_favicons_path(&self) -> PathBuf {
        self.server_path().join("favicons")
    }

    pub fn http_templates_path(&self) -> PathBuf {
        self.server_path().join("templates")
    }

    /// Browser-facing view of the configuration
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            name: "Prism".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            debug: self.debug,
            assets_uri: "/assets".to_string(),
            api_uri: "/api/v1".to_string(),
        }
    }
}

/// Configuration exposed to the web client
///
/// Contains no filesystem paths or credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub name: String,
    pub version: String,
    pub debug: bool,
    pub assets_uri: String,
    pub api_uri: String,
}

/// Named, independently overridable settings
///
/// Every field is optional; `None` means "use the derived default".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamsOverrides {
    pub debug: Option<bool>,
    pub config_file: Option<PathBuf>,
    pub assets_path: Option<PathBuf>,
    pub cache_path: Option<PathBuf>,
    pub originals_path: Option<PathBuf>,
    pub import_path: Option<PathBuf>,
    pub export_path: Option<PathBuf>,
    pub darktable_cli: Option<PathBuf>,
    pub database_driver: Option<DatabaseDriver>,
    pub database_dsn: Option<String>,
}

impl ParamsOverrides {
    /// Fill unset fields from a lower-priority layer
    pub fn or(self, lower: ParamsOverrides) -> ParamsOverrides {
        ParamsOverrides {
            debug: self.debug.or(lower.debug),
            config_file: self.config_file.or(lower.config_file),
            assets_path: self.assets_path.or(lower.assets_path),
            cache_path: self.cache_path.or(lower.cache_path),
            originals_path: self.originals_path.or(lower.originals_path),
            import_path: self.import_path.or(lower.import_path),
            export_path: self.export_path.or(lower.export_path),
            darktable_cli: self.darktable_cli.or(lower.darktable_cli),
            database_driver: self.database_driver.or(lower.database_driver),
            database_dsn: self.database_dsn.or(lower.database_dsn),
        }
    }

    /// Resolve, falling back to the compiled default assets root
    pub fn into_params(self) -> Params {
        let assets_path = self
            .assets_path
            .clone()
            .unwrap_or_else(default_assets_path);
        Params::resolve(assets_path, &self)
    }
}

/// TOML configuration file contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub debug: Option<bool>,
    pub assets_path: Option<PathBuf>,
    pub cache_path: Option<PathBuf>,
    pub originals_path: Option<PathBuf>,
    pub import_path: Option<PathBuf>,
    pub export_path: Option<PathBuf>,
    pub darktable_cli: Option<PathBuf>,
    pub database_driver: Option<DatabaseDriver>,
    pub database_dsn: Option<String>,
    pub fixtures: FixturesConfig,
}

/// `[fixtures]` table: overrides for the fixture archive descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixturesConfig {
    pub url: Option<String>,
    pub fingerprint: Option<String>,
    /// Digest algorithm name ("sha1" or "sha256")
    pub algorithm: Option<String>,
    pub cache_file: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

impl TomlConfig {
    /// Load a TOML config file
    ///
    /// **Error Handling:**
    /// - Missing file: warning, defaults returned
    /// - Unreadable or malformed file: `Error::Config`
    pub fn load(path: &Path) -> Result<TomlConfig> {
        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(TomlConfig::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config: TomlConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Convert to an override layer
    ///
    /// A relative `assets_path` is taken relative to `base_dir` (the directory
    /// holding the config file).
    pub fn overrides(&self, base_dir: &Path) -> ParamsOverrides {
        ParamsOverrides {
            debug: self.debug,
            config_file: None,
            assets_path: self
                .assets_path
                .as_ref()
                .map(|p| normalize(&base_dir.join(p))),
            cache_path: self.cache_path.clone(),
            originals_path: self.originals_path.clone(),
            import_path: self.import_path.clone(),
            export_path: self.export_path.clone(),
            darktable_cli: self.darktable_cli.clone(),
            database_driver: self.database_driver,
            database_dsn: self.database_dsn.clone(),
        }
    }
}

/// Workspace `assets/` directory, fixed at compile time
pub fn default_assets_path() -> PathBuf {
    normalize(&Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("assets"))
}

/// Expand a user-supplied path to absolute form
///
/// Handles a leading `~`, resolves relative paths against the working
/// directory and normalizes the result. Does not require the path to exist.
pub fn expand_path(raw: &str) -> PathBuf {
    let path = if raw == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(raw))
    } else if let Some(rest) = raw.strip_prefix("~/") {
        match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(raw),
        }
    } else {
        PathBuf::from(raw)
    };

    let absolute = if path.is_absolute() {
        path
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(e) => {
                warn!("Could not determine working directory: {}", e);
                path
            }
        }
    };

    normalize(&absolute)
}

/// Lexically remove `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_parent_components() {
        assert_eq!(normalize(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_driver_from_str() {
        assert_eq!("SQLite".parse::<DatabaseDriver>(), Ok(DatabaseDriver::Sqlite));
        assert_eq!("mysql".parse::<DatabaseDriver>(), Ok(DatabaseDriver::Mysql));
        assert!("postgres".parse::<DatabaseDriver>().is_err());
    }

    #[test]
    fn test_expand_relative_path_is_absolute() {
        let expanded = expand_path("some/relative/../dir");
        assert!(expanded.is_absolute());
        assert!(expanded.ends_with("some/dir"));
    }

    #[test]
    fn test_default_assets_path_is_workspace_assets() {
        let path = default_assets_path();
        assert!(path.is_absolute());
        assert!(path.ends_with("assets"));
        assert!(!path.to_string_lossy().contains(".."));
    }
}
