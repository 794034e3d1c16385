//! prism-fixtures - Test sandbox provisioning
//!
//! Resets `<assets>/testdata` and unpacks the fixture archive into it.
//! Optionally brings the configured database schema up to date afterwards.

use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::Parser;
use prism_common::bootstrap::Bootstrap;
use prism_common::config::{FixturesConfig, ParamsArgs};
use prism_fixtures::{ArchiveDescriptor, HttpFetcher, ProvisionOptions, Provisioner};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "prism-fixtures")]
#[command(about = "Provision the Prism test sandbox", long_about = None)]
#[command(version)]
struct Args {
    #[command(flatten)]
    params: ParamsArgs,

    /// Fixture archive URL
    #[arg(long, env = "PRISM_FIXTURES_URL")]
    fixtures_url: Option<String>,

    /// Expected hex digest of the fixture archive
    #[arg(long, env = "PRISM_FIXTURES_FINGERPRINT")]
    fixtures_fingerprint: Option<String>,

    /// Digest algorithm of the fingerprint (sha1, sha256)
    #[arg(long, env = "PRISM_FIXTURES_ALGORITHM")]
    fixtures_algorithm: Option<String>,

    /// Where the downloaded archive is cached between runs
    #[arg(long, env = "PRISM_FIXTURES_CACHE_FILE")]
    fixtures_cache_file: Option<PathBuf>,

    /// Download timeout in seconds
    #[arg(long, env = "PRISM_FETCH_TIMEOUT")]
    fetch_timeout: Option<u64>,

    /// Exit with an error when no fixture data could be provisioned
    #[arg(long, env = "PRISM_FIXTURES_STRICT", value_parser = BoolishValueParser::new())]
    strict: bool,

    /// Run database migrations after provisioning
    #[arg(long)]
    migrate: bool,

    /// Print the provisioning report as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    /// Command-line fixture settings over the config file's `[fixtures]` table
    fn fixtures_config(&self, file: FixturesConfig) -> FixturesConfig {
        FixturesConfig {
            url: self.fixtures_url.clone().or(file.url),
            fingerprint: self.fixtures_fingerprint.clone().or(file.fingerprint),
            algorithm: self.fixtures_algorithm.clone().or(file.algorithm),
            cache_file: self.fixtures_cache_file.clone().or(file.cache_file),
            timeout_secs: self.fetch_timeout.or(file.timeout_secs),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.params.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Starting prism-fixtures v{}", env!("CARGO_PKG_VERSION"));

    let (params, toml) = args.params.resolve().context("Failed to resolve parameters")?;
    info!("Assets path: {}", params.assets_path.display());

    let fixtures = args.fixtures_config(toml.fixtures);
    let timeout = fixtures
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(prism_fixtures::DEFAULT_FETCH_TIMEOUT);
    let descriptor =
        ArchiveDescriptor::from_config(&fixtures).context("Invalid fixture archive settings")?;
    let fetcher = HttpFetcher::new(timeout).context("Failed to create HTTP client")?;

    let provisioner = Provisioner::new(params.clone(), descriptor, Arc::new(fetcher))
        .with_options(ProvisionOptions {
            strict: args.strict,
        });

    let report = provisioner.run().await.context("Test data provisioning failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{}: {} files in {}",
            report.state,
            report.extracted_files().len(),
            params.testdata_path().display()
        );
        if let Some(cause) = report.missing_fixtures_cause() {
            println!("No fixture data: {}", cause);
        }
    }

    if args.migrate {
        let bootstrap = Bootstrap::new(params);
        let backend = bootstrap
            .backend()
            .await
            .context("Failed to initialize database")?;
        info!(driver = %backend.driver(), "Database schema is current");
        bootstrap.shutdown().await;
    }

    Ok(())
}
