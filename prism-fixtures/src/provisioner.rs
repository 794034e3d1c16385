//! Fixture provisioning pipeline
//!
//! # State Progression
//! IDLE → PURGED → ARCHIVE_VALIDATED → EXTRACTED → DONE
//!
//! `FAILED` replaces EXTRACTED/DONE when the archive cannot be read.
//!
//! Each stage degrades to a logged, recorded failure; nothing short of strict
//! mode turns a degraded run into an error. Callers that need fixture data
//! either enable [`ProvisionOptions::strict`] or check
//! [`ProvisionReport::fixtures_present`].

use crate::descriptor::ArchiveDescriptor;
use crate::extract;
use crate::fetch::Fetcher;
use crate::fingerprint::fingerprint_file;
use crate::purge::purge_dirs;
use crate::report::{
    ArchiveReport, ArchiveStatus, ExtractReport, ProvisionReport, ProvisionState, PurgeReport,
};
use prism_common::{Error, Params, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Provisioning behavior switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisionOptions {
    /// Fail the run when no fixture data was extracted
    pub strict: bool,
}

/// Brings the sandbox into the state described by an [`ArchiveDescriptor`]
pub struct Provisioner {
    params: Params,
    descriptor: ArchiveDescriptor,
    fetcher: Arc<dyn Fetcher>,
    options: ProvisionOptions,
}

impl Provisioner {
    pub fn new(params: Params, descriptor: ArchiveDescriptor, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            params,
            descriptor,
            fetcher,
            options: ProvisionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ProvisionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn descriptor(&self) -> &ArchiveDescriptor {
        &self.descriptor
    }

    /// Run purge → ensure archive → extract
    ///
    /// Destroys any previous sandbox content. Returns `Err` only in strict
    /// mode, with `Error::FixturesMissing`.
    pub async fn run(&self) -> Result<ProvisionReport> {
        info!(
            testdata = %self.params.testdata_path().display(),
            "Initializing test data"
        );

        let mut state = ProvisionState::Idle;

        let purge = self.purge().await;
        advance(&mut state, ProvisionState::Purged);

        let archive = self.ensure_archive().await;
        advance(&mut state, ProvisionState::ArchiveValidated);

        let extract = match &archive.status {
            ArchiveStatus::Unavailable { cause } => {
                warn!("Skipping extraction, no fixture archive: {}", cause);
                ExtractReport::Failed {
                    cause: format!("fixture archive unavailable: {}", cause),
                    files: Vec::new(),
                }
            }
            _ => self.extract().await,
        };

        match extract {
            ExtractReport::Extracted(_) => {
                advance(&mut state, ProvisionState::Extracted);
                advance(&mut state, ProvisionState::Done);
            }
            ExtractReport::Failed { .. } => advance(&mut state, ProvisionState::Failed),
        }

        let report = ProvisionReport {
            state,
            purge,
            archive,
            extract,
        };

        if report.is_degraded() {
            warn!(
                state = %report.state,
                files = report.extracted_files().len(),
                "Test data provisioning finished with errors"
            );
        } else {
            info!(
                files = report.extracted_files().len(),
                "Test data provisioning complete"
            );
        }

        if self.options.strict {
            if let Some(cause) = report.missing_fixtures_cause() {
                return Err(Error::FixturesMissing(cause));
            }
        }

        Ok(report)
    }

    /// Remove import, export, originals and cache directories
    pub async fn purge(&self) -> PurgeReport {
        purge_dirs(&self.params.sandbox_dirs()).await
    }

    /// Make sure a trusted archive sits at the cache path
    ///
    /// **Algorithm:**
    /// 1. Cached file matches the expected fingerprint: done, no download
    /// 2. Cached file differs (or cannot be hashed): delete it
    /// 3. Download; a failure leaves no archive behind
    /// 4. Re-fingerprint the download and record whether it matches
    pub async fn ensure_archive(&self) -> ArchiveReport {
        let cache_file = &self.descriptor.cache_file;
        let algorithm = self.descriptor.algorithm;
        let mut discarded_fingerprint = None;

        if is_file(cache_file).await {
            match fingerprint_file(cache_file, algorithm).await {
                Ok(fingerprint) if self.descriptor.matches(&fingerprint) => {
                    info!(path = %cache_file.display(), "Using cached test data archive");
                    return ArchiveReport {
                        status: ArchiveStatus::CacheHit,
                        discarded_fingerprint: None,
                        fetch_attempts: 0,
                    };
                }
                Ok(fingerprint) => {
                    info!(
                        "Removing outdated test data archive (fingerprint {}, expected {})",
                        fingerprint, self.descriptor.fingerprint
                    );
                    discarded_fingerprint = Some(fingerprint);
                }
                Err(e) => {
                    warn!(path = %cache_file.display(), error = %e, "Cached test data archive unreadable");
                }
            }

            if let Err(e) = tokio::fs::remove_file(cache_file).await {
                warn!(path = %cache_file.display(), error = %e, "Could not remove cached archive");
            }
        }

        info!("Downloading latest test data archive from {}", self.descriptor.url);

        let status = match self.fetcher.fetch(&self.descriptor.url, cache_file).await {
            Ok(bytes) => self.verify_download(bytes).await,
            Err(e) => {
                warn!("Download failed: {}", e);
                ArchiveStatus::Unavailable {
                    cause: e.to_string(),
                }
            }
        };

        ArchiveReport {
            status,
            discarded_fingerprint,
            fetch_attempts: 1,
        }
    }

    async fn verify_download(&self, bytes: u64) -> ArchiveStatus {
        let cache_file = &self.descriptor.cache_file;

        match fingerprint_file(cache_file, self.descriptor.algorithm).await {
            Ok(fingerprint) => {
                let verified = self.descriptor.matches(&fingerprint);
                if !verified {
                    warn!(
                        "Downloaded archive fingerprint {} does not match expected {}",
                        fingerprint, self.descriptor.fingerprint
                    );
                }
                ArchiveStatus::Fetched {
                    bytes,
                    fingerprint,
                    verified,
                }
            }
            Err(e) => {
                warn!(path = %cache_file.display(), error = %e, "Downloaded archive unreadable");
                ArchiveStatus::Unavailable {
                    cause: e.to_string(),
                }
            }
        }
    }

    /// Unpack the cached archive into `<assets>/testdata`
    pub async fn extract(&self) -> ExtractReport {
        let dest = self.params.testdata_path();

        match extract::unzip(&self.descriptor.cache_file, &dest).await {
            Ok(summary) => ExtractReport::Extracted(summary),
            Err(e) => {
                warn!("Could not unzip test data: {}", e);
                ExtractReport::Failed {
                    cause: e.cause.to_string(),
                    files: e.partial.files,
                }
            }
        }
    }
}

fn advance(state: &mut ProvisionState, next: ProvisionState) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal provisioning transition {} -> {}",
        state,
        next
    );
    debug!("Provisioning state: {} -> {}", state, next);
    *state = next;
}

async fn is_file(path: &std::path::Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
