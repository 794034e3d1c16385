//! Provisioning run report
//!
//! Every stage records an explicit outcome here instead of only logging it,
//! so callers can decide for themselves whether a degraded sandbox is usable.

use crate::extract::ExtractSummary;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Pipeline position
///
/// Linear: Idle → Purged → ArchiveValidated → Extracted → Done.
/// `Failed` is reachable only from `ArchiveValidated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionState {
    Idle,
    Purged,
    ArchiveValidated,
    Extracted,
    Done,
    Failed,
}

impl ProvisionState {
    /// Whether `next` is a legal successor of `self`
    pub fn can_transition_to(&self, next: ProvisionState) -> bool {
        use ProvisionState::*;
        matches!(
            (self, next),
            (Idle, Purged)
                | (Purged, ArchiveValidated)
                | (ArchiveValidated, Extracted)
                | (ArchiveValidated, Failed)
                | (Extracted, Done)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProvisionState::Done | ProvisionState::Failed)
    }
}

impl fmt::Display for ProvisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProvisionState::Idle => "IDLE",
            ProvisionState::Purged => "PURGED",
            ProvisionState::ArchiveValidated => "ARCHIVE_VALIDATED",
            ProvisionState::Extracted => "EXTRACTED",
            ProvisionState::Done => "DONE",
            ProvisionState::Failed => "FAILED",
        };
        write!(f, "{}", name)
    }
}

/// A path the purge could not remove
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurgeFailure {
    pub path: PathBuf,
    pub cause: String,
}

/// Purge stage outcome
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    /// Directories that existed and were removed
    pub removed: Vec<PathBuf>,
    pub failures: Vec<PurgeFailure>,
}

impl PurgeReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Where the local archive came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArchiveStatus {
    /// Cached copy matched the expected fingerprint; no download
    CacheHit,
    /// Downloaded during this run
    Fetched {
        bytes: u64,
        fingerprint: String,
        /// Whether the download matched the expected fingerprint
        verified: bool,
    },
    /// No usable local archive after this stage
    Unavailable { cause: String },
}

/// Ensure-archive stage outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveReport {
    pub status: ArchiveStatus,
    /// Fingerprint of a cached archive that was discarded as outdated
    pub discarded_fingerprint: Option<String>,
    pub fetch_attempts: u32,
}

/// Extract stage outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractReport {
    Extracted(ExtractSummary),
    Failed {
        cause: String,
        /// Files written before extraction stopped
        files: Vec<PathBuf>,
    },
}

/// Result of one provisioning run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    pub state: ProvisionState,
    pub purge: PurgeReport,
    pub archive: ArchiveReport,
    pub extract: ExtractReport,
}

impl ProvisionReport {
    /// Files written by the extract stage, including those of an interrupted one
    pub fn extracted_files(&self) -> &[PathBuf] {
        match &self.extract {
            ExtractReport::Extracted(summary) => &summary.files,
            ExtractReport::Failed { files, .. } => files,
        }
    }

    /// Whether the sandbox received any fixture data
    pub fn fixtures_present(&self) -> bool {
        self.state == ProvisionState::Done && !self.extracted_files().is_empty()
    }

    /// Whether any stage recorded a recoverable failure
    pub fn is_degraded(&self) -> bool {
        !self.purge.is_clean()
            || matches!(self.archive.status, ArchiveStatus::Unavailable { .. })
            || matches!(
                self.archive.status,
                ArchiveStatus::Fetched { verified: false, .. }
            )
            || matches!(self.extract, ExtractReport::Failed { .. })
    }

    /// Human-readable cause when no fixture data was produced
    pub fn missing_fixtures_cause(&self) -> Option<String> {
        if self.fixtures_present() {
            return None;
        }

        Some(match (&self.archive.status, &self.extract) {
            (_, ExtractReport::Failed { cause, .. }) => cause.clone(),
            (ArchiveStatus::Unavailable { cause }, _) => cause.clone(),
            _ => "archive contained no files".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_transitions() {
        use ProvisionState::*;

        assert!(Idle.can_transition_to(Purged));
        assert!(Purged.can_transition_to(ArchiveValidated));
        assert!(ArchiveValidated.can_transition_to(Extracted));
        assert!(ArchiveValidated.can_transition_to(Failed));
        assert!(Extracted.can_transition_to(Done));

        assert!(!Idle.can_transition_to(ArchiveValidated));
        assert!(!Purged.can_transition_to(Failed));
        assert!(!Extracted.can_transition_to(Failed));
        assert!(!Done.can_transition_to(Idle));
        assert!(Done.is_terminal() && Failed.is_terminal());
    }

    #[test]
    fn test_report_serializes_status_tags() {
        let report = ProvisionReport {
            state: ProvisionState::Failed,
            purge: PurgeReport::default(),
            archive: ArchiveReport {
                status: ArchiveStatus::Unavailable {
                    cause: "offline".to_string(),
                },
                discarded_fingerprint: None,
                fetch_attempts: 1,
            },
            extract: ExtractReport::Failed {
                cause: "archive missing".to_string(),
                files: Vec::new(),
            },
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["archive"]["status"]["status"], "unavailable");
        assert_eq!(json["extract"]["status"], "failed");
        assert!(report.is_degraded());
        assert_eq!(report.missing_fixtures_cause().as_deref(), Some("archive missing"));
    }
}
