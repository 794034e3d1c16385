//! Sandbox purge

use crate::report::{PurgeFailure, PurgeReport};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// Recursively remove each directory, best effort
///
/// A directory that does not exist counts as removed successfully but is not
/// listed in `removed`. Failures are logged and recorded, never returned.
pub async fn purge_dirs(dirs: &[&Path]) -> PurgeReport {
    let mut report = PurgeReport::default();

    for dir in dirs {
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => {
                debug!(path = %dir.display(), "Removed sandbox directory");
                report.removed.push(dir.to_path_buf());
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Could not remove sandbox directory");
                report.failures.push(PurgeFailure {
                    path: dir.to_path_buf(),
                    cause: e.to_string(),
                });
            }
        }
    }

    report
}
