//! Fixture archive download
//!
//! [`Fetcher`] is the seam between the provisioner and the network. The
//! provisioner only needs "put the resource at `url` into `dest`"; tests swap
//! in fetchers that count calls or always fail.

use async_trait::async_trait;
use prism_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

const USER_AGENT: &str = concat!("prism-fixtures/", env!("CARGO_PKG_VERSION"));

/// Default bound on a whole archive download
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(300);

/// Downloads a single resource to a local file
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Write the body of `url` to `dest`, returning the number of bytes written
    ///
    /// On error `dest` must not contain a partial download.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// HTTP GET fetcher
pub struct HttpFetcher {
    http_client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher whose requests fail after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Fetch(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }

    async fn download(&self, url: &str, part: &Path) -> Result<u64> {
        let mut response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("GET {} returned HTTP {}", url, status)));
        }

        let mut file = tokio::fs::File::create(part).await?;
        let mut written = 0u64;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::Fetch(format!("Reading body of {} failed: {}", url, e)))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.sync_all().await?;

        Ok(written)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let part = part_path(dest);

        match self.download(url, &part).await {
            Ok(written) => {
                tokio::fs::rename(&part, dest).await?;
                tracing::debug!(url, dest = %dest.display(), bytes = written, "Download complete");
                Ok(written)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                Err(e)
            }
        }
    }
}

/// Temporary download target next to `dest`
fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("/tmp/prism/testdata.zip")),
            PathBuf::from("/tmp/prism/testdata.zip.part")
        );
    }
}
