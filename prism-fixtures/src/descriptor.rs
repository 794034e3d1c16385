//! Fixture archive identity
//!
//! An [`ArchiveDescriptor`] names the canonical fixture payload: where to
//! download it, where the local copy is cached, and the fingerprint the local
//! copy must have to be trusted.

use prism_common::config::FixturesConfig;
use prism_common::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Published fixture archive
pub const FIXTURES_URL: &str = "https://dl.photoprism.org/fixtures/testdata.zip";

/// SHA-1 of the published fixture archive
///
/// **IMPORTANT:** Update whenever the published archive is regenerated
pub const FIXTURES_FINGERPRINT: &str = "1a59b358b80221ab3e76efb683ad72402f0b0844";

/// Digest used to fingerprint an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    Sha1,
    Sha256,
}

impl DigestAlgorithm {
    /// Length of the hex-encoded digest
    pub fn hex_len(&self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 40,
            DigestAlgorithm::Sha256 => 64,
        }
    }

    /// Guess the algorithm from a hex digest length
    pub fn from_hex_len(len: usize) -> Option<Self> {
        match len {
            40 => Some(DigestAlgorithm::Sha1),
            64 => Some(DigestAlgorithm::Sha256),
            _ => None,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestAlgorithm::Sha1 => write!(f, "sha1"),
            DigestAlgorithm::Sha256 => write!(f, "sha256"),
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "sha1" => Ok(DigestAlgorithm::Sha1),
            "sha256" => Ok(DigestAlgorithm::Sha256),
            other => Err(Error::Config(format!("unsupported digest algorithm '{}'", other))),
        }
    }
}

/// Source, cache location and expected fingerprint of the fixture archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveDescriptor {
    pub url: String,
    pub cache_file: PathBuf,
    pub fingerprint: String,
    pub algorithm: DigestAlgorithm,
}

impl ArchiveDescriptor {
    /// Build a descriptor, validating the fingerprint format
    pub fn new(
        url: impl Into<String>,
        cache_file: impl Into<PathBuf>,
        fingerprint: &str,
        algorithm: DigestAlgorithm,
    ) -> Result<Self> {
        let fingerprint = fingerprint.trim().to_ascii_lowercase();

        if fingerprint.len() != algorithm.hex_len()
            || !fingerprint.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(Error::Config(format!(
                "fixture fingerprint '{}' is not a {} hex digest",
                fingerprint, algorithm
            )));
        }

        Ok(Self {
            url: url.into(),
            cache_file: cache_file.into(),
            fingerprint,
            algorithm,
        })
    }

    /// The published fixture set, cached at `<tmp>/prism/testdata.zip`
    pub fn published() -> Self {
        Self {
            url: FIXTURES_URL.to_string(),
            cache_file: default_cache_file(),
            fingerprint: FIXTURES_FINGERPRINT.to_string(),
            algorithm: DigestAlgorithm::Sha1,
        }
    }

    /// Apply a `[fixtures]` config section on top of [`ArchiveDescriptor::published`]
    ///
    /// Without an explicit `algorithm`, an overridden fingerprint selects the
    /// algorithm by its length.
    pub fn from_config(config: &FixturesConfig) -> Result<Self> {
        let published = Self::published();

        let fingerprint = config
            .fingerprint
            .as_deref()
            .unwrap_or(&published.fingerprint);

        let algorithm = match (&config.algorithm, &config.fingerprint) {
            (Some(name), _) => name.parse()?,
            (None, Some(fp)) => DigestAlgorithm::from_hex_len(fp.trim().len()).ok_or_else(|| {
                Error::Config(format!(
                    "cannot infer digest algorithm for fixture fingerprint '{}'",
                    fp
                ))
            })?,
            (None, None) => published.algorithm,
        };

        Self::new(
            config.url.clone().unwrap_or(published.url),
            config.cache_file.clone().unwrap_or(published.cache_file),
            fingerprint,
            algorithm,
        )
    }

    /// Whether a computed digest identifies this archive
    pub fn matches(&self, computed: &str) -> bool {
        computed.trim().eq_ignore_ascii_case(&self.fingerprint)
    }
}

/// Shared archive location, reused across runs
pub fn default_cache_file() -> PathBuf {
    std::env::temp_dir().join("prism").join("testdata.zip")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_published_descriptor_is_valid() {
        let published = ArchiveDescriptor::published();
        let rebuilt = ArchiveDescriptor::new(
            published.url.clone(),
            published.cache_file.clone(),
            &published.fingerprint,
            published.algorithm,
        )
        .unwrap();

        assert_eq!(published, rebuilt);
        assert!(published.cache_file.ends_with("prism/testdata.zip"));
    }

    #[test]
    fn test_matches_ignores_case() {
        let published = ArchiveDescriptor::published();

        assert!(published.matches(&FIXTURES_FINGERPRINT.to_ascii_uppercase()));
        assert!(!published.matches("0000000000000000000000000000000000000000"));
    }

    #[test]
    fn test_rejects_wrong_length_fingerprint() {
        let err = ArchiveDescriptor::new("http://x", "/tmp/x.zip", "abc", DigestAlgorithm::Sha256)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_config_infers_sha256() {
        let config = FixturesConfig {
            url: Some("http://localhost/testdata.zip".to_string()),
            fingerprint: Some("AB".repeat(32)),
            ..Default::default()
        };

        let descriptor = ArchiveDescriptor::from_config(&config).unwrap();

        assert_eq!(descriptor.algorithm, DigestAlgorithm::Sha256);
        assert_eq!(descriptor.fingerprint, "ab".repeat(32));
        assert_eq!(descriptor.url, "http://localhost/testdata.zip");
        assert_eq!(descriptor.cache_file, default_cache_file());
    }

    #[test]
    fn test_from_config_defaults_to_published() {
        let descriptor = ArchiveDescriptor::from_config(&FixturesConfig::default()).unwrap();
        assert_eq!(descriptor, ArchiveDescriptor::published());
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("SHA-256".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha256);
        assert!("md5".parse::<DigestAlgorithm>().is_err());
    }
}
