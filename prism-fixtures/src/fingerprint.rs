//! Content fingerprints of archive files

use crate::descriptor::DigestAlgorithm;
use prism_common::{Error, Result};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Calculate the hex digest of a file
///
/// Reads in 1MB chunks; runs on the blocking pool since fixture archives can
/// be large.
pub async fn fingerprint_file(path: &Path, algorithm: DigestAlgorithm) -> Result<String> {
    let path_buf = path.to_path_buf();
    tracing::debug!(path = %path_buf.display(), %algorithm, "Calculating archive fingerprint");

    let hash = tokio::task::spawn_blocking(move || -> Result<String> {
        let file = File::open(&path_buf).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to open {} for hashing: {}", path_buf.display(), e),
            ))
        })?;

        match algorithm {
            DigestAlgorithm::Sha1 => hash_reader::<Sha1, _>(file),
            DigestAlgorithm::Sha256 => hash_reader::<Sha256, _>(file),
        }
    })
    .await
    .map_err(|e| Error::Internal(format!("Hash calculation task failed: {}", e)))??;

    Ok(hash)
}

/// Hex digest of an in-memory buffer
pub fn fingerprint_bytes(bytes: &[u8], algorithm: DigestAlgorithm) -> String {
    match algorithm {
        DigestAlgorithm::Sha1 => format!("{:x}", Sha1::digest(bytes)),
        DigestAlgorithm::Sha256 => format!("{:x}", Sha256::digest(bytes)),
    }
}

fn hash_reader<D: Digest, R: Read>(mut reader: R) -> Result<String>
where
    sha2::digest::Output<D>: std::fmt::LowerHex,
{
    let mut hasher = D::new();
    let mut buffer = vec![0u8; 1024 * 1024];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_known_digests() {
        assert_eq!(
            fingerprint_bytes(b"abc", DigestAlgorithm::Sha1),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(
            fingerprint_bytes(b"abc", DigestAlgorithm::Sha256),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_file_matches_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("archive.zip");
        let payload = vec![7u8; 3 * 1024 * 1024 + 17];
        std::fs::write(&path, &payload).unwrap();

        for algorithm in [DigestAlgorithm::Sha1, DigestAlgorithm::Sha256] {
            let from_file = fingerprint_file(&path, algorithm).await.unwrap();
            assert_eq!(from_file, fingerprint_bytes(&payload, algorithm));
            assert_eq!(from_file.len(), algorithm.hex_len());
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = fingerprint_file(&temp_dir.path().join("nope.zip"), DigestAlgorithm::Sha1)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    }
}
