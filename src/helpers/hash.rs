//! Hash verification for cached downloads.
//!
//! `sha1` is the digest library descriptors have always carried; `sha256` is
//! accepted alongside it. Every digest a descriptor names must match.

use sha2::Digest;
use std::io::Read;
use std::path::Path;

use crate::descriptor::Integrity;
use crate::error::FetchError;

/// Chunk size for reading files during hashing (1MB)
const CHUNK_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
}

impl HashAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
        }
    }
}

/// Lowercase hex digest of a file.
pub fn file_digest(file: &Path, algorithm: HashAlgorithm) -> std::io::Result<String> {
    let mut f = std::fs::File::open(file)?;
    match algorithm {
        HashAlgorithm::Sha1 => digest_reader::<sha1::Sha1>(&mut f),
        HashAlgorithm::Sha256 => digest_reader::<sha2::Sha256>(&mut f),
    }
}

fn digest_reader<D: Digest>(reader: &mut impl Read) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Verify `file` against every digest in `integrity`.
pub fn verify_file(file: &Path, integrity: &Integrity) -> Result<(), FetchError> {
    let checks = [
        (HashAlgorithm::Sha1, integrity.sha1.as_deref()),
        (HashAlgorithm::Sha256, integrity.sha256.as_deref()),
    ];

    for (algorithm, expected) in checks {
        let Some(expected) = expected else { continue };
        let actual = file_digest(file, algorithm)?;
        if actual != expected.trim().to_lowercase() {
            return Err(FetchError::HashMismatch {
                algorithm: algorithm.name(),
                file: file.to_path_buf(),
                expected: expected.to_lowercase(),
                actual,
            });
        }
    }

    Ok(())
}
