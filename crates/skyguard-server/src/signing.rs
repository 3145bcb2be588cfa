//! Signing key persistence.
//!
//! The issuer keypair is derived from a 32-byte seed stored next to the
//! database. The seed file survives restarts so previously issued
//! artifacts stay verifiable against the same public key.

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::info;

/// Load the seed from `path`, generating and persisting a fresh one on
/// first run.
pub fn load_or_create_seed(path: &str) -> Result<[u8; 32]> {
    let path = Path::new(path);
    if path.exists() {
        let bytes = fs::read(path).context("reading signing key")?;
        if bytes.len() != 32 {
            bail!(
                "signing key at {} has {} bytes, expected 32",
                path.display(),
                bytes.len()
            );
        }
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes);
        return Ok(seed);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Two fresh UUIDs hashed together give 32 unpredictable bytes
    // without pulling in an RNG dependency.
    let mut hasher = Sha256::new();
    hasher.update(uuid::Uuid::new_v4().as_bytes());
    hasher.update(uuid::Uuid::new_v4().as_bytes());
    let seed: [u8; 32] = hasher.finalize().into();

    fs::write(path, seed).context("writing signing key")?;
    info!("Generated new signing key at {}", path.display());
    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_is_created_once_and_reloaded() {
        let dir = std::env::temp_dir().join(format!("skyguard-key-{}", uuid::Uuid::new_v4()));
        let path = dir.join("signing.key").to_string_lossy().to_string();

        let first = load_or_create_seed(&path).unwrap();
        let second = load_or_create_seed(&path).unwrap();
        assert_eq!(first, second);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn truncated_seed_file_is_rejected() {
        let dir = std::env::temp_dir().join(format!("skyguard-key-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("signing.key");
        std::fs::write(&path, [0u8; 16]).unwrap();

        assert!(load_or_create_seed(&path.to_string_lossy()).is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
