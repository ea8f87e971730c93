//! Idempotent download of the model weights file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// Fetches the weights file to `dest` unless it is already cached.
///
/// A cached file short-circuits before any network activity. When a checksum
/// is configured the downloaded bytes are verified before anything is written
/// to disk, so a mismatch leaves no file behind. Any failure is fatal to
/// startup; there is no retry.
pub async fn ensure_weights(url: &str, dest: &Path, sha256: Option<&str>) -> Result<()> {
    if dest.exists() {
        log::debug!("weights already cached at {}", dest.display());
        return Ok(());
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    log::info!("downloading weights from {url}");
    let response = reqwest::get(url)
        .await
        .with_context(|| format!("failed to download {url}"))?;

    if !response.status().is_success() {
        anyhow::bail!("download failed with status: {}", response.status());
    }

    let bytes = response
        .bytes()
        .await
        .context("failed to read download body")?;

    if let Some(expected) = sha256 {
        verify_checksum(&bytes, expected)?;
    }

    fs::write(dest, &bytes).with_context(|| format!("failed to write {}", dest.display()))?;
    log::info!("downloaded weights to {} ({} bytes)", dest.display(), bytes.len());
    Ok(())
}

fn verify_checksum(bytes: &[u8], expected: &str) -> Result<()> {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let actual = format!("{:x}", hasher.finalize());

    if actual != expected.to_ascii_lowercase() {
        anyhow::bail!("weights checksum mismatch: expected {expected}, got {actual}");
    }
    Ok(())
}
