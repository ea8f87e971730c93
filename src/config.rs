//! Environment-driven configuration with compiled defaults.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_WEIGHTS_URL: &str = "https://www.dropbox.com/s/l6o5tp73n4uzujl/stage-2.onnx?dl=1";
const DEFAULT_WEIGHTS_PATH: &str = "models/facerec.onnx";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub weights_url: String,
    pub weights_path: PathBuf,
    /// Expected SHA-256 of the weights file; verification is skipped when unset.
    pub weights_sha256: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = get("FACEREC_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match get("FACEREC_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("invalid FACEREC_PORT: {raw}"))?,
            None => DEFAULT_PORT,
        };

        let weights_url =
            get("FACEREC_WEIGHTS_URL").unwrap_or_else(|| DEFAULT_WEIGHTS_URL.to_string());

        let weights_path = get("FACEREC_WEIGHTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WEIGHTS_PATH));

        let weights_sha256 = match get("FACEREC_WEIGHTS_SHA256") {
            Some(raw) if !raw.is_empty() => {
                if raw.len() != 64 || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
                    anyhow::bail!("invalid FACEREC_WEIGHTS_SHA256: expected 64 hex characters");
                }
                Some(raw.to_ascii_lowercase())
            }
            _ => None,
        };

        Ok(Self {
            host,
            port,
            weights_url,
            weights_path,
            weights_sha256,
        })
    }
}
