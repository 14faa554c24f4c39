//! Streamed file transfer with per-chunk progress reporting.

use async_trait::async_trait;
use futures_util::StreamExt;
use indicatif::ProgressBar;
use reqwest::Client;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};

const USER_AGENT: &str = "civitgrab/0.1";
const CONNECT_TIMEOUT_SECS: u64 = 30;
const READ_TIMEOUT_SECS: u64 = 30;

/// One streamed download. Implementations are shared across concurrent
/// tasks.
#[async_trait]
pub trait Transfer: Send + Sync {
    /// Stream `url` into `dest`, advancing `bar` as bytes arrive.
    /// Returns the total number of bytes written.
    async fn transfer(&self, url: &str, dest: &Path, bar: &ProgressBar) -> Result<u64>;
}

/// HTTP transfer over reqwest. Chunks are appended to the destination
/// file as they arrive; a mid-stream failure leaves the partial file in
/// place.
pub struct HttpTransfer {
    client: Client,
    api_key: Option<String>,
}

impl HttpTransfer {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
                .read_timeout(Duration::from_secs(READ_TIMEOUT_SECS))
                .build()
                .expect("Failed to create HTTP client"),
            api_key,
        }
    }
}

#[async_trait]
impl Transfer for HttpTransfer {
    async fn transfer(&self, url: &str, dest: &Path, bar: &ProgressBar) -> Result<u64> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Transfer(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Transfer(format!("HTTP {}", response.status())));
        }

        // Determinate bar when the server reports a length, spinner
        // otherwise.
        if let Some(total) = response.content_length() {
            bar.set_length(total);
        }

        let mut file = File::create(dest)?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Transfer(format!("stream error: {}", e)))?;
            file.write_all(&chunk)?;
            written += chunk.len() as u64;
            bar.inc(chunk.len() as u64);
        }

        debug!("wrote {} bytes to {}", written, dest.display());
        Ok(written)
    }
}
