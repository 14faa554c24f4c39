use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use civitgrab_core::{CivitaiClient, Config};

use super::{pull, Mode};

pub async fn execute(
    config: &Config,
    api_key: Option<String>,
    file: &Path,
    mode: Option<Mode>,
    limit: usize,
) -> Result<()> {
    let Some(mode) = mode else {
        bail!("--mode is required for batch downloads");
    };

    let content = std::fs::read_to_string(file)
        .with_context(|| format!("cannot read model list {}", file.display()))?;
    let urls: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if urls.is_empty() {
        println!("No model URLs in {}", file.display());
        return Ok(());
    }

    let client = CivitaiClient::new(api_key.clone());
    let mut models = Vec::new();
    for url in urls {
        match client.fetch_model_by_url(url).await {
            Ok(model) => {
                println!("Added model: {}", model.name());
                models.push(Arc::new(model));
            }
            // metadata failures skip the model, the batch continues
            Err(e) => warn!("skipping {}: {}", url, e),
        }
    }

    if models.is_empty() {
        println!("No models to download.");
        return Ok(());
    }

    println!("\nTotal models to process: {}", models.len());
    pull::download(config, api_key, models, mode, limit).await
}
