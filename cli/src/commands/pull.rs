use anyhow::{bail, Result};
use std::sync::Arc;
use tracing::warn;

use civitgrab_core::{
    CivitaiClient, Config, HttpTransfer, ModelDescriptor, Orchestrator, PathResolver,
};

use super::Mode;
use crate::prompt::TerminalPrompter;

pub async fn execute(
    config: &Config,
    api_key: Option<String>,
    urls: &[String],
    mode: Option<Mode>,
    limit: usize,
    list_versions: bool,
) -> Result<()> {
    if urls.len() > 1 && mode.is_none() {
        bail!("--mode is required when downloading more than one model");
    }

    let client = CivitaiClient::new(api_key.clone());
    let single = urls.len() == 1;

    let mut models = Vec::new();
    for url in urls {
        match client.fetch_model_by_url(url).await {
            Ok(model) => {
                println!("Added model: {}", model.name());
                let words = model.latest_trained_words();
                if !words.is_empty() {
                    println!("  trained words: {}", words.join(", "));
                }
                models.push(Arc::new(model));
            }
            // a single explicitly-requested model failing fails the run
            Err(e) if single => return Err(e.into()),
            Err(e) => warn!("skipping {}: {}", url, e),
        }
    }

    if models.is_empty() {
        println!("No models to download.");
        return Ok(());
    }

    if list_versions {
        for model in &models {
            print_versions(model);
        }
    }

    download(
        config,
        api_key,
        models,
        mode.unwrap_or(Mode::Concurrent),
        limit,
    )
    .await
}

/// Shared tail of `pull` and `batch`: run the orchestrator and print the
/// summary.
pub(super) async fn download(
    config: &Config,
    api_key: Option<String>,
    models: Vec<Arc<ModelDescriptor>>,
    mode: Mode,
    limit: usize,
) -> Result<()> {
    let orchestrator = Orchestrator::new(
        PathResolver::from_config(config),
        Arc::new(HttpTransfer::new(api_key)),
        Arc::new(TerminalPrompter),
    );

    let summary = match mode {
        Mode::Concurrent => orchestrator.run_concurrent(models, limit).await?,
        Mode::Sequential => orchestrator.run_sequential(models).await?,
    };

    println!("\nDownload summary: {}", summary);
    Ok(())
}

fn print_versions(model: &ModelDescriptor) {
    println!("\nVersions of {}:", model.name());
    println!("{:<12} {:<18} {}", "VERSION", "CREATED", "VIRUS SCAN");
    println!("{}", "-".repeat(44));

    for version in model.versions() {
        let created = version
            .created_at
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "{:<12} {:<18} {}",
            version.id,
            created,
            version.scan_result()
        );
    }
}
