mod commands;
mod prompt;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use civitgrab_core::orchestrator::DEFAULT_CONCURRENCY;
use civitgrab_core::{Config, Error};

use commands::Mode;

#[derive(Parser)]
#[command(name = "civitgrab")]
#[command(author, version, about = "Download Civitai models into categorized folders", long_about = None)]
struct Cli {
    /// Config file (default: ./civitgrab.toml, then
    /// ~/.config/civitgrab/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download one or more models by page URL
    Pull {
        /// Model page URLs (https://civitai.com/models/<id>)
        #[arg(required = true)]
        urls: Vec<String>,

        /// Download mode; required when more than one model is given
        #[arg(short, long, value_enum)]
        mode: Option<Mode>,

        /// Maximum number of concurrent transfers
        #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
        limit: usize,

        /// List each model's versions before downloading
        #[arg(long)]
        list_versions: bool,
    },

    /// Download every model URL listed in a file (one per line)
    Batch {
        /// File with one model page URL per line
        file: PathBuf,

        /// Download mode
        #[arg(short, long, value_enum)]
        mode: Option<Mode>,

        /// Maximum number of concurrent transfers
        #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
        limit: usize,
    },

    /// Show the resolved category-to-folder mapping
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error initializing: {e}");
            std::process::exit(1);
        }
    };

    // Explicit credential: environment wins over the config file, and
    // the key is passed into constructors from here on.
    let api_key = std::env::var("CIVITAI_API_KEY")
        .ok()
        .or_else(|| config.api.key.clone());

    match cli.command {
        Commands::Pull {
            urls,
            mode,
            limit,
            list_versions,
        } => commands::pull::execute(&config, api_key, &urls, mode, limit, list_versions).await,
        Commands::Batch { file, mode, limit } => {
            commands::batch::execute(&config, api_key, &file, mode, limit).await
        }
        Commands::Config => commands::config::execute(&config),
    }
}

fn load_config(explicit: Option<&Path>) -> civitgrab_core::Result<Config> {
    if let Some(path) = explicit {
        return Config::load(path);
    }

    let local = PathBuf::from("civitgrab.toml");
    if local.exists() {
        return Config::load(&local);
    }

    if let Some(path) = dirs::config_dir().map(|d| d.join("civitgrab").join("config.toml")) {
        if path.exists() {
            return Config::load(&path);
        }
    }

    Err(Error::Config(
        "no config file found; create civitgrab.toml or pass --config".to_string(),
    ))
}
