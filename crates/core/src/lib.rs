//! civitgrab_core - Core library for model downloads from Civitai
//!
//! This crate provides:
//! - Civitai API client and model metadata
//! - Virus-scan gating with user confirmation
//! - Category-to-folder path resolution
//! - Concurrent download orchestration

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod paths;
pub mod prompt;
pub mod scan;
pub mod transfer;

pub use api::CivitaiClient;
pub use config::Config;
pub use error::{Error, Result};
pub use models::{FileRecord, ModelCategory, ModelDescriptor, ModelVersion, ScanResult};
pub use orchestrator::{DownloadSummary, Orchestrator};
pub use paths::PathResolver;
pub use prompt::DownloadPrompter;
pub use scan::{partition, ScanPartition};
pub use transfer::{HttpTransfer, Transfer};
