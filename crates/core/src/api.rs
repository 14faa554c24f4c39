//! Civitai API client: URL parsing and model metadata fetching.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::{FileRecord, ModelDescriptor, ModelVersion};

const API_BASE: &str = "https://civitai.com/api/v1";
const MODEL_HOST: &str = "civitai.com";
const USER_AGENT: &str = "civitgrab/0.1";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Raw model payload as returned by `GET /api/v1/models/<id>`.
#[derive(Debug, Deserialize)]
pub struct ModelPayload {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub model_type: String,
    #[serde(default)]
    pub nsfw: bool,
    #[serde(default)]
    pub creator: Option<CreatorPayload>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "modelVersions", default)]
    pub model_versions: Vec<VersionPayload>,
}

#[derive(Debug, Deserialize)]
pub struct CreatorPayload {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct VersionPayload {
    pub id: u64,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
    #[serde(rename = "downloadUrl", default)]
    pub download_url: Option<String>,
    #[serde(rename = "trainedWords", default)]
    pub trained_words: Vec<String>,
    #[serde(default)]
    pub files: Vec<FilePayload>,
}

#[derive(Debug, Deserialize)]
pub struct FilePayload {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "virusScanResult", default)]
    pub virus_scan_result: Option<String>,
}

/// Extract the numeric model id from a model page URL.
///
/// Only `https://civitai.com/models/<id>[/...]` is accepted.
pub fn parse_model_url(url: &str) -> Result<u64> {
    let invalid = || Error::InvalidUrl(url.to_string());

    let rest = url.strip_prefix("https://").ok_or_else(invalid)?;
    let (host, path) = rest.split_once('/').ok_or_else(invalid)?;
    if host != MODEL_HOST && host != format!("www.{MODEL_HOST}") {
        return Err(invalid());
    }

    let mut segments = path.split('/');
    if segments.next() != Some("models") {
        return Err(invalid());
    }
    segments
        .next()
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
        .ok_or_else(invalid)
}

/// HTTP client for the Civitai model API.
///
/// The API key is passed in explicitly; nothing here reads the environment.
pub struct CivitaiClient {
    client: Client,
    api_key: Option<String>,
}

impl CivitaiClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to create HTTP client"),
            api_key,
        }
    }

    pub async fn fetch_model(&self, model_id: u64) -> Result<ModelDescriptor> {
        let url = format!("{}/models/{}", API_BASE, model_id);

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| Error::MetadataFetch {
            model: model_id.to_string(),
            reason: e.to_string(),
        })?;

        if !response.status().is_success() {
            return Err(Error::MetadataFetch {
                model: model_id.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let payload: ModelPayload =
            response.json().await.map_err(|e| Error::MetadataFetch {
                model: model_id.to_string(),
                reason: format!("invalid payload: {}", e),
            })?;

        Ok(descriptor_from_payload(payload))
    }

    /// Resolve a model page URL straight to a descriptor.
    pub async fn fetch_model_by_url(&self, url: &str) -> Result<ModelDescriptor> {
        let model_id = parse_model_url(url)?;
        self.fetch_model(model_id).await
    }
}

fn descriptor_from_payload(payload: ModelPayload) -> ModelDescriptor {
    let versions = payload
        .model_versions
        .into_iter()
        .map(|v| ModelVersion {
            id: v.id.to_string(),
            created_at: v.created_at.as_deref().and_then(parse_timestamp),
            download_url: v.download_url,
            trained_words: v.trained_words,
            files: v
                .files
                .into_iter()
                .map(|f| FileRecord {
                    name: f.name,
                    virus_scan_result: f.virus_scan_result,
                })
                .collect(),
        })
        .collect();

    ModelDescriptor::new(
        payload.id.to_string(),
        payload.name,
        &payload.model_type,
        payload.nsfw,
        payload.creator.map(|c| c.username).unwrap_or_default(),
        payload.tags,
        versions,
    )
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
