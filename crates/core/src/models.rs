//! Model metadata: descriptors, versions, scan results.
//!
//! A [`ModelDescriptor`] is an immutable view of one remote model and its
//! versions, sorted newest-first at construction. All projections are total:
//! missing data yields `None`/empty, never a panic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Model category as declared by the remote API.
///
/// Unrecognized remote values parse to `Other` so new categories on the
/// server side never fail construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelCategory {
    Checkpoint,
    Lora,
    TextualInversion,
    Hypernetwork,
    AestheticGradient,
    Controlnet,
    Poses,
    Other,
}

impl ModelCategory {
    pub fn from_remote(value: &str) -> Self {
        match value.to_ascii_uppercase().replace(['_', ' '], "").as_str() {
            "CHECKPOINT" => ModelCategory::Checkpoint,
            "LORA" => ModelCategory::Lora,
            "TEXTUALINVERSION" => ModelCategory::TextualInversion,
            "HYPERNETWORK" => ModelCategory::Hypernetwork,
            "AESTHETICGRADIENT" => ModelCategory::AestheticGradient,
            "CONTROLNET" => ModelCategory::Controlnet,
            "POSE" | "POSES" => ModelCategory::Poses,
            _ => ModelCategory::Other,
        }
    }

    /// Lowercase name used for folder matching.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelCategory::Checkpoint => "checkpoint",
            ModelCategory::Lora => "lora",
            ModelCategory::TextualInversion => "textual_inversion",
            ModelCategory::Hypernetwork => "hypernetwork",
            ModelCategory::AestheticGradient => "aesthetic_gradient",
            ModelCategory::Controlnet => "controlnet",
            ModelCategory::Poses => "poses",
            ModelCategory::Other => "other",
        }
    }
}

impl std::fmt::Display for ModelCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Virus scan verdict reported by the remote API for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanResult {
    Passed,
    Pending,
    Failed,
    Error,
    Unknown,
}

impl ScanResult {
    pub fn from_remote(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "success" | "passed" => ScanResult::Passed,
            "pending" => ScanResult::Pending,
            "failed" => ScanResult::Failed,
            "error" => ScanResult::Error,
            _ => ScanResult::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanResult::Passed => "passed",
            ScanResult::Pending => "pending",
            ScanResult::Failed => "failed",
            ScanResult::Error => "error",
            ScanResult::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ScanResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file attached to a model version.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub name: String,
    pub virus_scan_result: Option<String>,
}

impl FileRecord {
    pub fn scan_result(&self) -> ScanResult {
        self.virus_scan_result
            .as_deref()
            .map(ScanResult::from_remote)
            .unwrap_or(ScanResult::Unknown)
    }

    /// Extension from the final dot-segment of the file name, if any.
    pub fn extension(&self) -> Option<&str> {
        match self.name.rsplit_once('.') {
            Some((prefix, ext)) if !prefix.is_empty() && !ext.is_empty() => Some(ext),
            _ => None,
        }
    }
}

/// One published version of a model.
#[derive(Debug, Clone)]
pub struct ModelVersion {
    pub id: String,
    /// Only used for sort order; missing/unparseable dates sort last.
    pub created_at: Option<DateTime<Utc>>,
    pub download_url: Option<String>,
    pub trained_words: Vec<String>,
    pub files: Vec<FileRecord>,
}

impl ModelVersion {
    /// Scan result of the first file. Empty `files` means the status
    /// cannot be determined.
    pub fn scan_result(&self) -> ScanResult {
        self.files
            .first()
            .map(FileRecord::scan_result)
            .unwrap_or(ScanResult::Unknown)
    }

    pub fn file_extension(&self) -> Option<&str> {
        self.files.first().and_then(FileRecord::extension)
    }
}

/// Immutable view of one model and its versions, newest first.
#[derive(Debug, Clone)]
pub struct ModelDescriptor {
    id: String,
    name: String,
    category: ModelCategory,
    nsfw: bool,
    creator: String,
    tags: Vec<String>,
    versions: Vec<ModelVersion>,
}

impl ModelDescriptor {
    /// Build a descriptor from raw metadata. Versions are sorted by
    /// creation date descending here and never reordered afterwards.
    pub fn new(
        id: String,
        name: String,
        category_raw: &str,
        nsfw: bool,
        creator: String,
        tags: Vec<String>,
        mut versions: Vec<ModelVersion>,
    ) -> Self {
        versions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self {
            id,
            name,
            category: ModelCategory::from_remote(category_raw),
            nsfw,
            creator,
            tags,
            versions,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> ModelCategory {
        self.category
    }

    pub fn nsfw(&self) -> bool {
        self.nsfw
    }

    pub fn creator(&self) -> &str {
        &self.creator
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn versions(&self) -> &[ModelVersion] {
        &self.versions
    }

    pub fn page_url(&self) -> String {
        format!("https://civitai.com/models/{}", self.id)
    }

    pub fn latest_version(&self) -> Option<&ModelVersion> {
        self.versions.first()
    }

    pub fn version_by_id(&self, version_id: &str) -> Option<&ModelVersion> {
        self.versions.iter().find(|v| v.id == version_id)
    }

    pub fn latest_download_url(&self) -> Option<&str> {
        self.latest_version().and_then(|v| v.download_url.as_deref())
    }

    pub fn latest_file_extension(&self) -> Option<&str> {
        self.latest_version().and_then(ModelVersion::file_extension)
    }

    pub fn latest_trained_words(&self) -> &[String] {
        self.latest_version()
            .map(|v| v.trained_words.as_slice())
            .unwrap_or(&[])
    }

    pub fn version_download_url(&self, version_id: &str) -> Option<&str> {
        self.version_by_id(version_id)
            .and_then(|v| v.download_url.as_deref())
    }

    pub fn version_file_extension(&self, version_id: &str) -> Option<&str> {
        self.version_by_id(version_id)
            .and_then(ModelVersion::file_extension)
    }

    pub fn version_trained_words(&self, version_id: &str) -> &[String] {
        self.version_by_id(version_id)
            .map(|v| v.trained_words.as_slice())
            .unwrap_or(&[])
    }

    /// Scan status of the version at `version_index` (0 = latest).
    /// Out-of-range indices and versions without files report `Unknown`.
    pub fn scan_status(&self, version_index: usize) -> ScanResult {
        self.versions
            .get(version_index)
            .map(ModelVersion::scan_result)
            .unwrap_or(ScanResult::Unknown)
    }
}

impl std::fmt::Display for ModelDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.id, self.category)
    }
}
