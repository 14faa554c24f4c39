//! Configuration: models base path, API key, folder mapping.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Fixed subfolder layout of a ComfyUI models directory, used when the
/// folder mapping is not overridden. Order matters: category matching
/// walks this list front to back.
const DEFAULT_SUBFOLDERS: &[&str] = &[
    "checkpoints",
    "clip",
    "clip_vision",
    "controlnet",
    "diffusers",
    "diffusion_models",
    "embeddings",
    "gligen",
    "hypernetworks",
    "loras",
    "photomaker",
    "style_models",
    "text_encoders",
    "unet",
    "upscale_models",
    "vae",
    "vae_approx",
];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub models: ModelsConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub folders: FoldersConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// Root of the local models tree (e.g. ComfyUI's `models/` directory).
    pub base_path: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    /// API key for authenticated downloads. The CIVITAI_API_KEY
    /// environment variable takes precedence at the CLI boundary.
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FoldersConfig {
    /// When set, `entries` below is used verbatim instead of deriving
    /// the mapping from `base_path` and the fixed subfolder list.
    #[serde(rename = "override", default)]
    pub override_mode: bool,

    #[serde(flatten)]
    pub entries: toml::Table,
}

impl Config {
    /// Load configuration from `path`. Unreadable or malformed input is
    /// fatal: the run must abort before any network activity.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("malformed {}: {}", path.display(), e)))
    }

    pub fn base_path(&self) -> &Path {
        &self.models.base_path
    }

    /// Category-to-folder mapping, in deterministic order: the override
    /// entries in document order, or `<base_path>/<sub>` for the fixed
    /// subfolder list.
    pub fn folder_paths(&self) -> Vec<(String, PathBuf)> {
        if self.folders.override_mode {
            self.folders
                .entries
                .iter()
                .filter_map(|(name, value)| {
                    value.as_str().map(|p| (name.clone(), PathBuf::from(p)))
                })
                .collect()
        } else {
            DEFAULT_SUBFOLDERS
                .iter()
                .map(|sub| (sub.to_string(), self.models.base_path.join(sub)))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_mapping_follows_fixed_subfolder_list() {
        let config: Config = toml::from_str(
            r#"
            [models]
            base_path = "/m"
            "#,
        )
        .unwrap();

        let paths = config.folder_paths();
        assert_eq!(paths.len(), DEFAULT_SUBFOLDERS.len());
        assert_eq!(paths[0].0, "checkpoints");
        assert_eq!(paths[0].1, PathBuf::from("/m/checkpoints"));
        assert_eq!(paths.last().unwrap().0, "vae_approx");
    }

    #[test]
    fn override_mapping_keeps_document_order() {
        let config: Config = toml::from_str(
            r#"
            [models]
            base_path = "/m"

            [folders]
            override = true
            loras = "/big/loras"
            checkpoints = "/big/ckpt"
            "#,
        )
        .unwrap();

        let paths = config.folder_paths();
        assert_eq!(
            paths,
            vec![
                ("loras".to_string(), PathBuf::from("/big/loras")),
                ("checkpoints".to_string(), PathBuf::from("/big/ckpt")),
            ]
        );
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = Config::load(Path::new("/nonexistent/civitgrab.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("civitgrab.toml");
        std::fs::write(&path, "models = 3").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
