//! Destination path resolution: category-to-folder matching and file naming.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::config::Config;
use crate::error::Result;
use crate::models::ModelDescriptor;

/// Folder under the base path used when no configured folder matches.
const FALLBACK_FOLDER: &str = "temp";

/// Maps a model's category to a destination folder and builds the final
/// file path. Resolution is idempotent: identical inputs give identical
/// paths, and directory creation tolerates existing directories.
pub struct PathResolver {
    base_path: PathBuf,
    folders: Vec<(String, PathBuf)>,
}

impl PathResolver {
    pub fn new(base_path: PathBuf, folders: Vec<(String, PathBuf)>) -> Self {
        Self { base_path, folders }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.base_path().to_path_buf(), config.folder_paths())
    }

    /// Configured folder names, in configuration order. Used to prompt a
    /// folder choice for models of the ambiguous "other" category.
    pub fn folder_names(&self) -> Vec<String> {
        self.folders.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Resolve the destination path for `model` and create the
    /// destination directory.
    ///
    /// An explicit `override_folder` is looked up among the configured
    /// folders, falling back to `<base_path>/<override_folder>` when not
    /// configured. Without an override, the first configured folder whose
    /// key is a substring match (either direction, case-insensitive) of
    /// the category name wins; no match lands in the temp folder.
    pub fn resolve(
        &self,
        model: &ModelDescriptor,
        override_folder: Option<&str>,
    ) -> Result<PathBuf> {
        let dir = match override_folder {
            Some(folder) => self
                .configured(folder)
                .unwrap_or_else(|| self.base_path.join(folder)),
            None => self.match_category(model),
        };
        fs::create_dir_all(&dir)?;
        Ok(dir.join(self.file_name(model)))
    }

    fn configured(&self, name: &str) -> Option<PathBuf> {
        self.folders
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, path)| path.clone())
    }

    fn match_category(&self, model: &ModelDescriptor) -> PathBuf {
        let category = model.category().as_str();
        for (name, path) in &self.folders {
            let key = name.to_ascii_lowercase();
            if key.contains(category) || category.contains(key.as_str()) {
                return path.clone();
            }
        }
        warn!(
            "no configured folder matches category '{}' for '{}', using '{}'",
            category,
            model.name(),
            FALLBACK_FOLDER
        );
        self.base_path.join(FALLBACK_FOLDER)
    }

    fn file_name(&self, model: &ModelDescriptor) -> String {
        let safe: String = model
            .name()
            .chars()
            .map(|c| match c {
                ' ' | '/' | '\\' => '_',
                other => other,
            })
            .collect();
        match model.latest_file_extension() {
            Some(ext) => format!("{}.{}", safe, ext),
            None => safe,
        }
    }
}
