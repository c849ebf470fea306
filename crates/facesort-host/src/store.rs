//! Settings file and embedding-cache persistence.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use facesort_core::settings::SortSettings;

use crate::config::HostConfig;
use crate::matcher::PersonGallery;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings file parse failed: {0}")]
    SettingsParse(#[from] toml::de::Error),
    #[error("settings file encode failed: {0}")]
    SettingsEncode(#[from] toml::ser::Error),
    #[error("gallery cache codec failed: {0}")]
    CacheCodec(#[from] serde_json::Error),
}

/// TOML settings file owned by the host.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file yields the defaults; unknown keys are ignored and
    /// values are sanitized on the way in.
    pub fn load(&self) -> Result<SortSettings, StoreError> {
        if !self.path.exists() {
            return Ok(SortSettings::default());
        }
        let raw = fs::read_to_string(&self.path)?;
        let settings: SortSettings = toml::from_str(&raw)?;
        Ok(settings.sanitized())
    }

    /// Writes only recognized keys; the stored document is always sanitized.
    pub fn save(&self, settings: &SortSettings) -> Result<(), StoreError> {
        let clean = settings.sanitized();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, toml::to_string_pretty(&clean)?)?;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheDocument {
    saved_at: String,
    gallery: PersonGallery,
}

/// JSON embedding-cache document owned by the host.
#[derive(Debug, Clone)]
pub struct GalleryStore {
    path: PathBuf,
}

impl GalleryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing cache yields an empty gallery.
    pub fn load(&self) -> Result<PersonGallery, StoreError> {
        if !self.path.exists() {
            return Ok(PersonGallery::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        let document: CacheDocument = serde_json::from_str(&raw)?;
        Ok(document.gallery)
    }

    pub fn save(&self, gallery: &PersonGallery) -> Result<(), StoreError> {
        let document = CacheDocument {
            saved_at: chrono::Utc::now().to_rfc3339(),
            gallery: gallery.clone(),
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&document)?)?;
        Ok(())
    }

    /// Remove the cache file and the sorted output folders.
    pub fn clear(&self, config: &HostConfig) -> Result<(), StoreError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        if config.output_dir.is_dir() {
            fs::remove_dir_all(&config.output_dir)?;
        }
        tracing::info!(cache = %self.path.display(), "cache cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::Embedding;
    use tempfile::TempDir;

    #[test]
    fn test_settings_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.toml"));
        assert_eq!(store.load().unwrap(), SortSettings::default());
    }

    #[test]
    fn test_settings_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.toml"));

        let settings = SortSettings {
            similarity_threshold: 0.71,
            resize_scale: 0.8,
            min_cluster_size: 3,
        };
        store.save(&settings).unwrap();
        assert_eq!(store.load().unwrap(), settings);
    }

    #[test]
    fn test_settings_unknown_keys_ignored_and_not_rewritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            "similarity_threshold = 0.7\nlegacy_flag = true\n",
        )
        .unwrap();

        let store = SettingsStore::new(&path);
        let loaded = store.load().unwrap();
        assert_eq!(loaded.similarity_threshold, 0.7);
        assert_eq!(loaded.min_cluster_size, 2);

        store.save(&loaded).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("legacy_flag"));
    }

    #[test]
    fn test_settings_out_of_range_sanitized_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "resize_scale = 3.5\nmin_cluster_size = 4\n").unwrap();

        let loaded = SettingsStore::new(&path).load().unwrap();
        assert_eq!(loaded.resize_scale, 0.5);
        assert_eq!(loaded.min_cluster_size, 4);
    }

    #[test]
    fn test_gallery_round_trip_and_clear() {
        let dir = TempDir::new().unwrap();
        let config = HostConfig::new(dir.path());
        let store = GalleryStore::new(&config.cache_path);

        assert!(store.load().unwrap().is_empty());

        let mut gallery = PersonGallery::new();
        gallery.match_or_add(Embedding::new(vec![1.0, 0.0]), 0.62);
        store.save(&gallery).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.person_count(), 1);
        assert_eq!(loaded.ids(), gallery.ids());

        fs::create_dir_all(&config.group_photo_dir).unwrap();
        store.clear(&config).unwrap();
        assert!(!config.cache_path.exists());
        assert!(!config.output_dir.exists());
        // Clearing twice is harmless.
        store.clear(&config).unwrap();
    }
}
