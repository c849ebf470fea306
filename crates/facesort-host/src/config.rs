//! Host configuration: data locations with environment overrides.

use std::path::PathBuf;

/// Where the host keeps its settings file, embedding cache, and sorted
/// output.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Root folder sorted photos are copied into, one subfolder per person.
    pub output_dir: PathBuf,
    /// Destination for photos with more than one detected face.
    pub group_photo_dir: PathBuf,
    /// Path to the settings file.
    pub settings_path: PathBuf,
    /// Path to the embedding cache document.
    pub cache_path: PathBuf,
}

impl HostConfig {
    /// Standard layout under a base directory.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        let output_dir = base.join("Sorted_Images");
        Self {
            group_photo_dir: output_dir.join("Group_Photos"),
            output_dir,
            settings_path: base.join("settings.toml"),
            cache_path: base.join("gallery.json"),
        }
    }

    /// Load from `FACESORT_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let base = std::env::var("FACESORT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());
        let mut config = Self::new(base);

        if let Ok(dir) = std::env::var("FACESORT_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
            config.group_photo_dir = config.output_dir.join("Group_Photos");
        }
        if let Ok(path) = std::env::var("FACESORT_SETTINGS_PATH") {
            config.settings_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("FACESORT_CACHE_PATH") {
            config.cache_path = PathBuf::from(path);
        }
        config
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facesort")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_layout() {
        let config = HostConfig::new("/data");
        assert_eq!(config.output_dir, PathBuf::from("/data/Sorted_Images"));
        assert_eq!(
            config.group_photo_dir,
            PathBuf::from("/data/Sorted_Images/Group_Photos")
        );
        assert_eq!(config.settings_path, PathBuf::from("/data/settings.toml"));
        assert_eq!(config.cache_path, PathBuf::from("/data/gallery.json"));
    }
}
