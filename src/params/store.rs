//! Track storage layout.

use std::path::PathBuf;

/// Where track files live and how they are named.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the numbered track files
    pub directory: PathBuf,

    /// Filename prefix for saved tracks
    pub prefix: String,

    /// File extension (RIFF/WAVE container)
    pub extension: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            prefix: "track_".to_string(),
            extension: "wav".to_string(),
        }
    }
}

impl StoreConfig {
    /// Path for a given track index: `<dir>/track_<index>.wav`.
    pub fn track_path(&self, index: u32) -> PathBuf {
        self.directory
            .join(format!("{}{}.{}", self.prefix, index, self.extension))
    }

    /// Whether a file name follows the track naming convention.
    pub fn is_track_file(&self, name: &str) -> bool {
        let Some(stem) = name.strip_prefix(self.prefix.as_str()) else {
            return false;
        };
        let Some(stem) = stem.strip_suffix(&format!(".{}", self.extension)) else {
            return false;
        };
        !stem.is_empty() && stem.bytes().all(|b| b.is_ascii_digit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_path_follows_naming_convention() {
        let config = StoreConfig::default();
        assert_eq!(config.track_path(3), PathBuf::from("./track_3.wav"));
    }

    #[test]
    fn is_track_file_accepts_only_numbered_tracks() {
        let config = StoreConfig::default();
        assert!(config.is_track_file("track_1.wav"));
        assert!(config.is_track_file("track_42.wav"));
        assert!(!config.is_track_file("track_.wav"));
        assert!(!config.is_track_file("track_1.txt"));
        assert!(!config.is_track_file("take_1.wav"));
        assert!(!config.is_track_file("track_one.wav"));
    }
}
