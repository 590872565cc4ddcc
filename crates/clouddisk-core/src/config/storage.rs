//! Filesystem mirror configuration.

use serde::{Deserialize, Serialize};

/// Physical storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base directory that mirrors the catalog tree. The root folder `/`
    /// maps to this directory.
    #[serde(default = "default_root_path")]
    pub root_path: String,
    /// Maximum accepted upload size in bytes (default 5 GB).
    #[serde(default = "default_max_upload")]
    pub max_upload_size_bytes: u64,
}

impl StorageConfig {
    /// Configuration rooted at the given directory with default limits.
    pub fn with_root(root_path: impl Into<String>) -> Self {
        Self {
            root_path: root_path.into(),
            ..Self::default()
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            max_upload_size_bytes: default_max_upload(),
        }
    }
}

fn default_root_path() -> String {
    "./data/storage".to_string()
}

fn default_max_upload() -> u64 {
    5_368_709_120 // 5 GB
}
