//! Catalog namespaces.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The two node namespaces of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// The `folders` table.
    Folders,
    /// The `files` table.
    Files,
}

impl Namespace {
    /// Singular label used in messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Folders => "Folder",
            Self::Files => "File",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Folders => write!(f, "folders"),
            Self::Files => write!(f, "files"),
        }
    }
}
