pub mod account;
pub mod installer;
pub mod launcher;
pub mod paths;
pub mod profile;
pub mod settings;
pub mod updater;
pub mod version_cache;
pub mod version_listing;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderKind {
    Forge,
    Fabric,
}

impl LoaderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoaderKind::Forge => "forge",
            LoaderKind::Fabric => "fabric",
        }
    }
}

impl std::fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
