pub mod core;

pub use crate::core::account::{offline_uuid, validate_username, AccountRecord, AccountStore};
pub use crate::core::installer::{GameInstaller, InstallProgress, LaunchOptions, ScaledProgress};
pub use crate::core::launcher::{
    resolve_launch_version, CancellationToken, LaunchIdentity, LaunchOrchestrator, LaunchSignal,
    LaunchState,
};
pub use crate::core::paths::LauncherDataLayout;
pub use crate::core::profile::{ProfileRecord, ProfileStore};
pub use crate::core::settings::{LauncherSettings, SettingsStore};
pub use crate::core::updater::{compare_versions, UpdateChecker};
pub use crate::core::version_cache::{LoaderVersionEntry, MinecraftVersionEntry, VersionCatalog};
pub use crate::core::version_listing::{HttpVersionListing, VersionListingProvider};
pub use crate::core::LoaderKind;
