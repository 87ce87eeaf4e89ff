use std::collections::BTreeMap;
use std::fs;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::paths::LauncherDataLayout;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LauncherSettings {
    pub close_on_launch: bool,
    pub keep_launcher_open: bool,
    pub check_updates: bool,
    pub enable_animations: bool,
    pub enable_sounds: bool,
    pub language: String,
    pub theme: String,
    #[serde(default)]
    pub last_selected_profile: Option<String>,
    #[serde(default)]
    pub custom_settings: BTreeMap<String, Value>,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            close_on_launch: false,
            keep_launcher_open: true,
            check_updates: true,
            enable_animations: true,
            enable_sounds: true,
            language: "auto".to_string(),
            theme: "dark".to_string(),
            last_selected_profile: None,
            custom_settings: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    layout: LauncherDataLayout,
}

impl SettingsStore {
    pub fn new(layout: &LauncherDataLayout) -> Self {
        Self {
            layout: layout.clone(),
        }
    }

    pub fn load(&self) -> LauncherSettings {
        let path = self.layout.config_file();
        if !path.exists() {
            tracing::info!("No hay archivo de configuración, usando valores por defecto");
            return LauncherSettings::default();
        }
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::error!("Error leyendo la configuración: {error}");
                return LauncherSettings::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(error) => {
                tracing::error!(
                    "Configuración corrupta ({error}), usando valores por defecto"
                );
                LauncherSettings::default()
            }
        }
    }

    pub fn save(&self, settings: &LauncherSettings) -> bool {
        let path = self.layout.config_file();
        if let Some(parent) = path.parent() {
            if let Err(error) = fs::create_dir_all(parent) {
                tracing::error!("No se pudo crear la carpeta de configuración: {error}");
                return false;
            }
        }
        let raw = match serde_json::to_string_pretty(settings) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::error!("No se pudo serializar la configuración: {error}");
                return false;
            }
        };
        match fs::write(&path, raw) {
            Ok(()) => {
                tracing::info!("Configuración guardada");
                true
            }
            Err(error) => {
                tracing::error!("Error guardando la configuración: {error}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::paths::LauncherDataLayout;

    fn store() -> (tempfile::TempDir, SettingsStore) {
        let root = tempfile::tempdir().expect("tempdir");
        let layout = LauncherDataLayout::from_data_root(root.path());
        layout.ensure().expect("ensure");
        (root, SettingsStore::new(&layout))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let (_root, store) = store();
        assert_eq!(store.load(), LauncherSettings::default());
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let (root, store) = store();
        std::fs::write(root.path().join("config").join("config.json"), "###")
            .expect("write");
        assert_eq!(store.load(), LauncherSettings::default());
    }

    #[test]
    fn save_overwrites_wholesale() {
        let (_root, store) = store();
        let mut settings = LauncherSettings::default();
        settings.close_on_launch = true;
        settings.language = "es".to_string();
        settings.last_selected_profile = Some("abc".to_string());
        assert!(store.save(&settings));

        let loaded = store.load();
        assert_eq!(loaded, settings);

        settings.last_selected_profile = None;
        assert!(store.save(&settings));
        assert_eq!(store.load().last_selected_profile, None);
    }
}
