use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::paths::LauncherDataLayout;
use crate::core::LoaderKind;

pub const DEFAULT_MIN_RAM_MB: u32 = 2048;
pub const DEFAULT_MAX_RAM_MB: u32 = 4096;
pub const DEFAULT_RESOLUTION_WIDTH: u32 = 854;
pub const DEFAULT_RESOLUTION_HEIGHT: u32 = 480;
pub const DEFAULT_JAVA_ARGS: &str = "-XX:+UnlockExperimentalVMOptions -XX:+UseG1GC -XX:G1NewSizePercent=20 -XX:G1ReservePercent=20 -XX:MaxGCPauseMillis=50 -XX:G1HeapRegionSize=32M";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub id: String,
    pub name: String,
    pub version_id: String,
    #[serde(default)]
    pub game_directory: Option<String>,
    #[serde(default)]
    pub java_path: Option<String>,
    pub min_ram: u32,
    pub max_ram: u32,
    pub resolution_width: u32,
    pub resolution_height: u32,
    pub fullscreen: bool,
    pub java_args: String,
    #[serde(default)]
    pub loader: Option<LoaderKind>,
    #[serde(default)]
    pub loader_version: Option<String>,
    #[serde(default = "default_icon")]
    pub icon: String,
    pub created_at: String,
    #[serde(default)]
    pub last_used: Option<String>,
    #[serde(default)]
    pub mods: Vec<String>,
    #[serde(default)]
    pub custom_settings: BTreeMap<String, Value>,
}

fn default_icon() -> String {
    "default".to_string()
}

impl ProfileRecord {
    pub fn new(name: &str, version_id: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            version_id: version_id.to_string(),
            game_directory: None,
            java_path: None,
            min_ram: DEFAULT_MIN_RAM_MB,
            max_ram: DEFAULT_MAX_RAM_MB,
            resolution_width: DEFAULT_RESOLUTION_WIDTH,
            resolution_height: DEFAULT_RESOLUTION_HEIGHT,
            fullscreen: false,
            java_args: DEFAULT_JAVA_ARGS.to_string(),
            loader: None,
            loader_version: None,
            icon: default_icon(),
            created_at: Utc::now().to_rfc3339(),
            last_used: None,
            mods: Vec::new(),
            custom_settings: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.min_ram == 0 {
            return Err("La memoria mínima debe ser mayor que cero".to_string());
        }
        if self.max_ram <= self.min_ram {
            return Err(format!(
                "La memoria máxima ({} MB) debe ser mayor que la mínima ({} MB)",
                self.max_ram, self.min_ram
            ));
        }
        if !self.fullscreen && (self.resolution_width == 0 || self.resolution_height == 0) {
            return Err("La resolución debe ser mayor que cero".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ProfileStore {
    layout: LauncherDataLayout,
}

impl ProfileStore {
    pub fn new(layout: &LauncherDataLayout) -> Self {
        Self {
            layout: layout.clone(),
        }
    }

    pub fn load(&self, profile_id: &str) -> Option<ProfileRecord> {
        let path = self.layout.profile_path(profile_id);
        if !path.exists() {
            tracing::warn!("Perfil no encontrado: {profile_id}");
            return None;
        }
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::error!("Error leyendo el perfil {profile_id}: {error}");
                return None;
            }
        };
        match serde_json::from_str::<ProfileRecord>(&raw) {
            Ok(profile) => Some(profile),
            Err(error) => {
                tracing::error!("Error cargando el perfil {profile_id}: {error}");
                None
            }
        }
    }

    pub fn load_all(&self) -> BTreeMap<String, ProfileRecord> {
        let mut profiles = BTreeMap::new();
        let entries = match fs::read_dir(&self.layout.profiles) {
            Ok(entries) => entries,
            Err(_) => {
                let _ = fs::create_dir_all(&self.layout.profiles);
                return self.with_default_profile(profiles);
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(profile_id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if let Some(profile) = self.load(profile_id) {
                profiles.insert(profile_id.to_string(), profile);
            }
        }

        self.with_default_profile(profiles)
    }

    fn with_default_profile(
        &self,
        mut profiles: BTreeMap<String, ProfileRecord>,
    ) -> BTreeMap<String, ProfileRecord> {
        if !profiles.is_empty() {
            return profiles;
        }

        tracing::info!("No hay perfiles, creando el perfil por defecto");
        let mut profile = ProfileRecord::new("Principal", "1.20.1");
        profile.loader = Some(LoaderKind::Forge);
        profile.loader_version = Some("1.20.1-47.2.0".to_string());
        if self.save(&profile) {
            profiles.insert(profile.id.clone(), profile);
        } else {
            tracing::error!("No se pudo guardar el perfil por defecto");
        }
        profiles
    }

    pub fn save(&self, profile: &ProfileRecord) -> bool {
        let path = self.layout.profile_path(&profile.id);
        if let Some(parent) = path.parent() {
            if let Err(error) = fs::create_dir_all(parent) {
                tracing::error!("No se pudo crear la carpeta de perfiles: {error}");
                return false;
            }
        }
        let raw = match serde_json::to_string_pretty(profile) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::error!("No se pudo serializar el perfil {}: {error}", profile.id);
                return false;
            }
        };
        match fs::write(&path, raw) {
            Ok(()) => {
                tracing::info!("Perfil guardado: {} ({})", profile.name, profile.id);
                true
            }
            Err(error) => {
                tracing::error!("Error guardando el perfil {}: {error}", profile.id);
                false
            }
        }
    }

    pub fn delete(&self, profile_id: &str) -> bool {
        let path = self.layout.profile_path(profile_id);
        if !path.exists() {
            tracing::warn!("Perfil para eliminar no encontrado: {profile_id}");
            return false;
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("Perfil eliminado: {profile_id}");
                true
            }
            Err(error) => {
                tracing::error!("Error eliminando el perfil {profile_id}: {error}");
                false
            }
        }
    }

    pub fn touch_last_used(&self, profile: &mut ProfileRecord) -> bool {
        profile.last_used = Some(Utc::now().to_rfc3339());
        self.save(profile)
    }

    pub fn import(&self, file_path: &Path) -> Option<ProfileRecord> {
        let raw = match fs::read_to_string(file_path) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::error!(
                    "No se pudo leer el perfil a importar {}: {error}",
                    file_path.display()
                );
                return None;
            }
        };
        let mut profile = match serde_json::from_str::<ProfileRecord>(&raw) {
            Ok(profile) => profile,
            Err(error) => {
                tracing::error!("Error importando el perfil: {error}");
                return None;
            }
        };

        // Identificador nuevo para no pisar un perfil existente
        profile.id = uuid::Uuid::new_v4().to_string();
        if self.save(&profile) {
            tracing::info!("Perfil importado: {} ({})", profile.name, profile.id);
            Some(profile)
        } else {
            None
        }
    }

    pub fn export(&self, profile_id: &str, file_path: &Path) -> bool {
        let Some(profile) = self.load(profile_id) else {
            tracing::error!("Perfil para exportar no encontrado: {profile_id}");
            return false;
        };
        let raw = match serde_json::to_string_pretty(&profile) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::error!("No se pudo serializar el perfil {profile_id}: {error}");
                return false;
            }
        };
        match fs::write(file_path, raw) {
            Ok(()) => {
                tracing::info!(
                    "Perfil exportado: {} ({}) a {}",
                    profile.name,
                    profile.id,
                    file_path.display()
                );
                true
            }
            Err(error) => {
                tracing::error!("Error exportando el perfil {profile_id}: {error}");
                false
            }
        }
    }
}
