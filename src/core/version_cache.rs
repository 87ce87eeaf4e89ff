use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::paths::LauncherDataLayout;
use crate::core::version_listing::VersionListingProvider;
use crate::core::LoaderKind;

pub const CACHE_SCHEMA_VERSION: u32 = 1;
pub const CACHE_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);
pub const FALLBACK_RELEASE: &str = "1.20.1";

const MINECRAFT_CACHE_FILE: &str = "minecraft_versions.json";
const FORGE_CACHE_FILE: &str = "forge_versions.json";
const FABRIC_CACHE_FILE: &str = "fabric_versions.json";

/// Versiones base consultadas al reconstruir el catálogo de Forge.
const KNOWN_MINECRAFT_VERSIONS: [&str; 8] = [
    "1.20.1", "1.19.4", "1.18.2", "1.17.1", "1.16.5", "1.15.2", "1.14.4", "1.12.2",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinecraftVersionEntry {
    pub id: String,
    pub kind: String,
    pub url: String,
    pub time: String,
    pub release_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderVersionEntry {
    pub id: String,
    pub minecraft_version: String,
    pub loader: LoaderKind,
    pub loader_version: String,
    pub stable: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheSnapshot<T> {
    schema_version: u32,
    updated: String,
    versions: Vec<T>,
}

fn load_snapshot<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let Ok(raw) = fs::read_to_string(path) else {
        return Vec::new();
    };
    match serde_json::from_str::<CacheSnapshot<T>>(&raw) {
        Ok(snapshot) if snapshot.schema_version == CACHE_SCHEMA_VERSION => snapshot.versions,
        Ok(snapshot) => {
            tracing::warn!(
                "Caché {} con esquema {} distinto al actual, se descarta",
                path.display(),
                snapshot.schema_version
            );
            Vec::new()
        }
        Err(error) => {
            tracing::error!("Caché corrupta {}: {error}", path.display());
            Vec::new()
        }
    }
}

fn write_snapshot<T: Serialize>(path: &Path, versions: &[T]) {
    let snapshot = CacheSnapshot {
        schema_version: CACHE_SCHEMA_VERSION,
        updated: Utc::now().to_rfc3339(),
        versions: versions.iter().collect::<Vec<_>>(),
    };
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    match serde_json::to_string_pretty(&snapshot) {
        Ok(raw) => {
            if let Err(error) = fs::write(path, raw) {
                tracing::error!("Error escribiendo la caché {}: {error}", path.display());
            }
        }
        Err(error) => {
            tracing::error!("No se pudo serializar la caché {}: {error}", path.display());
        }
    }
}

fn cache_expired(path: &Path) -> bool {
    let Ok(metadata) = fs::metadata(path) else {
        return true;
    };
    let Ok(modified) = metadata.modified() else {
        return true;
    };
    match SystemTime::now().duration_since(modified) {
        Ok(age) => age > CACHE_LIFETIME,
        // Reloj hacia atrás: la caché sigue siendo utilizable
        Err(_) => false,
    }
}

pub struct VersionCatalog {
    layout: LauncherDataLayout,
    provider: Arc<dyn VersionListingProvider>,
    minecraft: Mutex<Option<Vec<MinecraftVersionEntry>>>,
    forge: Mutex<Option<Vec<LoaderVersionEntry>>>,
    fabric: Mutex<Option<Vec<LoaderVersionEntry>>>,
}

impl VersionCatalog {
    pub fn new(layout: &LauncherDataLayout, provider: Arc<dyn VersionListingProvider>) -> Self {
        Self {
            layout: layout.clone(),
            provider,
            minecraft: Mutex::new(None),
            forge: Mutex::new(None),
            fabric: Mutex::new(None),
        }
    }

    fn minecraft_cache_path(&self) -> PathBuf {
        self.layout.cache_file(MINECRAFT_CACHE_FILE)
    }

    fn forge_cache_path(&self) -> PathBuf {
        self.layout.cache_file(FORGE_CACHE_FILE)
    }

    fn fabric_cache_path(&self) -> PathBuf {
        self.layout.cache_file(FABRIC_CACHE_FILE)
    }

    pub fn minecraft_versions(&self, include_snapshots: bool) -> Vec<MinecraftVersionEntry> {
        let path = self.minecraft_cache_path();
        let mut guard = self.minecraft.lock().expect("lock de versiones");
        if guard.is_none() {
            *guard = Some(load_snapshot(&path));
        }

        let stale = guard.as_ref().is_some_and(|v| v.is_empty()) || cache_expired(&path);
        if stale {
            if let Err(error) = self.refresh_minecraft(&mut guard) {
                tracing::error!("Error obteniendo versiones de Minecraft: {error}");
                return filter_minecraft(&fallback_minecraft_versions(), include_snapshots);
            }
        }

        filter_minecraft(guard.as_deref().unwrap_or_default(), include_snapshots)
    }

    fn refresh_minecraft(
        &self,
        guard: &mut MutexGuard<'_, Option<Vec<MinecraftVersionEntry>>>,
    ) -> Result<(), String> {
        tracing::info!("Actualizando la caché de versiones de Minecraft...");
        let versions = self.provider.minecraft_versions()?;
        write_snapshot(&self.minecraft_cache_path(), &versions);
        tracing::info!("Caché actualizada: {} versiones de Minecraft", versions.len());
        **guard = Some(versions);
        Ok(())
    }

    pub fn forge_versions(&self, minecraft_version: &str) -> Vec<LoaderVersionEntry> {
        let path = self.forge_cache_path();
        let mut guard = self.forge.lock().expect("lock de versiones");
        if guard.is_none() {
            *guard = Some(load_snapshot(&path));
        }

        let stale = guard.as_ref().is_some_and(|v| v.is_empty()) || cache_expired(&path);
        if stale {
            if let Err(error) = self.refresh_forge(&mut guard) {
                tracing::error!("Error obteniendo versiones de Forge: {error}");
                return fallback_forge_versions(minecraft_version);
            }
        }

        filter_loader(guard.as_deref().unwrap_or_default(), minecraft_version)
    }

    fn refresh_forge(
        &self,
        guard: &mut MutexGuard<'_, Option<Vec<LoaderVersionEntry>>>,
    ) -> Result<(), String> {
        tracing::info!("Actualizando la caché de versiones de Forge...");
        let mut versions = Vec::new();
        for minecraft_version in KNOWN_MINECRAFT_VERSIONS {
            match self.provider.forge_versions(minecraft_version) {
                Ok(found) => {
                    for id in found {
                        let loader_version = id
                            .rsplit('-')
                            .next()
                            .unwrap_or(id.as_str())
                            .to_string();
                        versions.push(LoaderVersionEntry {
                            id,
                            minecraft_version: minecraft_version.to_string(),
                            loader: LoaderKind::Forge,
                            loader_version,
                            stable: true,
                        });
                    }
                }
                Err(error) => {
                    tracing::error!(
                        "Error obteniendo Forge para {minecraft_version}: {error}"
                    );
                }
            }
        }
        if versions.is_empty() {
            return Err("El listado de Forge no devolvió ninguna versión".to_string());
        }
        write_snapshot(&self.forge_cache_path(), &versions);
        tracing::info!("Caché actualizada: {} versiones de Forge", versions.len());
        **guard = Some(versions);
        Ok(())
    }

    pub fn fabric_versions(&self, minecraft_version: &str) -> Vec<LoaderVersionEntry> {
        let path = self.fabric_cache_path();
        let mut guard = self.fabric.lock().expect("lock de versiones");
        if guard.is_none() {
            *guard = Some(load_snapshot(&path));
        }

        let stale = guard.as_ref().is_some_and(|v| v.is_empty()) || cache_expired(&path);
        if stale {
            if let Err(error) = self.refresh_fabric(&mut guard) {
                tracing::error!("Error obteniendo versiones de Fabric: {error}");
                return fallback_fabric_versions(minecraft_version);
            }
        }

        filter_loader(guard.as_deref().unwrap_or_default(), minecraft_version)
    }

    fn refresh_fabric(
        &self,
        guard: &mut MutexGuard<'_, Option<Vec<LoaderVersionEntry>>>,
    ) -> Result<(), String> {
        tracing::info!("Actualizando la caché de versiones de Fabric...");
        let loader_versions = self.provider.fabric_loader_versions()?;
        let game_versions = self.provider.fabric_game_versions()?;

        let mut versions = Vec::new();
        for minecraft_version in game_versions.iter().take(10) {
            for loader in loader_versions.iter().take(5) {
                versions.push(LoaderVersionEntry {
                    id: format!(
                        "fabric-loader-{}-{minecraft_version}",
                        loader.version
                    ),
                    minecraft_version: minecraft_version.clone(),
                    loader: LoaderKind::Fabric,
                    loader_version: loader.version.clone(),
                    stable: loader.stable,
                });
            }
        }
        if versions.is_empty() {
            return Err("El listado de Fabric no devolvió ninguna versión".to_string());
        }
        write_snapshot(&self.fabric_cache_path(), &versions);
        tracing::info!("Caché actualizada: {} versiones de Fabric", versions.len());
        **guard = Some(versions);
        Ok(())
    }

    pub fn latest_release(&self) -> Option<String> {
        let versions = self.minecraft_versions(false);
        match versions.first() {
            Some(version) => Some(version.id.clone()),
            None => {
                tracing::warn!("Sin versiones de Minecraft, usando {FALLBACK_RELEASE}");
                Some(FALLBACK_RELEASE.to_string())
            }
        }
    }

    pub fn latest_forge(&self, minecraft_version: &str) -> Option<LoaderVersionEntry> {
        latest_of(self.forge_versions(minecraft_version))
    }

    pub fn latest_fabric(&self, minecraft_version: &str) -> Option<LoaderVersionEntry> {
        latest_of(self.fabric_versions(minecraft_version))
    }

    pub fn is_version_installed(&self, version_id: &str, game_dir: &Path) -> bool {
        let version_dir = game_dir.join("versions").join(version_id);
        version_dir.join(format!("{version_id}.json")).exists()
    }

    pub fn installed_versions(&self, game_dir: &Path) -> Vec<String> {
        let versions_dir = game_dir.join("versions");
        let Ok(entries) = fs::read_dir(&versions_dir) else {
            return Vec::new();
        };
        let mut installed: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|id| versions_dir.join(id).join(format!("{id}.json")).exists())
            .collect();
        installed.sort();
        installed
    }

    /// Contenido del descriptor JSON de una versión instalada.
    pub fn get_version_info(&self, version_id: &str, game_dir: &Path) -> Option<Value> {
        let path = game_dir
            .join("versions")
            .join(version_id)
            .join(format!("{version_id}.json"));
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::error!("No se pudo leer la versión {version_id}: {error}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(info) => Some(info),
            Err(error) => {
                tracing::error!("Descriptor de la versión {version_id} ilegible: {error}");
                None
            }
        }
    }

    pub fn delete_version(&self, version_id: &str, game_dir: &Path) -> bool {
        let version_dir = game_dir.join("versions").join(version_id);
        if !version_dir.exists() {
            tracing::warn!("Versión para eliminar no encontrada: {version_id}");
            return false;
        }
        match fs::remove_dir_all(&version_dir) {
            Ok(()) => {
                tracing::info!("Versión eliminada: {version_id}");
                true
            }
            Err(error) => {
                tracing::error!("Error eliminando la versión {version_id}: {error}");
                false
            }
        }
    }

    pub fn clear(&self) {
        for path in [
            self.minecraft_cache_path(),
            self.forge_cache_path(),
            self.fabric_cache_path(),
        ] {
            if path.exists() {
                if let Err(error) = fs::remove_file(&path) {
                    tracing::error!("Error borrando la caché {}: {error}", path.display());
                }
            }
        }
        *self.minecraft.lock().expect("lock de versiones") = None;
        *self.forge.lock().expect("lock de versiones") = None;
        *self.fabric.lock().expect("lock de versiones") = None;
        tracing::info!("Caché de versiones borrada");
    }

    pub fn force_refresh(&self) {
        tracing::info!("Actualización forzada de la caché de versiones...");
        self.clear();

        let mut minecraft = self.minecraft.lock().expect("lock de versiones");
        if let Err(error) = self.refresh_minecraft(&mut minecraft) {
            tracing::error!("Error actualizando versiones de Minecraft: {error}");
        }
        drop(minecraft);

        let mut forge = self.forge.lock().expect("lock de versiones");
        if let Err(error) = self.refresh_forge(&mut forge) {
            tracing::error!("Error actualizando versiones de Forge: {error}");
        }
        drop(forge);

        let mut fabric = self.fabric.lock().expect("lock de versiones");
        if let Err(error) = self.refresh_fabric(&mut fabric) {
            tracing::error!("Error actualizando versiones de Fabric: {error}");
        }
        drop(fabric);

        tracing::info!("Actualización de la caché completada");
    }
}

fn filter_minecraft(
    versions: &[MinecraftVersionEntry],
    include_snapshots: bool,
) -> Vec<MinecraftVersionEntry> {
    versions
        .iter()
        .filter(|version| {
            version.kind == "release" || (include_snapshots && version.kind == "snapshot")
        })
        .cloned()
        .collect()
}

fn filter_loader(versions: &[LoaderVersionEntry], minecraft_version: &str) -> Vec<LoaderVersionEntry> {
    versions
        .iter()
        .filter(|version| version.minecraft_version == minecraft_version)
        .cloned()
        .collect()
}

/// Primero la primera estable; si no hay estables, la primera a secas.
/// El proveedor lista de más nueva a más vieja.
fn latest_of(versions: Vec<LoaderVersionEntry>) -> Option<LoaderVersionEntry> {
    versions
        .iter()
        .find(|version| version.stable)
        .or_else(|| versions.first())
        .cloned()
}

fn fallback_minecraft_versions() -> Vec<MinecraftVersionEntry> {
    KNOWN_MINECRAFT_VERSIONS
        .iter()
        .map(|id| MinecraftVersionEntry {
            id: (*id).to_string(),
            kind: "release".to_string(),
            url: String::new(),
            time: String::new(),
            release_time: String::new(),
        })
        .collect()
}

fn fallback_forge_versions(minecraft_version: &str) -> Vec<LoaderVersionEntry> {
    let known: &[&str] = match minecraft_version {
        "1.20.1" => &["47.2.0", "47.1.0"],
        "1.19.4" => &["45.1.0", "45.0.66"],
        "1.18.2" => &["40.2.0", "40.1.0"],
        "1.17.1" => &["37.1.1", "37.1.0"],
        "1.16.5" => &["36.2.39", "36.2.0"],
        "1.15.2" => &["31.2.57", "31.2.0"],
        "1.14.4" => &["28.2.26", "28.2.0"],
        "1.12.2" => &["14.23.5.2859", "14.23.5.2854"],
        _ => &[],
    };
    known
        .iter()
        .map(|forge| LoaderVersionEntry {
            id: format!("{minecraft_version}-forge-{forge}"),
            minecraft_version: minecraft_version.to_string(),
            loader: LoaderKind::Forge,
            loader_version: (*forge).to_string(),
            stable: true,
        })
        .collect()
}

fn fallback_fabric_versions(minecraft_version: &str) -> Vec<LoaderVersionEntry> {
    let known: &[&str] = match minecraft_version {
        "1.20.1" => &["0.14.21", "0.14.20"],
        "1.19.4" => &["0.14.19", "0.14.18"],
        "1.18.2" => &["0.14.17", "0.14.16"],
        "1.17.1" => &["0.14.15", "0.14.14"],
        "1.16.5" => &["0.14.13", "0.14.12"],
        _ => &[],
    };
    known
        .iter()
        .map(|fabric| LoaderVersionEntry {
            id: format!("fabric-loader-{fabric}-{minecraft_version}"),
            minecraft_version: minecraft_version.to_string(),
            loader: LoaderKind::Fabric,
            loader_version: (*fabric).to_string(),
            stable: true,
        })
        .collect()
}
