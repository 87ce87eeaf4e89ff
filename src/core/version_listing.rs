use std::time::Duration;

use serde::Deserialize;

use crate::core::version_cache::MinecraftVersionEntry;

pub const MINECRAFT_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";
pub const FORGE_PROMOTIONS_URL: &str =
    "https://files.minecraftforge.net/net/minecraftforge/forge/promotions_slim.json";
pub const FABRIC_META_BASE: &str = "https://meta.fabricmc.net/v2";

#[derive(Debug, Clone, Deserialize)]
pub struct FabricLoaderEntry {
    pub version: String,
    #[serde(default)]
    pub stable: bool,
}

pub trait VersionListingProvider: Send + Sync {
    fn minecraft_versions(&self) -> Result<Vec<MinecraftVersionEntry>, String>;
    fn forge_versions(&self, minecraft_version: &str) -> Result<Vec<String>, String>;
    fn fabric_loader_versions(&self) -> Result<Vec<FabricLoaderEntry>, String>;
    fn fabric_game_versions(&self) -> Result<Vec<String>, String>;
}

#[derive(Debug, Deserialize)]
struct PistonManifest {
    versions: Vec<PistonVersionEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PistonVersionEntry {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    url: String,
    time: String,
    release_time: String,
}

#[derive(Debug, Deserialize)]
struct ForgePromotions {
    promos: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct FabricGameEntry {
    version: String,
}

pub struct HttpVersionListing {
    client: reqwest::blocking::Client,
    manifest_url: String,
    promotions_url: String,
    fabric_base: String,
}

impl Default for HttpVersionListing {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpVersionListing {
    pub fn new() -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            client,
            manifest_url: MINECRAFT_MANIFEST_URL.to_string(),
            promotions_url: FORGE_PROMOTIONS_URL.to_string(),
            fabric_base: FABRIC_META_BASE.to_string(),
        }
    }

    pub fn with_endpoints(manifest_url: &str, promotions_url: &str, fabric_base: &str) -> Self {
        Self {
            manifest_url: manifest_url.to_string(),
            promotions_url: promotions_url.to_string(),
            fabric_base: fabric_base.to_string(),
            ..Self::new()
        }
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, String> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|error| format!("No se pudo consultar {url}: {error}"))?;
        if !response.status().is_success() {
            return Err(format!(
                "Respuesta {} al consultar {url}",
                response.status()
            ));
        }
        response
            .json::<T>()
            .map_err(|error| format!("No se pudo parsear la respuesta de {url}: {error}"))
    }
}

impl VersionListingProvider for HttpVersionListing {
    fn minecraft_versions(&self) -> Result<Vec<MinecraftVersionEntry>, String> {
        let manifest: PistonManifest = self.get_json(&self.manifest_url)?;
        Ok(manifest
            .versions
            .into_iter()
            .map(|entry| MinecraftVersionEntry {
                id: entry.id,
                kind: entry.kind,
                url: entry.url,
                time: entry.time,
                release_time: entry.release_time,
            })
            .collect())
    }

    fn forge_versions(&self, minecraft_version: &str) -> Result<Vec<String>, String> {
        let promotions: ForgePromotions = self.get_json(&self.promotions_url)?;
        let mut versions = Vec::new();
        // El slot "latest" va primero: el orden esperado es de más nueva a más vieja
        for slot in ["latest", "recommended"] {
            if let Some(forge) = promotions.promos.get(&format!("{minecraft_version}-{slot}")) {
                let id = format!("{minecraft_version}-{forge}");
                if !versions.contains(&id) {
                    versions.push(id);
                }
            }
        }
        Ok(versions)
    }

    fn fabric_loader_versions(&self) -> Result<Vec<FabricLoaderEntry>, String> {
        self.get_json(&format!("{}/versions/loader", self.fabric_base))
    }

    fn fabric_game_versions(&self) -> Result<Vec<String>, String> {
        let entries: Vec<FabricGameEntry> =
            self.get_json(&format!("{}/versions/game", self.fabric_base))?;
        Ok(entries.into_iter().map(|entry| entry.version).collect())
    }
}
