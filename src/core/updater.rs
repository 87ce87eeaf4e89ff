use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

pub const UPDATE_API_URL: &str = "https://api.lanzadera.app/updates";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Deserialize)]
struct LatestRelease {
    latest_version: String,
}

fn download_url(info: &Value) -> Option<&str> {
    info.get("download_url").and_then(Value::as_str)
}

pub struct UpdateChecker {
    client: reqwest::blocking::Client,
    download_client: reqwest::blocking::Client,
    base_url: String,
    current_version: String,
}

impl Default for UpdateChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdateChecker {
    pub fn new() -> Self {
        Self::with_endpoint(UPDATE_API_URL, APP_VERSION)
    }

    pub fn with_endpoint(base_url: &str, current_version: &str) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        let download_client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            client,
            download_client,
            base_url: base_url.to_string(),
            current_version: current_version.to_string(),
        }
    }

    /// Versión remota si es estrictamente más nueva que la actual.
    pub fn check_for_updates(&self) -> Option<String> {
        let response = match self.client.get(&self.base_url).send() {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!("No se pudo comprobar actualizaciones: {error}");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!(
                "Respuesta {} al comprobar actualizaciones",
                response.status()
            );
            return None;
        }
        let release: LatestRelease = match response.json() {
            Ok(release) => release,
            Err(error) => {
                tracing::warn!("Respuesta de actualizaciones ilegible: {error}");
                return None;
            }
        };

        if compare_versions(&release.latest_version, &self.current_version) == Ordering::Greater {
            tracing::info!(
                "Actualización disponible: {} (actual {})",
                release.latest_version,
                self.current_version
            );
            Some(release.latest_version)
        } else {
            None
        }
    }

    pub fn update_info(&self, version: &str) -> Option<Value> {
        let url = format!("{}/{version}", self.base_url);
        let response = match self.client.get(&url).send() {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::warn!("Respuesta {} al pedir la versión {version}", response.status());
                return None;
            }
            Err(error) => {
                tracing::warn!("No se pudo pedir la versión {version}: {error}");
                return None;
            }
        };
        match response.json() {
            Ok(info) => Some(info),
            Err(error) => {
                tracing::warn!("Detalle de la versión {version} ilegible: {error}");
                None
            }
        }
    }

    /// Descarga el paquete publicado en el `download_url` del detalle de
    /// la versión.
    pub fn download_update(&self, version: &str, output_path: &Path) -> bool {
        let Some(info) = self.update_info(version) else {
            tracing::error!("Sin información de la versión {version}");
            return false;
        };
        let Some(url) = download_url(&info) else {
            tracing::error!("El detalle de la versión {version} no trae download_url");
            return false;
        };

        let mut response = match self.download_client.get(url).send() {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::error!(
                    "Respuesta {} al descargar la versión {version}",
                    response.status()
                );
                return false;
            }
            Err(error) => {
                tracing::error!("No se pudo descargar la versión {version}: {error}");
                return false;
            }
        };

        let mut file = match fs::File::create(output_path) {
            Ok(file) => file,
            Err(error) => {
                tracing::error!(
                    "No se pudo crear el archivo {}: {error}",
                    output_path.display()
                );
                return false;
            }
        };
        match response.copy_to(&mut file) {
            Ok(bytes) => {
                tracing::info!(
                    "Versión {version} descargada en {} ({bytes} bytes)",
                    output_path.display()
                );
                true
            }
            Err(error) => {
                tracing::error!("Error descargando la versión {version}: {error}");
                false
            }
        }
    }
}

/// Orden total entre versiones numéricas con puntos. Los tramos que
/// falten cuentan como cero, así "1.2" y "1.2.0" son iguales.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |version: &str| -> Vec<u64> {
        version
            .split('.')
            .map(|segment| segment.trim().parse().unwrap_or(0))
            .collect()
    };
    let mut left = parse(a);
    let mut right = parse(b);
    let width = left.len().max(right.len());
    left.resize(width, 0);
    right.resize(width, 0);
    left.cmp(&right)
}
