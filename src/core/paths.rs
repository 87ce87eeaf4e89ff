use std::fs;
use std::path::{Path, PathBuf};

pub const APP_DIR_NAME: &str = "lanzadera";

#[derive(Debug, Clone)]
pub struct LauncherDataLayout {
    pub data: PathBuf,
    pub config: PathBuf,
    pub cache: PathBuf,
    pub logs: PathBuf,
    pub minecraft: PathBuf,
    pub profiles: PathBuf,
}

impl LauncherDataLayout {
    pub fn from_data_root(root: &Path) -> Self {
        Self {
            data: root.to_path_buf(),
            config: root.join("config"),
            cache: root.join("cache"),
            logs: root.join("logs"),
            minecraft: root.join("minecraft"),
            profiles: root.join("profiles"),
        }
    }

    pub fn default_layout() -> Self {
        let data = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME);
        Self {
            config: dirs::config_dir()
                .unwrap_or_else(|| data.clone())
                .join(APP_DIR_NAME),
            cache: dirs::cache_dir()
                .unwrap_or_else(|| data.clone())
                .join(APP_DIR_NAME),
            logs: data.join("logs"),
            minecraft: data.join("minecraft"),
            profiles: data.join("profiles"),
            data,
        }
    }

    pub fn ensure(&self) -> Result<(), String> {
        for path in [
            &self.data,
            &self.config,
            &self.cache,
            &self.logs,
            &self.minecraft,
            &self.profiles,
            &self.minecraft.join("versions"),
            &self.minecraft.join("assets"),
            &self.minecraft.join("libraries"),
        ] {
            fs::create_dir_all(path).map_err(|error| {
                format!(
                    "No se pudo crear carpeta de datos {}: {error}",
                    path.display()
                )
            })?;
        }
        Ok(())
    }

    pub fn profile_path(&self, profile_id: &str) -> PathBuf {
        self.profiles.join(format!("{profile_id}.json"))
    }

    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.json")
    }

    pub fn accounts_file(&self) -> PathBuf {
        self.config.join("accounts.json")
    }

    pub fn cache_file(&self, name: &str) -> PathBuf {
        self.cache.join(name)
    }
}
