use std::path::{Path, PathBuf};
use std::process::Command;

/// Observador de progreso de una instalación. El instalador llama a
/// `set_max` antes de empezar a contar y luego a `set_progress` con
/// valores dentro de [0, max].
pub trait InstallProgress {
    fn set_status(&mut self, status: &str);
    fn set_progress(&mut self, current: u64);
    fn set_max(&mut self, maximum: u64);
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaunchOptions {
    pub username: String,
    pub uuid: String,
    pub access_token: String,
    pub launcher_name: String,
    pub launcher_version: String,
    pub game_directory: PathBuf,
    pub jvm_arguments: Vec<String>,
    pub resolution: Option<(u32, u32)>,
    pub executable_path: Option<PathBuf>,
}

pub trait GameInstaller: Send + Sync {
    fn install_version(
        &self,
        version_id: &str,
        game_dir: &Path,
        progress: &mut dyn InstallProgress,
    ) -> Result<(), String>;

    fn install_forge(
        &self,
        forge_version: &str,
        game_dir: &Path,
        progress: &mut dyn InstallProgress,
    ) -> Result<(), String>;

    fn install_fabric(
        &self,
        minecraft_version: &str,
        game_dir: &Path,
        loader_version: &str,
        progress: &mut dyn InstallProgress,
    ) -> Result<(), String>;

    fn find_forge_versions(&self, minecraft_version: &str) -> Result<Vec<String>, String>;

    fn latest_fabric_loader(&self) -> Result<String, String>;

    fn launch_command(
        &self,
        version_id: &str,
        game_dir: &Path,
        options: &LaunchOptions,
    ) -> Result<Command, String>;
}

/// Reescala el progreso nativo de una fase a un subintervalo del total.
/// Con dos fases, la base ocupa [0, 50] y el cargador [50, 100]; el
/// máximo global que ve el observador interior siempre es 100.
pub struct ScaledProgress<'a> {
    inner: &'a mut dyn InstallProgress,
    offset: u64,
    span: u64,
    native_max: u64,
}

impl<'a> ScaledProgress<'a> {
    pub fn new(inner: &'a mut dyn InstallProgress, offset: u64, span: u64) -> Self {
        inner.set_max(100);
        Self {
            inner,
            offset,
            span,
            native_max: 100,
        }
    }
}

impl InstallProgress for ScaledProgress<'_> {
    fn set_status(&mut self, status: &str) {
        self.inner.set_status(status);
    }

    fn set_progress(&mut self, current: u64) {
        let scaled = if self.native_max == 0 {
            self.offset
        } else {
            self.offset + current * self.span / self.native_max
        };
        self.inner.set_progress(scaled.min(self.offset + self.span));
    }

    fn set_max(&mut self, maximum: u64) {
        self.native_max = maximum;
    }
}
