use std::fs;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::core::installer::{GameInstaller, InstallProgress, LaunchOptions, ScaledProgress};
use crate::core::paths::LauncherDataLayout;
use crate::core::profile::{ProfileRecord, ProfileStore};
use crate::core::version_cache::VersionCatalog;
use crate::core::LoaderKind;

pub const LAUNCHER_NAME: &str = "Lanzadera";
pub const LAUNCHER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const FALLBACK_FORGE_VERSION: &str = "47.2.0";
pub const FALLBACK_FABRIC_VERSION: &str = "0.14.21";

#[cfg(windows)]
const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;

#[derive(Debug, Clone, PartialEq)]
pub enum LaunchSignal {
    Started { profile_id: String },
    Progress { current: u64, maximum: u64, status: String },
    Finished { profile_id: String, success: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LaunchState {
    Idle,
    InstallingBase,
    InstallingLoader,
    Launching,
    Finished,
}

/// Identidad con la que se arranca el juego, resuelta por el llamante
/// contra el almacén de cuentas antes de entregar el trabajo al hilo.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchIdentity {
    pub username: String,
    pub uuid: String,
    pub access_token: String,
}

impl LaunchIdentity {
    pub fn new(username: String, uuid: String, access_token: String) -> Self {
        Self {
            username,
            uuid,
            access_token,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Reenvía el progreso del instalador como señales. Una vez levantado el
/// token de cancelación deja de emitir.
struct ChannelProgress {
    sender: UnboundedSender<LaunchSignal>,
    token: CancellationToken,
    status: String,
    current: u64,
    maximum: u64,
}

impl ChannelProgress {
    fn new(sender: UnboundedSender<LaunchSignal>, token: CancellationToken) -> Self {
        Self {
            sender,
            token,
            status: String::new(),
            current: 0,
            maximum: 100,
        }
    }

    fn emit(&self) {
        if self.token.is_cancelled() {
            return;
        }
        let _ = self.sender.send(LaunchSignal::Progress {
            current: self.current,
            maximum: self.maximum,
            status: self.status.clone(),
        });
    }
}

impl InstallProgress for ChannelProgress {
    fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
        self.emit();
    }

    fn set_progress(&mut self, current: u64) {
        self.current = current;
        self.emit();
    }

    fn set_max(&mut self, maximum: u64) {
        self.maximum = maximum;
    }
}

struct ActiveLaunch {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct LaunchOrchestrator {
    layout: LauncherDataLayout,
    installer: Arc<dyn GameInstaller>,
    catalog: Arc<VersionCatalog>,
    profiles: ProfileStore,
    sender: UnboundedSender<LaunchSignal>,
    state: Arc<Mutex<LaunchState>>,
    active: Arc<Mutex<Option<ActiveLaunch>>>,
}

impl LaunchOrchestrator {
    pub fn new(
        layout: &LauncherDataLayout,
        installer: Arc<dyn GameInstaller>,
        catalog: Arc<VersionCatalog>,
    ) -> (Self, UnboundedReceiver<LaunchSignal>) {
        let (sender, receiver) = unbounded_channel();
        let orchestrator = Self {
            layout: layout.clone(),
            installer,
            catalog,
            profiles: ProfileStore::new(layout),
            sender,
            state: Arc::new(Mutex::new(LaunchState::Idle)),
            active: Arc::new(Mutex::new(None)),
        };
        (orchestrator, receiver)
    }

    pub fn state(&self) -> LaunchState {
        *self.state.lock().expect("lock de estado")
    }

    pub fn is_launching(&self) -> bool {
        self.active
            .lock()
            .expect("lock de lanzamiento")
            .as_ref()
            .is_some_and(|active| !active.handle.is_finished())
    }

    pub fn launch(&self, profile_id: &str, identity: LaunchIdentity) {
        let mut active = self.active.lock().expect("lock de lanzamiento");
        if active.as_ref().is_some_and(|a| !a.handle.is_finished()) {
            tracing::warn!("Ya hay un lanzamiento en curso, se ignora el perfil {profile_id}");
            return;
        }

        let Some(profile) = self.profiles.load(profile_id) else {
            tracing::error!("Perfil no encontrado: {profile_id}");
            let _ = self.sender.send(LaunchSignal::Finished {
                profile_id: profile_id.to_string(),
                success: false,
            });
            return;
        };

        let _ = self.sender.send(LaunchSignal::Started {
            profile_id: profile_id.to_string(),
        });

        let token = CancellationToken::new();
        let worker = LaunchWorker {
            layout: self.layout.clone(),
            installer: self.installer.clone(),
            catalog: self.catalog.clone(),
            profiles: self.profiles.clone(),
            sender: self.sender.clone(),
            state: self.state.clone(),
            active: self.active.clone(),
            token: token.clone(),
        };

        let id = profile_id.to_string();
        let handle = std::thread::spawn(move || {
            let success = match worker.run(profile, identity) {
                Ok(finished) => finished,
                Err(error) => {
                    tracing::error!("Error lanzando el perfil {id}: {error}");
                    false
                }
            };
            *worker.state.lock().expect("lock de estado") = LaunchState::Finished;
            // El hueco se libera antes de avisar: quien reaccione a Finished
            // ya puede lanzar de nuevo
            *worker.active.lock().expect("lock de lanzamiento") = None;
            let _ = worker.sender.send(LaunchSignal::Finished {
                profile_id: id,
                success,
            });
        });

        *active = Some(ActiveLaunch { token, handle });
    }

    pub fn cancel(&self) {
        let active = self.active.lock().expect("lock de lanzamiento");
        if let Some(active) = active.as_ref() {
            tracing::info!("Cancelación solicitada");
            active.token.cancel();
        }
    }
}

struct LaunchWorker {
    layout: LauncherDataLayout,
    installer: Arc<dyn GameInstaller>,
    catalog: Arc<VersionCatalog>,
    profiles: ProfileStore,
    sender: UnboundedSender<LaunchSignal>,
    state: Arc<Mutex<LaunchState>>,
    active: Arc<Mutex<Option<ActiveLaunch>>>,
    token: CancellationToken,
}

impl LaunchWorker {
    fn set_state(&self, state: LaunchState) {
        *self.state.lock().expect("lock de estado") = state;
        tracing::info!("Lanzamiento: {state:?}");
    }

    /// Devuelve Ok(true) si el juego llegó a arrancar, Ok(false) si el
    /// lanzamiento se canceló a tiempo.
    fn run(&self, mut profile: ProfileRecord, identity: LaunchIdentity) -> Result<bool, String> {
        let game_dir = profile
            .game_directory
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.layout.minecraft.clone());
        fs::create_dir_all(&game_dir)
            .map_err(|error| format!("No se pudo crear la carpeta del juego: {error}"))?;

        if self.token.is_cancelled() {
            return Ok(false);
        }

        let mut progress = ChannelProgress::new(self.sender.clone(), self.token.clone());
        let has_loader = profile.loader.is_some();

        self.set_state(LaunchState::InstallingBase);
        progress.set_status(&format!("Instalando Minecraft {}...", profile.version_id));
        if has_loader {
            let mut scaled = ScaledProgress::new(&mut progress, 0, 50);
            self.installer
                .install_version(&profile.version_id, &game_dir, &mut scaled)?;
        } else {
            self.installer
                .install_version(&profile.version_id, &game_dir, &mut progress)?;
        }

        if self.token.is_cancelled() {
            return Ok(false);
        }

        if let Some(loader) = profile.loader {
            self.set_state(LaunchState::InstallingLoader);
            let resolved = self.resolve_loader_version(&profile, loader);
            let mut scaled = ScaledProgress::new(&mut progress, 50, 50);
            match loader {
                LoaderKind::Forge => {
                    scaled.set_status("Instalando Forge...");
                    let forge_id = if resolved.starts_with(&profile.version_id) {
                        resolved.clone()
                    } else {
                        format!("{}-{resolved}", profile.version_id)
                    };
                    self.installer
                        .install_forge(&forge_id, &game_dir, &mut scaled)?;
                }
                LoaderKind::Fabric => {
                    scaled.set_status("Instalando Fabric...");
                    self.installer.install_fabric(
                        &profile.version_id,
                        &game_dir,
                        &resolved,
                        &mut scaled,
                    )?;
                }
            }

            if profile.loader_version.is_none() {
                profile.loader_version = Some(resolved);
                self.profiles.save(&profile);
            }
        }

        if self.token.is_cancelled() {
            return Ok(false);
        }

        self.set_state(LaunchState::Launching);
        progress.set_status("Iniciando el juego...");

        let mut jvm_arguments: Vec<String> = profile
            .java_args
            .split_whitespace()
            .map(str::to_string)
            .collect();
        jvm_arguments.push(format!("-Xms{}M", profile.min_ram));
        jvm_arguments.push(format!("-Xmx{}M", profile.max_ram));

        let resolution = if profile.fullscreen {
            None
        } else {
            Some((profile.resolution_width, profile.resolution_height))
        };
        let executable_path = profile
            .java_path
            .as_ref()
            .map(PathBuf::from)
            .filter(|path| path.is_file());

        let options = LaunchOptions {
            username: identity.username,
            uuid: identity.uuid,
            access_token: identity.access_token,
            launcher_name: LAUNCHER_NAME.to_string(),
            launcher_version: LAUNCHER_VERSION.to_string(),
            game_directory: game_dir.clone(),
            jvm_arguments,
            resolution,
            executable_path,
        };

        let launch_version = resolve_launch_version(&profile);
        let mut command = self
            .installer
            .launch_command(&launch_version, &game_dir, &options)?;
        command
            .current_dir(&game_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            command.creation_flags(CREATE_NEW_CONSOLE);
        }

        let child = command
            .spawn()
            .map_err(|error| format!("No se pudo iniciar el juego: {error}"))?;
        tracing::info!("Juego iniciado ({launch_version}, pid {})", child.id());

        self.profiles.touch_last_used(&mut profile);
        Ok(true)
    }

    /// Versión del cargador, por orden: fijada en el perfil, la última del
    /// catálogo, lo que liste el propio instalador, y la constante de
    /// emergencia.
    fn resolve_loader_version(&self, profile: &ProfileRecord, loader: LoaderKind) -> String {
        if let Some(pinned) = &profile.loader_version {
            return pinned.clone();
        }
        let (latest, fallback) = match loader {
            LoaderKind::Forge => (
                self.catalog.latest_forge(&profile.version_id),
                FALLBACK_FORGE_VERSION,
            ),
            LoaderKind::Fabric => (
                self.catalog.latest_fabric(&profile.version_id),
                FALLBACK_FABRIC_VERSION,
            ),
        };
        if let Some(entry) = latest {
            return entry.loader_version;
        }

        let from_installer = match loader {
            LoaderKind::Forge => self
                .installer
                .find_forge_versions(&profile.version_id)
                .ok()
                .and_then(|versions| versions.into_iter().next()),
            LoaderKind::Fabric => self.installer.latest_fabric_loader().ok(),
        };
        match from_installer {
            Some(version) => version,
            None => {
                tracing::warn!(
                    "Sin versiones de {loader} para {}, usando {fallback}",
                    profile.version_id
                );
                fallback.to_string()
            }
        }
    }
}

/// Identificador de versión con el que se pide el comando de arranque.
pub fn resolve_launch_version(profile: &ProfileRecord) -> String {
    let base = &profile.version_id;
    match (profile.loader, profile.loader_version.as_deref()) {
        (Some(LoaderKind::Forge), Some(pinned)) if pinned.starts_with(base.as_str()) => {
            pinned.to_string()
        }
        (Some(LoaderKind::Forge), Some(pinned)) => format!("{base}-forge-{pinned}"),
        (Some(LoaderKind::Fabric), Some(pinned)) => format!("fabric-loader-{pinned}-{base}"),
        _ => base.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::process::Command;
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;
    use crate::core::version_cache::MinecraftVersionEntry;
    use crate::core::version_listing::{FabricLoaderEntry, VersionListingProvider};

    fn profile_with(loader: Option<LoaderKind>, pinned: Option<&str>) -> ProfileRecord {
        let mut profile = ProfileRecord::new("Prueba", "1.20.1");
        profile.loader = loader;
        profile.loader_version = pinned.map(str::to_string);
        profile
    }

    #[test]
    fn launch_version_scenarios() {
        let vanilla = profile_with(None, None);
        assert_eq!(resolve_launch_version(&vanilla), "1.20.1");

        let forge = profile_with(Some(LoaderKind::Forge), Some("47.2.0"));
        assert_eq!(resolve_launch_version(&forge), "1.20.1-forge-47.2.0");

        let forge_full = profile_with(Some(LoaderKind::Forge), Some("1.20.1-47.2.0"));
        assert_eq!(resolve_launch_version(&forge_full), "1.20.1-47.2.0");

        let forge_unpinned = profile_with(Some(LoaderKind::Forge), None);
        assert_eq!(resolve_launch_version(&forge_unpinned), "1.20.1");

        let fabric = profile_with(Some(LoaderKind::Fabric), Some("0.14.21"));
        assert_eq!(
            resolve_launch_version(&fabric),
            "fabric-loader-0.14.21-1.20.1"
        );
    }

    struct SilentListing;

    impl VersionListingProvider for SilentListing {
        fn minecraft_versions(&self) -> Result<Vec<MinecraftVersionEntry>, String> {
            Err("sin red".to_string())
        }

        fn forge_versions(&self, _minecraft_version: &str) -> Result<Vec<String>, String> {
            Err("sin red".to_string())
        }

        fn fabric_loader_versions(&self) -> Result<Vec<FabricLoaderEntry>, String> {
            Err("sin red".to_string())
        }

        fn fabric_game_versions(&self) -> Result<Vec<String>, String> {
            Err("sin red".to_string())
        }
    }

    #[derive(Default)]
    struct FakeInstallerState {
        base_installs: Vec<String>,
        forge_installs: Vec<String>,
        fabric_installs: Vec<(String, String)>,
        launches: Vec<String>,
    }

    struct FakeInstaller {
        state: Mutex<FakeInstallerState>,
        // El hilo de prueba libera la fase base por este canal
        gate: Option<Mutex<mpsc::Receiver<()>>>,
        started: Option<mpsc::Sender<()>>,
    }

    impl FakeInstaller {
        fn immediate() -> Arc<Self> {
            Arc::new(Self {
                state: Mutex::new(FakeInstallerState::default()),
                gate: None,
                started: None,
            })
        }

        fn gated() -> (Arc<Self>, mpsc::Sender<()>, mpsc::Receiver<()>) {
            let (release, gate) = mpsc::channel();
            let (started, started_rx) = mpsc::channel();
            let installer = Arc::new(Self {
                state: Mutex::new(FakeInstallerState::default()),
                gate: Some(Mutex::new(gate)),
                started: Some(started),
            });
            (installer, release, started_rx)
        }

        fn wait_at_gate(&self) {
            if let Some(started) = &self.started {
                let _ = started.send(());
            }
            if let Some(gate) = &self.gate {
                let _ = gate
                    .lock()
                    .expect("gate")
                    .recv_timeout(Duration::from_secs(5));
            }
        }
    }

    impl GameInstaller for FakeInstaller {
        fn install_version(
            &self,
            version_id: &str,
            _game_dir: &Path,
            progress: &mut dyn InstallProgress,
        ) -> Result<(), String> {
            progress.set_max(100);
            progress.set_progress(100);
            self.state
                .lock()
                .expect("estado")
                .base_installs
                .push(version_id.to_string());
            self.wait_at_gate();
            Ok(())
        }

        fn install_forge(
            &self,
            forge_version: &str,
            _game_dir: &Path,
            _progress: &mut dyn InstallProgress,
        ) -> Result<(), String> {
            self.state
                .lock()
                .expect("estado")
                .forge_installs
                .push(forge_version.to_string());
            Ok(())
        }

        fn install_fabric(
            &self,
            minecraft_version: &str,
            _game_dir: &Path,
            loader_version: &str,
            _progress: &mut dyn InstallProgress,
        ) -> Result<(), String> {
            self.state
                .lock()
                .expect("estado")
                .fabric_installs
                .push((minecraft_version.to_string(), loader_version.to_string()));
            Ok(())
        }

        fn find_forge_versions(&self, minecraft_version: &str) -> Result<Vec<String>, String> {
            Ok(vec![format!("{minecraft_version}-47.3.0")])
        }

        fn latest_fabric_loader(&self) -> Result<String, String> {
            Ok("0.14.21".to_string())
        }

        fn launch_command(
            &self,
            version_id: &str,
            _game_dir: &Path,
            _options: &LaunchOptions,
        ) -> Result<Command, String> {
            self.state
                .lock()
                .expect("estado")
                .launches
                .push(version_id.to_string());
            Ok(Command::new("true"))
        }
    }

    struct Fixture {
        _root: tempfile::TempDir,
        orchestrator: LaunchOrchestrator,
        receiver: UnboundedReceiver<LaunchSignal>,
        installer: Arc<FakeInstaller>,
        profiles: ProfileStore,
    }

    fn fixture(installer: Arc<FakeInstaller>) -> Fixture {
        let root = tempfile::tempdir().expect("tempdir");
        let layout = LauncherDataLayout::from_data_root(root.path());
        layout.ensure().expect("ensure");
        let catalog = Arc::new(VersionCatalog::new(&layout, Arc::new(SilentListing)));
        let profiles = ProfileStore::new(&layout);
        let (orchestrator, receiver) =
            LaunchOrchestrator::new(&layout, installer.clone(), catalog);
        Fixture {
            _root: root,
            orchestrator,
            receiver,
            installer,
            profiles,
        }
    }

    fn identity() -> LaunchIdentity {
        LaunchIdentity::new("Steve".to_string(), "uuid".to_string(), String::new())
    }

    fn wait_for_finish(receiver: &mut UnboundedReceiver<LaunchSignal>) -> Vec<LaunchSignal> {
        let mut signals = Vec::new();
        while let Some(signal) = receiver.blocking_recv() {
            let done = matches!(signal, LaunchSignal::Finished { .. });
            signals.push(signal);
            if done {
                break;
            }
        }
        signals
    }

    #[test]
    fn missing_profile_fails_without_starting() {
        let mut fx = fixture(FakeInstaller::immediate());
        fx.orchestrator.launch("no-existe", identity());
        let signals = wait_for_finish(&mut fx.receiver);
        assert_eq!(
            signals,
            vec![LaunchSignal::Finished {
                profile_id: "no-existe".to_string(),
                success: false,
            }]
        );
        assert!(fx
            .installer
            .state
            .lock()
            .expect("estado")
            .base_installs
            .is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn vanilla_launch_runs_base_install_and_spawns() {
        let mut fx = fixture(FakeInstaller::immediate());
        let profile = profile_with(None, None);
        assert!(fx.profiles.save(&profile));

        fx.orchestrator.launch(&profile.id, identity());
        let signals = wait_for_finish(&mut fx.receiver);

        assert!(matches!(signals.first(), Some(LaunchSignal::Started { .. })));
        assert!(matches!(
            signals.last(),
            Some(LaunchSignal::Finished { success: true, .. })
        ));
        let state = fx.installer.state.lock().expect("estado");
        assert_eq!(state.base_installs, vec!["1.20.1"]);
        assert!(state.forge_installs.is_empty());
        assert_eq!(state.launches, vec!["1.20.1"]);
        drop(state);

        // El lanzamiento deja registrado el último uso
        let reloaded = fx.profiles.load(&profile.id).expect("perfil");
        assert!(reloaded.last_used.is_some());
    }

    #[cfg(unix)]
    #[test]
    fn forge_launch_composes_the_install_id_and_scales_progress() {
        let mut fx = fixture(FakeInstaller::immediate());
        let profile = profile_with(Some(LoaderKind::Forge), Some("47.2.0"));
        assert!(fx.profiles.save(&profile));

        fx.orchestrator.launch(&profile.id, identity());
        let signals = wait_for_finish(&mut fx.receiver);

        let state = fx.installer.state.lock().expect("estado");
        assert_eq!(state.forge_installs, vec!["1.20.1-47.2.0"]);
        assert_eq!(state.launches, vec!["1.20.1-forge-47.2.0"]);
        drop(state);

        // El progreso de la fase base queda dentro de [0, 50]
        let base_progress: Vec<u64> = signals
            .iter()
            .filter_map(|signal| match signal {
                LaunchSignal::Progress { current, status, .. }
                    if status.starts_with("Instalando Minecraft") =>
                {
                    Some(*current)
                }
                _ => None,
            })
            .collect();
        assert!(!base_progress.is_empty());
        assert!(base_progress.iter().all(|current| *current <= 50));
    }

    #[cfg(unix)]
    #[test]
    fn unpinned_fabric_resolves_fallback_and_persists_it() {
        let mut fx = fixture(FakeInstaller::immediate());
        let profile = profile_with(Some(LoaderKind::Fabric), None);
        assert!(fx.profiles.save(&profile));

        fx.orchestrator.launch(&profile.id, identity());
        wait_for_finish(&mut fx.receiver);

        let state = fx.installer.state.lock().expect("estado");
        assert_eq!(
            state.fabric_installs,
            vec![("1.20.1".to_string(), FALLBACK_FABRIC_VERSION.to_string())]
        );
        drop(state);

        let reloaded = fx.profiles.load(&profile.id).expect("perfil");
        assert_eq!(
            reloaded.loader_version.as_deref(),
            Some(FALLBACK_FABRIC_VERSION)
        );
    }

    #[cfg(unix)]
    #[test]
    fn unpinned_forge_without_catalog_consults_the_installer_listing() {
        let mut fx = fixture(FakeInstaller::immediate());
        // Versión sin entradas de Forge en el catálogo ni en sus tablas
        let mut profile = profile_with(Some(LoaderKind::Forge), None);
        profile.version_id = "1.21".to_string();
        assert!(fx.profiles.save(&profile));

        fx.orchestrator.launch(&profile.id, identity());
        wait_for_finish(&mut fx.receiver);

        let state = fx.installer.state.lock().expect("estado");
        assert_eq!(state.forge_installs, vec!["1.21-47.3.0"]);
        drop(state);

        let reloaded = fx.profiles.load(&profile.id).expect("perfil");
        assert_eq!(reloaded.loader_version.as_deref(), Some("1.21-47.3.0"));
    }

    #[cfg(unix)]
    #[test]
    fn relaunch_right_after_finished_is_accepted() {
        let mut fx = fixture(FakeInstaller::immediate());
        let profile = profile_with(None, None);
        assert!(fx.profiles.save(&profile));

        fx.orchestrator.launch(&profile.id, identity());
        wait_for_finish(&mut fx.receiver);

        // Quien reacciona a Finished lanzando otra vez no puede ser rechazado
        fx.orchestrator.launch(&profile.id, identity());
        let signals = wait_for_finish(&mut fx.receiver);
        assert!(matches!(signals.first(), Some(LaunchSignal::Started { .. })));
        assert!(matches!(
            signals.last(),
            Some(LaunchSignal::Finished { success: true, .. })
        ));
    }

    #[test]
    fn second_launch_while_active_is_rejected_silently() {
        let (installer, release, started) = FakeInstaller::gated();
        let mut fx = fixture(installer);
        let profile = profile_with(None, None);
        assert!(fx.profiles.save(&profile));

        fx.orchestrator.launch(&profile.id, identity());
        started
            .recv_timeout(Duration::from_secs(5))
            .expect("fase base iniciada");
        assert!(fx.orchestrator.is_launching());

        fx.orchestrator.launch(&profile.id, identity());
        release.send(()).expect("liberar la fase");
        let signals = wait_for_finish(&mut fx.receiver);

        let starts = signals
            .iter()
            .filter(|signal| matches!(signal, LaunchSignal::Started { .. }))
            .count();
        assert_eq!(starts, 1);
        assert!(fx.receiver.try_recv().is_err());
    }

    #[test]
    fn cancel_between_phases_skips_the_loader_and_the_spawn() {
        let (installer, release, started) = FakeInstaller::gated();
        let mut fx = fixture(installer);
        let profile = profile_with(Some(LoaderKind::Forge), Some("47.2.0"));
        assert!(fx.profiles.save(&profile));

        fx.orchestrator.launch(&profile.id, identity());
        started
            .recv_timeout(Duration::from_secs(5))
            .expect("fase base iniciada");
        fx.orchestrator.cancel();
        // Cancelar dos veces no cambia nada
        fx.orchestrator.cancel();
        release.send(()).expect("liberar la fase");

        let signals = wait_for_finish(&mut fx.receiver);
        assert!(matches!(
            signals.last(),
            Some(LaunchSignal::Finished { success: false, .. })
        ));

        let state = fx.installer.state.lock().expect("estado");
        assert!(state.forge_installs.is_empty());
        assert!(state.launches.is_empty());
    }
}
