//! The launcher context: one instance per process, owning every pipeline component.
//!
//! A provisioning chain runs strictly in order:
//!
//! ```text
//! Idle -> Downloading -> Extracting -> Moving -> Launching -> Running -> Stopped
//!              \______________\____________\__________\-----> Failed
//! ```
//!
//! Progress and outcome are reported only through the primary action's label and
//! enabled flag, mirrored to an optional [`StatusListener`].

use crate::api::ReleaseSource;
use crate::config::LauncherConfig;
use crate::download::{DownloadRequest, Downloader};
use crate::error::{LauncherError, Result};
use crate::extract;
use crate::paths::LauncherPaths;
use crate::platform::PlatformProfile;
use crate::relocate;
use crate::resolver::ReleaseResolver;
use crate::runtime::RuntimeProvisioner;
use crate::supervisor::{self, PollHandle, ProcessSupervisor};
use crate::version::Version;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Where the current provisioning chain stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainState {
    Idle,
    ProvisioningRuntime,
    Downloading,
    Extracting,
    Moving,
    Launching,
    Running,
    Stopped,
    Failed(String),
}

/// Label and enabled flag of the primary action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionState {
    pub text: String,
    pub enabled: bool,
}

/// What a download progress update belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Runtime,
    Game,
}

/// Receives presentation updates; called from background tasks
pub trait StatusListener: Send + Sync {
    fn action_changed(&self, action: &ActionState);

    fn progress(&self, _stage: Stage, _fraction: f32) {}
}

/// One entry of the version list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionEntry {
    pub version: Version,
    pub selected: bool,
    pub installed: bool,
}

struct StatusInner {
    action: ActionState,
    chain: ChainState,
}

/// Shared presentation state, cloned into download callbacks and the poll loop
#[derive(Clone)]
pub struct LauncherStatus {
    inner: Arc<Mutex<StatusInner>>,
    listener: Option<Arc<dyn StatusListener>>,
}

impl LauncherStatus {
    fn new(listener: Option<Arc<dyn StatusListener>>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StatusInner {
                action: ActionState {
                    text: "Play".to_string(),
                    enabled: true,
                },
                chain: ChainState::Idle,
            })),
            listener,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StatusInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn action(&self) -> ActionState {
        self.lock().action.clone()
    }

    pub fn chain(&self) -> ChainState {
        self.lock().chain.clone()
    }

    fn set_action(&self, text: impl Into<String>, enabled: bool) {
        let action = ActionState {
            text: text.into(),
            enabled,
        };
        self.lock().action = action.clone();
        if let Some(listener) = &self.listener {
            listener.action_changed(&action);
        }
    }

    fn set_chain(&self, chain: ChainState) {
        tracing::debug!("Chain state: {:?}", chain);
        self.lock().chain = chain;
    }

    fn progress(&self, stage: Stage, fraction: f32) {
        let label = match stage {
            Stage::Runtime => "Downloading JDK",
            Stage::Game => "Downloading Game",
        };
        self.set_action(format!("{} ({}%)", label, percent(fraction)), false);
        if let Some(listener) = &self.listener {
            listener.progress(stage, fraction);
        }
    }

    fn fail(&self, label: String) -> ChainState {
        tracing::error!("{}", label);
        self.set_action(label.clone(), false);
        let state = ChainState::Failed(label);
        self.set_chain(state.clone());
        state
    }

    fn ready(&self) {
        self.set_action("Play", true);
    }
}

fn percent(fraction: f32) -> u32 {
    (fraction.clamp(0.0, 1.0) * 100.0) as u32
}

pub struct Launcher<S> {
    paths: LauncherPaths,
    config: LauncherConfig,
    profile: PlatformProfile,
    resolver: ReleaseResolver<S>,
    downloader: Downloader,
    runtime: RuntimeProvisioner,
    supervisor: ProcessSupervisor,
    status: LauncherStatus,
    entries: Vec<VersionEntry>,
    poll: Option<PollHandle>,
}

impl<S: ReleaseSource> Launcher<S> {
    /// Build the context and create the directory layout
    pub fn new(
        paths: LauncherPaths,
        config: LauncherConfig,
        profile: PlatformProfile,
        source: S,
    ) -> Result<Self> {
        paths.ensure_layout()?;

        let downloader = Downloader::new(&config, paths.temp_dir())?;
        let runtime = RuntimeProvisioner::new(paths.clone(), profile.clone(), downloader.clone())
            .with_settle(config.visibility_attempts, config.visibility_delay);
        let resolver = ReleaseResolver::new(source, config.clone(), paths.releases_file());

        Ok(Self {
            paths,
            config,
            profile,
            resolver,
            downloader,
            runtime,
            supervisor: ProcessSupervisor::new(),
            status: LauncherStatus::new(None),
            entries: Vec::new(),
            poll: None,
        })
    }

    /// Attach a presentation listener
    pub fn with_listener(mut self, listener: Arc<dyn StatusListener>) -> Self {
        self.status = LauncherStatus::new(Some(listener));
        self
    }

    pub fn status(&self) -> &LauncherStatus {
        &self.status
    }

    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    pub fn entries(&self) -> &[VersionEntry] {
        &self.entries
    }

    pub fn selected(&self) -> Option<&Version> {
        self.entries
            .iter()
            .find(|e| e.selected)
            .map(|e| &e.version)
    }

    /// Reload the version list, keeping the selection when it still exists
    pub async fn refresh_versions(&mut self) -> &[VersionEntry] {
        let previous = self.selected().map(|v| v.id.clone());
        let versions = self.resolver.available_versions().await;

        self.entries = versions
            .into_iter()
            .map(|version| VersionEntry {
                installed: version.is_installed(&self.paths),
                selected: false,
                version,
            })
            .collect();

        let index = previous
            .and_then(|id| self.entries.iter().position(|e| e.version.id == id))
            .unwrap_or(0);
        if let Some(entry) = self.entries.get_mut(index) {
            entry.selected = true;
        }

        &self.entries
    }

    /// Select a version by id
    pub fn select(&mut self, id: &str) -> Result<&Version> {
        let index = self
            .entries
            .iter()
            .position(|e| e.version.id == id)
            .ok_or_else(|| LauncherError::UnknownVersion(id.to_string()))?;

        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.selected = i == index;
        }
        Ok(&self.entries[index].version)
    }

    /// Provision the runtime if it is missing, reporting `Downloading JDK (N%)`
    pub async fn ensure_runtime(&self) -> Result<PathBuf> {
        if self.runtime.is_ready() {
            return Ok(self.runtime.java_home());
        }

        self.status.set_chain(ChainState::ProvisioningRuntime);
        self.status.progress(Stage::Runtime, 0.0);
        let status = self.status.clone();
        match self
            .runtime
            .ensure_runtime(move |f| status.progress(Stage::Runtime, f))
            .await
        {
            Ok(home) => {
                self.status.set_chain(ChainState::Idle);
                self.status.ready();
                Ok(home)
            }
            Err(e) => {
                let label = match &e {
                    LauncherError::Download(_) | LauncherError::Http(_) => "Failed to download JDK",
                    _ => "Failed to unpack JDK",
                };
                self.status.fail(label.to_string());
                Err(e)
            }
        }
    }

    /// The primary action: stop the running game, or install and launch the selection
    pub async fn primary_action(&mut self) -> Result<ChainState> {
        if self.supervisor.is_alive() {
            return Ok(self.stop());
        }

        let version = self
            .selected()
            .cloned()
            .ok_or_else(|| LauncherError::UnknownVersion("<none selected>".to_string()))?;

        self.ensure_runtime().await?;

        let install_path = version.install_path(&self.paths);
        if version.is_channel() && install_path.exists() {
            tracing::info!("Removing previous {} snapshot", version.id);
            relocate::remove_tree(&install_path)?;
        }

        if !install_path.exists()
            && let Some(failed) = self.install(&version).await
        {
            return Ok(failed);
        }

        self.refresh_installed();
        Ok(self.launch(&version))
    }

    /// Kill the launched game, whether or not it already exited, and reset the action.
    /// Never installs or relaunches.
    pub fn stop(&mut self) -> ChainState {
        self.supervisor.kill_tree();
        self.status.set_chain(ChainState::Stopped);
        self.status.ready();
        ChainState::Stopped
    }

    /// Download, extract and move one version into place. Returns the failure state, if any.
    async fn install(&self, version: &Version) -> Option<ChainState> {
        let id = version.id.clone();
        self.status.set_chain(ChainState::Downloading);
        self.status.progress(Stage::Game, 0.0);

        let progress_status = self.status.clone();
        let failure_status = self.status.clone();
        let failure_id = id.clone();
        let request = DownloadRequest::new(&version.package_url, format!("{}.zip", id))
            .on_progress(move |f| progress_status.progress(Stage::Game, f))
            .on_failure(move |e| {
                tracing::error!("Download of {} failed: {}", failure_id, e);
                failure_status.set_action(format!("Failed to download {}", failure_id), false);
            });

        let archive = match self.downloader.download(request).await {
            Ok(Ok(path)) => path,
            Ok(Err(_)) => return Some(self.status.fail(format!("Failed to download {}", id))),
            Err(e) => {
                tracing::error!("Download task for {} ended abnormally: {}", id, e);
                return Some(self.status.fail(format!("Failed to download {}", id)));
            }
        };

        self.status.set_chain(ChainState::Extracting);
        self.status.set_action("Unpacking Game", false);
        let staging = self.paths.staging_dir(&id);
        let unpacked = {
            let staging = staging.clone();
            tokio::task::spawn_blocking(move || {
                relocate::remove_tree(&staging).ok();
                extract::extract_zip(&archive, &staging, "")
            })
            .await
        };
        match unpacked {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!("{}", e);
                return Some(self.status.fail(format!("Failed to unpack {}", id)));
            }
            Err(e) => {
                tracing::error!("Extraction task for {} ended abnormally: {}", id, e);
                return Some(self.status.fail(format!("Failed to unpack {}", id)));
            }
        }

        self.status.set_chain(ChainState::Moving);
        let source = if version.is_source_build() {
            match relocate::single_child_dir(&staging) {
                Ok(Some(dir)) => dir,
                Ok(None) => {
                    tracing::error!("{} does not contain exactly one directory", staging.display());
                    return Some(self.status.fail(format!("Failed to move {}", id)));
                }
                Err(e) => {
                    tracing::error!("Failed to read {}: {}", staging.display(), e);
                    return Some(self.status.fail(format!("Failed to move {}", id)));
                }
            }
        } else {
            staging
        };

        if let Err(e) = relocate::move_tree(&source, &version.install_path(&self.paths)) {
            tracing::error!("{}", e);
            return Some(self.status.fail(format!("Failed to move {}", id)));
        }

        if let Err(e) = relocate::remove_tree(&self.paths.temp_dir()) {
            tracing::warn!("Failed to clean {}: {}", self.paths.temp_dir().display(), e);
        }

        None
    }

    fn launch(&mut self, version: &Version) -> ChainState {
        self.status.set_chain(ChainState::Launching);
        self.status
            .set_action(format!("Launching {}", version.display_name), false);

        let spec = supervisor::launch_spec(&self.profile, &self.paths, version);
        if let Err(e) = self.supervisor.launch(&spec) {
            tracing::error!("{}", e);
            return self.status.fail(format!("Failed to launch {}", version.id));
        }

        // Mark running before the poll can observe a quick exit
        self.status.set_chain(ChainState::Running);
        self.status.set_action("Click to Stop", true);
        self.start_poll();
        ChainState::Running
    }

    /// Start the liveness poll unless it is already running
    pub fn start_poll(&mut self) {
        if self.poll.as_ref().is_some_and(|p| !p.is_finished()) {
            return;
        }

        let status = self.status.clone();
        self.poll = Some(self.supervisor.spawn_poll_loop(
            self.config.poll_interval,
            move |_| {
                status.set_chain(ChainState::Stopped);
                status.ready();
            },
        ));
    }

    /// Wait until the tracked game is gone
    pub async fn wait_for_exit(&self) {
        while self.supervisor.pid().is_some() {
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    fn refresh_installed(&mut self) {
        for entry in &mut self.entries {
            entry.installed = entry.version.is_installed(&self.paths);
        }
    }

    /// Shutdown: kill a running game and stop the poll loop
    pub async fn handle_close(&mut self) {
        if self.supervisor.is_alive() {
            self.supervisor.kill_tree();
        }
        if let Some(poll) = self.poll.take() {
            poll.cancel().await;
        }
        tracing::info!("Launcher closed");
    }
}
