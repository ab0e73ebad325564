//! Launching the game and keeping track of it.
//!
//! At most one game process is tracked at a time. A background poll loop notices
//! when it exits on its own and clears the handle; [`ProcessSupervisor::kill_tree`]
//! tears down the process together with everything it spawned (the Gradle wrapper
//! forks a daemon-less JVM, so killing only the direct child would orphan the game).

use crate::error::{LauncherError, Result};
use crate::paths::LauncherPaths;
use crate::platform::PlatformProfile;
use crate::version::Version;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const GRADLE_TASK: &str = "lwjgl3:run";
pub const MAIN_CLASS: &str = "dev.ultreon.quantum.lwjgl3.Lwjgl3Launcher";

/// Everything needed to spawn the game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub env: Vec<(String, OsString)>,
    pub cwd: PathBuf,
}

impl LaunchSpec {
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .current_dir(&self.cwd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        cmd
    }
}

/// Build the launch command for an installed version.
///
/// Source builds (channels and indev tags) go through the Gradle wrapper; packaged
/// releases run the provisioned JVM directly against `lib/*`.
pub fn launch_spec(profile: &PlatformProfile, paths: &LauncherPaths, version: &Version) -> LaunchSpec {
    let runtime_dir = paths.runtime_dir();
    let java_home = profile.java_home(&runtime_dir);
    let cwd = version.install_path(paths);

    let env = vec![
        ("JAVA_HOME".to_string(), java_home.clone().into_os_string()),
        (
            "PATH".to_string(),
            profile.path_with_runtime(&runtime_dir, std::env::var_os("PATH")),
        ),
    ];

    let (program, args): (OsString, Vec<OsString>) = if version.is_source_build() {
        if profile.is_windows() {
            (
                "cmd".into(),
                vec![
                    "/c".into(),
                    "gradlew.bat".into(),
                    "--no-daemon".into(),
                    GRADLE_TASK.into(),
                ],
            )
        } else {
            (
                "bash".into(),
                vec![
                    "-c".into(),
                    format!("chmod +x gradlew && ./gradlew --no-daemon {}", GRADLE_TASK).into(),
                ],
            )
        }
    } else {
        let mut args: Vec<OsString> = profile.extra_jvm_flags.iter().map(OsString::from).collect();
        args.push("-cp".into());
        args.push("lib/*".into());
        args.push(MAIN_CLASS.into());
        (profile.java_executable(&runtime_dir).into_os_string(), args)
    };

    LaunchSpec {
        program,
        args,
        env,
        cwd,
    }
}

/// Tracks the single running game process
#[derive(Clone, Default)]
pub struct ProcessSupervisor {
    current: Arc<Mutex<Option<Child>>>,
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Child>> {
        // A panic while holding the lock cannot leave the Option half-written
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Spawn the game; refuses while another tracked process is still alive
    pub fn launch(&self, spec: &LaunchSpec) -> Result<u32> {
        let mut slot = self.slot();
        if let Some(child) = slot.as_mut()
            && matches!(child.try_wait(), Ok(None))
        {
            return Err(anyhow::anyhow!("Game is already running (pid {})", child.id()).into());
        }

        tracing::info!(
            "Launching {} {:?} in {}",
            spec.program.to_string_lossy(),
            spec.args,
            spec.cwd.display()
        );
        let child = spec.command().spawn().map_err(|e| {
            LauncherError::Other(anyhow::anyhow!(
                "Failed to start {}: {}",
                spec.program.to_string_lossy(),
                e
            ))
        })?;
        let pid = child.id();
        *slot = Some(child);
        Ok(pid)
    }

    pub fn pid(&self) -> Option<u32> {
        self.slot().as_ref().map(Child::id)
    }

    pub fn is_alive(&self) -> bool {
        match self.slot().as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Clear the handle if the tracked process has exited, returning its status
    pub fn reap(&self) -> Option<ExitStatus> {
        let mut slot = self.slot();
        let status = match slot.as_mut()?.try_wait() {
            Ok(Some(status)) => status,
            Ok(None) => return None,
            Err(e) => {
                tracing::error!("Failed to query game process: {}", e);
                return None;
            }
        };
        *slot = None;
        Some(status)
    }

    /// Force-kill the tracked process and its descendants, then wait for it.
    ///
    /// Best effort: failures are logged and the handle is cleared regardless.
    pub fn kill_tree(&self) {
        let Some(mut child) = self.slot().take() else {
            return;
        };
        let pid = child.id();
        tracing::info!("Killing game process tree (pid {})", pid);

        kill_descendants(pid);
        if let Err(e) = child.kill() {
            tracing::debug!("Kill of pid {} failed: {}", pid, e);
        }
        match child.wait() {
            Ok(status) => tracing::info!("Game process {} exited: {}", pid, status),
            Err(e) => tracing::error!("Failed to wait for pid {}: {}", pid, e),
        }
    }

    /// Start the liveness poll. `on_exit` runs once per process that exits on its own.
    pub fn spawn_poll_loop(
        &self,
        interval: Duration,
        on_exit: impl Fn(ExitStatus) + Send + 'static,
    ) -> PollHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let supervisor = self.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Some(status) = supervisor.reap() {
                            tracing::info!("Game exited: {}", status);
                            on_exit(status);
                        }
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("Process poll loop stopped");
        });

        PollHandle {
            stop: stop_tx,
            task,
        }
    }
}

/// Handle to a running poll loop
pub struct PollHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Signal the loop to stop and wait for it
    pub async fn cancel(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            tracing::error!("Process poll loop ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(windows)]
fn kill_descendants(pid: u32) {
    // /T takes the whole tree; the direct child is killed again afterwards
    match Command::new("taskkill")
        .args(["/F", "/T", "/PID", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(status) if !status.success() => {
            tracing::debug!("taskkill for pid {} exited with {}", pid, status)
        }
        Ok(_) => {}
        Err(e) => tracing::error!("Failed to run taskkill: {}", e),
    }
}

#[cfg(not(windows))]
fn kill_descendants(pid: u32) {
    // Collect before killing anything; orphans are re-parented and become unreachable
    let descendants = descendant_pids(pid);
    if descendants.is_empty() {
        return;
    }
    tracing::debug!("Killing {} descendants of pid {}", descendants.len(), pid);

    let mut cmd = Command::new("kill");
    cmd.arg("-9");
    for child in &descendants {
        cmd.arg(child.to_string());
    }
    if let Err(e) = cmd.stdout(Stdio::null()).stderr(Stdio::null()).status() {
        tracing::error!("Failed to run kill: {}", e);
    }
}

/// All transitive children of `pid`, parents before children
#[cfg(not(windows))]
fn descendant_pids(pid: u32) -> Vec<u32> {
    let mut found = Vec::new();
    let mut queue = vec![pid];

    while let Some(parent) = queue.pop() {
        let output = match Command::new("pgrep")
            .arg("-P")
            .arg(parent.to_string())
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                tracing::error!("Failed to run pgrep: {}", e);
                break;
            }
        };

        for child in String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(|line| line.trim().parse::<u32>().ok())
        {
            if !found.contains(&child) {
                found.push(child);
                queue.push(child);
            }
        }
    }

    found
}
