//! Command implementations for the qlaunch CLI
//!
//! - **query**: version listing and layout information
//! - **play**: runtime provisioning, install and launch
//! - **maintenance**: staging cleanup

pub mod maintenance;
pub mod play;
pub mod query;

pub use maintenance::clean;
pub use play::{play, runtime};
pub use query::{paths, versions};

use quantum_launcher::api::ReleaseApi;
use quantum_launcher::config::LauncherConfig;
use quantum_launcher::launcher::Launcher;
use quantum_launcher::paths::LauncherPaths;
use quantum_launcher::platform::PlatformProfile;
use quantum_launcher::progress::TerminalReporter;
use std::sync::Arc;

/// Launcher wired to the live release index and the terminal
pub(crate) fn build_launcher(
    paths: LauncherPaths,
    config: LauncherConfig,
) -> anyhow::Result<Launcher<ReleaseApi>> {
    let profile = PlatformProfile::detect(&config.runtime_version)?;
    let api = ReleaseApi::new(&config)?;
    let launcher = Launcher::new(paths, config, profile, api)?
        .with_listener(Arc::new(TerminalReporter::new()));
    Ok(launcher)
}
