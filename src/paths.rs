//! Application data root and the canonical directory layout beneath it.
//!
//! ```text
//! <root>/
//!   versions/<id>/     installed packages, presence = installed
//!   temp/              download and extraction staging, always disposable
//!   jdk/               provisioned runtime
//!   log.txt
//!   releases.json
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "QuantumLauncher";

/// Detect the per-OS application data root, honouring `QLAUNCH_HOME`
pub fn detect_root() -> PathBuf {
    root_from(std::env::var_os("QLAUNCH_HOME"), dirs::data_dir())
}

fn root_from(override_root: Option<OsString>, data_dir: Option<PathBuf>) -> PathBuf {
    if let Some(root) = override_root {
        return PathBuf::from(root);
    }
    data_dir
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(APP_DIR_NAME))
}

/// Resolved layout under one data root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherPaths {
    root: PathBuf,
}

impl LauncherPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn detect() -> Self {
        Self::new(detect_root())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join("temp")
    }

    pub fn runtime_dir(&self) -> PathBuf {
        self.root.join("jdk")
    }

    pub fn log_file(&self) -> PathBuf {
        self.root.join("log.txt")
    }

    pub fn releases_file(&self) -> PathBuf {
        self.root.join("releases.json")
    }

    /// Canonical install path for a version id
    pub fn version_dir(&self, id: &str) -> PathBuf {
        self.versions_dir().join(id)
    }

    /// Staging directory a version's package is extracted into
    pub fn staging_dir(&self, id: &str) -> PathBuf {
        self.temp_dir().join(format!("{}-extract", id))
    }

    /// Create the root, `versions/` and `temp/`
    pub fn ensure_layout(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.versions_dir())?;
        std::fs::create_dir_all(self.temp_dir())?;
        Ok(())
    }
}
