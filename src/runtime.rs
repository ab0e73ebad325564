//! JDK provisioning.
//!
//! The game needs a specific Temurin JDK. On first start it is downloaded into
//! `temp/`, extracted into the runtime directory, and on Unix every file directly
//! inside its `bin/` directory is made executable (archive extraction does not
//! carry execute bits over).

use crate::download::{Downloader, wait_until_visible};
use crate::error::{LauncherError, Result};
use crate::extract;
use crate::paths::LauncherPaths;
use crate::platform::PlatformProfile;
use crate::relocate;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct RuntimeProvisioner {
    paths: LauncherPaths,
    profile: PlatformProfile,
    downloader: Downloader,
    settle_attempts: u32,
    settle_delay: Duration,
}

impl RuntimeProvisioner {
    pub fn new(paths: LauncherPaths, profile: PlatformProfile, downloader: Downloader) -> Self {
        Self {
            paths,
            profile,
            downloader,
            settle_attempts: 50,
            settle_delay: Duration::from_millis(100),
        }
    }

    /// Override how long to wait for the extracted `bin/` directory to appear
    pub fn with_settle(mut self, attempts: u32, delay: Duration) -> Self {
        self.settle_attempts = attempts;
        self.settle_delay = delay;
        self
    }

    pub fn java_home(&self) -> PathBuf {
        self.profile.java_home(&self.paths.runtime_dir())
    }

    pub fn is_ready(&self) -> bool {
        self.java_home().is_dir()
    }

    /// Download and unpack the runtime unless it is already installed.
    ///
    /// Returns the runtime home. A failed extraction removes the runtime directory
    /// again so a half-written tree is never mistaken for an install.
    pub async fn ensure_runtime(&self, on_progress: impl Fn(f32)) -> Result<PathBuf> {
        let java_home = self.java_home();
        if java_home.is_dir() {
            tracing::debug!("Runtime already present at {}", java_home.display());
            return Ok(java_home);
        }

        tracing::info!("Provisioning runtime from {}", self.profile.runtime_url);
        let archive = self
            .downloader
            .fetch(
                &self.profile.runtime_url,
                &self.profile.runtime_archive_name(),
                0,
                on_progress,
            )
            .await?;

        let runtime_dir = self.paths.runtime_dir();
        let format = self.profile.runtime_format;
        let target = runtime_dir.clone();
        let extracted = tokio::task::spawn_blocking(move || {
            extract::extract_archive(&archive, &target, format)?;
            fs::remove_file(&archive).ok();
            Ok::<_, LauncherError>(())
        })
        .await
        .map_err(|e| anyhow::anyhow!("Runtime extraction task failed: {}", e))?;

        if let Err(e) = extracted {
            relocate::remove_tree(&runtime_dir)?;
            return Err(e);
        }

        let bin_dir = java_home.join("bin");
        if !wait_until_visible(&bin_dir, self.settle_attempts, self.settle_delay).await {
            relocate::remove_tree(&runtime_dir)?;
            return Err(anyhow::anyhow!(
                "Runtime archive did not contain {}",
                self.profile.runtime_home.join("bin").display()
            )
            .into());
        }

        #[cfg(unix)]
        {
            let count = make_executable(&bin_dir)?;
            tracing::debug!("Marked {} runtime binaries executable", count);
        }

        tracing::info!("Runtime ready at {}", java_home.display());
        Ok(java_home)
    }
}

/// Set mode 0755 on every entry directly inside `dir`
#[cfg(unix)]
pub fn make_executable(dir: &Path) -> std::io::Result<usize> {
    use std::os::unix::fs::PermissionsExt;

    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LauncherConfig;

    fn provisioner(root: &Path) -> RuntimeProvisioner {
        let paths = LauncherPaths::new(root);
        let profile = PlatformProfile::for_target("linux", "x86_64", "17.0.2_8").unwrap();
        let downloader = Downloader::new(&LauncherConfig::default(), paths.temp_dir()).unwrap();
        RuntimeProvisioner::new(paths, profile, downloader)
    }

    #[tokio::test]
    async fn test_existing_runtime_skips_download() {
        let temp = tempfile::TempDir::new().unwrap();
        let provisioner = provisioner(temp.path());
        fs::create_dir_all(provisioner.java_home().join("bin")).unwrap();

        assert!(provisioner.is_ready());
        let home = provisioner.ensure_runtime(|_| {}).await.unwrap();
        assert_eq!(home, temp.path().join("jdk").join("jdk-17.0.2+8"));
        assert!(!temp.path().join("temp").exists());
    }

    #[tokio::test]
    async fn test_unreachable_runtime_url_fails() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut provisioner = provisioner(temp.path());
        provisioner.profile.runtime_url = "http://127.0.0.1:9/jdk.tar.gz".to_string();

        let err = provisioner.ensure_runtime(|_| {}).await.unwrap_err();
        assert!(matches!(err, LauncherError::Download(_)));
        assert!(!provisioner.is_ready());
    }

    #[cfg(unix)]
    #[test]
    fn test_make_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::TempDir::new().unwrap();
        let bin = temp.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        for name in ["java", "javac", "jar"] {
            let path = bin.join(name);
            fs::write(&path, b"").unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        }

        assert_eq!(make_executable(&bin).unwrap(), 3);
        let mode = fs::metadata(bin.join("java")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
