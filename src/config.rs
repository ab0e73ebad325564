//! Launcher configuration: remote endpoints, channel list, runtime version and tunables.
//!
//! Defaults describe the Quantum Voxel release setup. A handful of values can be
//! overridden through environment variables so tests and mirrors can point the
//! launcher elsewhere:
//!
//! - `QLAUNCH_HOME` - application data root (see [`crate::paths`])
//! - `QLAUNCH_RELEASES_URL` - release index endpoint
//! - `QLAUNCH_CHANNELS` - comma separated channel names

use std::time::Duration;

pub const RELEASES_URL: &str = "https://api.github.com/repos/QuantumVoxel/game/releases";
pub const REPO_HOST: &str = "github.com";
pub const REPO_ORG: &str = "QuantumVoxel";
pub const REPO_NAME: &str = "game";

/// Release asset the launcher downloads for ordinary releases.
pub const PACKAGE_ASSET: &str = "launcher-package.zip";

/// Early builds published before `launcher-package.zip` existed; they ship as source zipballs.
pub const INDEV_TAGS: &[&str] = &["0.0.0-indev", "0.0.1-indev"];

pub const DEFAULT_CHANNELS: &[&str] = &["edge", "beta", "release"];

/// Temurin build, in `<version>_<build>` form.
pub const RUNTIME_VERSION: &str = "17.0.2_8";

pub const CACHE_FRESHNESS: Duration = Duration::from_secs(600);
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct LauncherConfig {
    pub releases_url: String,
    /// `https` in production; tests point packages at a plain HTTP listener
    pub repo_scheme: String,
    pub repo_host: String,
    pub repo_org: String,
    pub repo_name: String,
    pub channels: Vec<String>,
    pub runtime_version: String,
    pub cache_freshness: Duration,
    pub poll_interval: Duration,
    /// Number of existence checks before a written file is declared missing
    pub visibility_attempts: u32,
    pub visibility_delay: Duration,
    pub chunk_size: usize,
    pub user_agent: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            releases_url: RELEASES_URL.to_string(),
            repo_scheme: "https".to_string(),
            repo_host: REPO_HOST.to_string(),
            repo_org: REPO_ORG.to_string(),
            repo_name: REPO_NAME.to_string(),
            channels: DEFAULT_CHANNELS.iter().map(|c| c.to_string()).collect(),
            runtime_version: RUNTIME_VERSION.to_string(),
            cache_freshness: CACHE_FRESHNESS,
            poll_interval: POLL_INTERVAL,
            visibility_attempts: 50,
            visibility_delay: Duration::from_millis(100),
            chunk_size: 8192,
            user_agent: format!("qlaunch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl LauncherConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("QLAUNCH_RELEASES_URL")
            && !url.trim().is_empty()
        {
            config.releases_url = url.trim().to_string();
        }

        if let Ok(channels) = std::env::var("QLAUNCH_CHANNELS") {
            config.channels = parse_channels(&channels);
        }

        config
    }

    /// URL of the packaged build attached to a release tag
    pub fn package_url(&self, tag: &str) -> String {
        format!(
            "{}://{}/{}/{}/releases/download/{}/{}",
            self.repo_scheme,
            self.repo_host, self.repo_org, self.repo_name, tag, PACKAGE_ASSET
        )
    }

    /// URL of the branch snapshot backing a channel
    pub fn channel_url(&self, channel: &str) -> String {
        format!(
            "{}://{}/{}/{}/archive/refs/heads/channels/{}.zip",
            self.repo_scheme,
            self.repo_host, self.repo_org, self.repo_name, channel
        )
    }

    pub fn is_indev_tag(&self, tag: &str) -> bool {
        INDEV_TAGS.contains(&tag)
    }
}

fn parse_channels(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect()
}
