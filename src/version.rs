//! Installable builds: release versions and rolling channels.

use crate::config::LauncherConfig;
use crate::paths::LauncherPaths;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How a version's package is laid out and whether it is pinned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionKind {
    /// Tagged release shipping a pre-flattened `launcher-package.zip`
    Release,
    /// Legacy indev tag; package is the source zipball, wrapped in one directory
    Indev,
    /// Branch snapshot; wrapped in one directory and mutable upstream
    Channel,
}

/// One selectable installable build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: String,
    pub display_name: String,
    pub package_url: String,
    pub kind: VersionKind,
}

impl Version {
    pub fn install_path(&self, paths: &LauncherPaths) -> PathBuf {
        paths.version_dir(&self.id)
    }

    /// Installed means the canonical directory exists
    pub fn is_installed(&self, paths: &LauncherPaths) -> bool {
        self.install_path(paths).exists()
    }

    pub fn is_channel(&self) -> bool {
        self.kind == VersionKind::Channel
    }

    /// Whether the package archive wraps its contents in one extra top-level directory.
    /// Such builds are also launched through the Gradle wrapper instead of a packaged classpath.
    pub fn is_source_build(&self) -> bool {
        matches!(self.kind, VersionKind::Indev | VersionKind::Channel)
    }
}

/// A named rolling build source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub name: String,
    pub archive_url: String,
}

impl Channel {
    pub fn to_version(&self) -> Version {
        Version {
            id: self.name.clone(),
            display_name: format!("Channel {}", self.name),
            package_url: self.archive_url.clone(),
            kind: VersionKind::Channel,
        }
    }
}

/// Fields consumed from one release index entry
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseRecord {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    pub zipball_url: String,
}

/// Build the configured channels
pub fn channels(config: &LauncherConfig) -> Vec<Channel> {
    config
        .channels
        .iter()
        .map(|name| Channel {
            name: name.clone(),
            archive_url: config.channel_url(name),
        })
        .collect()
}

/// Classify a release record into a [`Version`]
pub fn classify(record: &ReleaseRecord, config: &LauncherConfig) -> Version {
    let display_name = record
        .name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(&record.tag_name)
        .to_string();

    if config.is_indev_tag(&record.tag_name) {
        Version {
            id: record.tag_name.clone(),
            display_name,
            package_url: record.zipball_url.clone(),
            kind: VersionKind::Indev,
        }
    } else {
        Version {
            id: record.tag_name.clone(),
            display_name,
            package_url: config.package_url(&record.tag_name),
            kind: VersionKind::Release,
        }
    }
}

/// Classify raw index entries, in order. Entries missing required fields are skipped.
pub fn classify_all(raw: &[serde_json::Value], config: &LauncherConfig) -> Vec<Version> {
    raw.iter()
        .filter_map(|value| match ReleaseRecord::deserialize(value) {
            Ok(record) => Some(classify(&record, config)),
            Err(e) => {
                tracing::warn!("Skipping malformed release record: {}", e);
                None
            }
        })
        .collect()
}

/// Closest known id to a mistyped one, if any is reasonably close
pub fn suggest<'a>(id: &str, versions: &'a [Version]) -> Option<&'a str> {
    versions
        .iter()
        .map(|v| (v.id.as_str(), strsim::jaro_winkler(id, &v.id)))
        .filter(|(_, score)| *score >= 0.8)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}
