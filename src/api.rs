//! Release index client.
//!
//! The release index is a JSON array of release objects (the GitHub releases API
//! shape). Only `tag_name`, `name` and `zipball_url` are interpreted, but entries are
//! kept verbatim so the cache can store exactly what the server returned.
//!
//! # Examples
//!
//! ```no_run
//! use quantum_launcher::api::{ReleaseApi, ReleaseSource};
//! use quantum_launcher::config::LauncherConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let api = ReleaseApi::new(&LauncherConfig::default())?;
//!     let releases = api.fetch_releases().await?;
//!     println!("{} releases published", releases.len());
//!     Ok(())
//! }
//! ```

use crate::config::LauncherConfig;
use crate::error::Result;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Anything that can produce the raw release index
pub trait ReleaseSource {
    fn fetch_releases(
        &self,
    ) -> impl std::future::Future<Output = anyhow::Result<Vec<serde_json::Value>>> + Send;
}

/// HTTP client for the release index
#[derive(Clone)]
pub struct ReleaseApi {
    client: reqwest::Client,
    url: String,
}

impl ReleaseApi {
    pub fn new(config: &LauncherConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            url: config.releases_url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ReleaseSource for ReleaseApi {
    async fn fetch_releases(&self) -> anyhow::Result<Vec<serde_json::Value>> {
        tracing::info!("Fetching versions from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Release index returned HTTP {} ({})", status.as_u16(), self.url);
        }

        let releases: Vec<serde_json::Value> = response.json().await?;
        tracing::debug!("Release index returned {} entries", releases.len());
        Ok(releases)
    }
}
