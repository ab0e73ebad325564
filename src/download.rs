//! Package and runtime downloads with progress tracking.
//!
//! A download is a single attempt: no retries and no resume. The response body is
//! streamed to `<staging>/<name>` in fixed-size chunks and the progress callback runs
//! after every chunk with `downloaded / total`. When neither the server nor the caller
//! knows the size, progress stays at `0.0` until completion.
//!
//! [`Downloader::download`] runs on a background task and reports through callbacks;
//! [`Downloader::fetch`] is the awaitable core it wraps.

use crate::config::LauncherConfig;
use crate::error::DownloadError;
use futures::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;

pub type ProgressFn = Arc<dyn Fn(f32) + Send + Sync>;
pub type CompleteFn = Box<dyn FnOnce(PathBuf) + Send>;
pub type FailureFn = Box<dyn FnOnce(&DownloadError) + Send>;

/// Fraction downloaded; `0.0` whenever the total is unknown
pub fn progress_fraction(downloaded: u64, total: u64) -> f32 {
    if total == 0 {
        0.0
    } else {
        (downloaded as f64 / total as f64) as f32
    }
}

/// One download and its callbacks
pub struct DownloadRequest {
    pub url: String,
    pub dest_name: String,
    /// Used when the server sends no `Content-Length`; 0 means unknown
    pub size_hint: u64,
    on_progress: Option<ProgressFn>,
    on_complete: Option<CompleteFn>,
    on_failure: Option<FailureFn>,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, dest_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            dest_name: dest_name.into(),
            size_hint: 0,
            on_progress: None,
            on_complete: None,
            on_failure: None,
        }
    }

    pub fn size_hint(mut self, bytes: u64) -> Self {
        self.size_hint = bytes;
        self
    }

    pub fn on_progress(mut self, f: impl Fn(f32) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl FnOnce(PathBuf) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    pub fn on_failure(mut self, f: impl FnOnce(&DownloadError) + Send + 'static) -> Self {
        self.on_failure = Some(Box::new(f));
        self
    }
}

#[derive(Clone)]
pub struct Downloader {
    client: reqwest::Client,
    staging_dir: PathBuf,
    chunk_size: usize,
    visibility_attempts: u32,
    visibility_delay: Duration,
}

impl Downloader {
    pub fn new(config: &LauncherConfig, staging_dir: impl Into<PathBuf>) -> crate::error::Result<Self> {
        // No overall timeout; runtime archives are large
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            staging_dir: staging_dir.into(),
            chunk_size: config.chunk_size.max(1),
            visibility_attempts: config.visibility_attempts,
            visibility_delay: config.visibility_delay,
        })
    }

    /// Start a download on a background task.
    ///
    /// Exactly one of `on_complete` / `on_failure` fires. The returned handle yields the
    /// same outcome for callers that prefer to await it.
    pub fn download(&self, request: DownloadRequest) -> JoinHandle<Result<PathBuf, DownloadError>> {
        let downloader = self.clone();

        tokio::spawn(async move {
            let DownloadRequest {
                url,
                dest_name,
                size_hint,
                on_progress,
                on_complete,
                on_failure,
            } = request;

            let progress = move |fraction: f32| {
                if let Some(cb) = &on_progress {
                    cb(fraction);
                }
            };

            match downloader.fetch(&url, &dest_name, size_hint, progress).await {
                Ok(path) => {
                    if let Some(cb) = on_complete {
                        cb(path.clone());
                    }
                    Ok(path)
                }
                Err(e) => {
                    tracing::error!("Download of {} failed: {}", url, e);
                    if let Some(cb) = on_failure {
                        cb(&e);
                    }
                    Err(e)
                }
            }
        })
    }

    /// Download `url` to `<staging>/<dest_name>` and return the path once it is visible
    pub async fn fetch(
        &self,
        url: &str,
        dest_name: &str,
        size_hint: u64,
        on_progress: impl Fn(f32),
    ) -> Result<PathBuf, DownloadError> {
        tracing::info!("Downloading {} -> {}", url, dest_name);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| DownloadError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length().unwrap_or(size_hint);

        fs::create_dir_all(&self.staging_dir)
            .await
            .map_err(|source| DownloadError::Io {
                path: self.staging_dir.clone(),
                source,
            })?;

        let output_path = self.staging_dir.join(dest_name);
        let io_err = |source| DownloadError::Io {
            path: output_path.clone(),
            source,
        };

        let mut file = fs::File::create(&output_path).await.map_err(io_err)?;
        let written = write_chunked(
            Box::pin(response.bytes_stream()),
            &mut file,
            total,
            self.chunk_size,
            &on_progress,
        )
        .await;
        // Close on every path before inspecting the result
        let closed = file.shutdown().await;
        drop(file);
        let written = written.map_err(io_err)?;
        closed.map_err(io_err)?;

        if !wait_until_visible(&output_path, self.visibility_attempts, self.visibility_delay).await
        {
            return Err(DownloadError::NotVisible(output_path));
        }

        tracing::info!("Downloaded {} ({} bytes)", output_path.display(), written);
        Ok(output_path)
    }
}

/// Copy a byte stream into `writer` in `chunk_size` pieces, reporting progress after each.
///
/// Network reads are re-chunked so the callback cadence depends only on `chunk_size`,
/// not on how the transport happens to split the body. Returns the byte count written.
pub async fn write_chunked<S, B, E, W>(
    mut stream: S,
    writer: &mut W,
    total: u64,
    chunk_size: usize,
    on_progress: &impl Fn(f32),
) -> std::io::Result<u64>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
    W: AsyncWrite + Unpin,
{
    let chunk_size = chunk_size.max(1);
    let mut pending: Vec<u8> = Vec::with_capacity(chunk_size * 2);
    let mut downloaded: u64 = 0;

    while let Some(item) = stream.next().await {
        let bytes = item.map_err(std::io::Error::other)?;
        pending.extend_from_slice(bytes.as_ref());

        let mut offset = 0;
        while pending.len() - offset >= chunk_size {
            writer.write_all(&pending[offset..offset + chunk_size]).await?;
            offset += chunk_size;
            downloaded += chunk_size as u64;
            on_progress(progress_fraction(downloaded, total));
        }
        pending.drain(..offset);
    }

    if !pending.is_empty() {
        writer.write_all(&pending).await?;
        downloaded += pending.len() as u64;
        on_progress(progress_fraction(downloaded, total));
    }

    writer.flush().await?;
    Ok(downloaded)
}

/// Poll until `path` exists; some filesystems lag behind a close
pub async fn wait_until_visible(path: &Path, attempts: u32, delay: Duration) -> bool {
    for attempt in 0..attempts.max(1) {
        if fs::try_exists(path).await.unwrap_or(false) {
            return true;
        }
        tracing::debug!("Waiting for {} to appear (attempt {})", path.display(), attempt + 1);
        tokio::time::sleep(delay).await;
    }
    false
}
