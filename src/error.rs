use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LauncherError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Unknown version: {0}")]
    UnknownVersion(String),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Move(#[from] MoveError),

    #[error("Error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, LauncherError>;

/// Outcome of an archive extraction that did not succeed.
///
/// A missing archive is reported separately from a failure while reading it,
/// so callers can tell "nothing was downloaded" apart from "the download is corrupt".
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Archive not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to extract {}: {source:#}", path.display())]
    Failed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Error, Debug)]
pub enum MoveError {
    #[error("Source does not exist: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    Io {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Server returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Downloaded file never became visible: {}", .0.display())]
    NotVisible(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_messages() {
        let err = ExtractError::NotFound(PathBuf::from("/tmp/missing.zip"));
        assert_eq!(err.to_string(), "Archive not found: /tmp/missing.zip");

        let err = ExtractError::Failed {
            path: PathBuf::from("a.zip"),
            source: anyhow::anyhow!("bad header"),
        };
        assert!(err.to_string().contains("bad header"));
    }

    #[test]
    fn test_move_error_converts_into_launcher_error() {
        let err: LauncherError = MoveError::DestinationExists(PathBuf::from("versions/1.0")).into();
        assert!(matches!(err, LauncherError::Move(MoveError::DestinationExists(_))));
        assert!(err.to_string().contains("already exists"));
    }
}
