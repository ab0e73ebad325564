//! Library interface for the Quantum Voxel launcher (qlaunch)
//!
//! Resolves installable game versions, provisions the JDK, downloads and unpacks
//! packages, and supervises the running game. The `qlaunch` binary is a thin CLI
//! over [`launcher::Launcher`].

pub mod api;
pub mod cache;
pub mod config;
pub mod download;
pub mod error;
pub mod extract;
pub mod launcher;
pub mod logging;
pub mod paths;
pub mod platform;
pub mod progress;
pub mod relocate;
pub mod resolver;
pub mod runtime;
pub mod supervisor;
pub mod version;

// Re-export commonly used types
pub use error::{LauncherError, Result};
pub use launcher::{ActionState, ChainState, Launcher};
pub use version::{Version, VersionKind};
