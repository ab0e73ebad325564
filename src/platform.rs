//! Platform detection for selecting the runtime distribution and launch flags.
//!
//! All OS-sensitive decisions are made once, in [`PlatformProfile::detect`], and the
//! resulting profile is threaded through the provisioner and the supervisor:
//! - **Runtime archive**: Temurin ships ZIPs for Windows and tar.gz everywhere else
//! - **Runtime layout**: macOS JDKs nest the home under `Contents/Home`
//! - **Executables**: `javaw.exe` on Windows (no console window), `java` elsewhere
//! - **Launch flags**: the game's windowing toolkit needs `-XstartOnFirstThread` on macOS
//!
//! Supported targets are Windows x64, Linux x64, Linux aarch64, macOS x64 and macOS
//! aarch64. Anything else is refused rather than guessed.
//!
//! # Examples
//!
//! ```no_run
//! use quantum_launcher::platform::PlatformProfile;
//!
//! fn main() -> quantum_launcher::error::Result<()> {
//!     let profile = PlatformProfile::detect("17.0.2_8")?;
//!     println!("Runtime: {}", profile.runtime_url);
//!     Ok(())
//! }
//! ```

use crate::error::{LauncherError, Result};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Windows,
    Linux,
    MacOs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X64,
    Aarch64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::TarGz => "tar.gz",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Os::Windows => "windows",
            Os::Linux => "linux",
            Os::MacOs => "mac",
        };
        write!(f, "{}", name)
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Arch::X64 => "x64",
            Arch::Aarch64 => "aarch64",
        };
        write!(f, "{}", name)
    }
}

/// Everything OS- or architecture-specific the pipeline needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    pub os: Os,
    pub arch: Arch,
    pub runtime_format: ArchiveFormat,
    pub runtime_url: String,
    /// Runtime home relative to the runtime install directory
    pub runtime_home: PathBuf,
    pub java_exec: &'static str,
    /// JVM flags placed before the classpath for release builds
    pub extra_jvm_flags: Vec<&'static str>,
}

impl PlatformProfile {
    /// Profile for the host this binary was compiled for
    pub fn detect(runtime_version: &str) -> Result<Self> {
        Self::for_target(std::env::consts::OS, std::env::consts::ARCH, runtime_version)
    }

    /// Profile for an explicit `std::env::consts` OS/arch pair
    pub fn for_target(os: &str, arch: &str, runtime_version: &str) -> Result<Self> {
        let unsupported = || LauncherError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        };

        let os_kind = match os {
            "windows" => Os::Windows,
            "linux" => Os::Linux,
            "macos" => Os::MacOs,
            _ => return Err(unsupported()),
        };
        let arch_kind = match arch {
            "x86_64" => Arch::X64,
            "aarch64" => Arch::Aarch64,
            _ => return Err(unsupported()),
        };
        // Temurin 17.0.2 has no Windows aarch64 build
        if os_kind == Os::Windows && arch_kind == Arch::Aarch64 {
            return Err(unsupported());
        }

        let runtime_format = match os_kind {
            Os::Windows => ArchiveFormat::Zip,
            Os::Linux | Os::MacOs => ArchiveFormat::TarGz,
        };

        let runtime_url = format!(
            "https://github.com/adoptium/temurin17-binaries/releases/download/jdk-{}/OpenJDK17U-jdk_{}_{}_hotspot_{}.{}",
            runtime_version.replace('_', "%2B"),
            arch_kind,
            os_kind,
            runtime_version,
            runtime_format.extension()
        );

        let jdk_dir = PathBuf::from(format!("jdk-{}", runtime_version.replace('_', "+")));
        let runtime_home = match os_kind {
            Os::MacOs => jdk_dir.join("Contents").join("Home"),
            Os::Windows | Os::Linux => jdk_dir,
        };

        let java_exec = match os_kind {
            Os::Windows => "javaw.exe",
            Os::Linux | Os::MacOs => "java",
        };

        let extra_jvm_flags = match os_kind {
            Os::MacOs => vec!["-XstartOnFirstThread"],
            Os::Windows | Os::Linux => Vec::new(),
        };

        Ok(Self {
            os: os_kind,
            arch: arch_kind,
            runtime_format,
            runtime_url,
            runtime_home,
            java_exec,
            extra_jvm_flags,
        })
    }

    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }

    /// File name the runtime archive is downloaded to
    pub fn runtime_archive_name(&self) -> String {
        format!("jdk.{}", self.runtime_format.extension())
    }

    /// Absolute runtime home given the runtime install directory
    pub fn java_home(&self, runtime_dir: &Path) -> PathBuf {
        runtime_dir.join(&self.runtime_home)
    }

    pub fn java_executable(&self, runtime_dir: &Path) -> PathBuf {
        self.java_home(runtime_dir).join("bin").join(self.java_exec)
    }

    /// `PATH` with the runtime's `bin` directory in front
    pub fn path_with_runtime(&self, runtime_dir: &Path, current: Option<OsString>) -> OsString {
        let mut entries = vec![self.java_home(runtime_dir).join("bin")];
        if let Some(current) = current {
            entries.extend(std::env::split_paths(&current));
        }
        // join_paths only fails on entries containing the separator; fall back to the bin dir alone
        std::env::join_paths(&entries)
            .unwrap_or_else(|_| self.java_home(runtime_dir).join("bin").into_os_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_host_profile() {
        let supported = matches!(
            (std::env::consts::OS, std::env::consts::ARCH),
            ("linux", "x86_64")
                | ("linux", "aarch64")
                | ("macos", "x86_64")
                | ("macos", "aarch64")
                | ("windows", "x86_64")
        );
        assert_eq!(PlatformProfile::detect("17.0.2_8").is_ok(), supported);
    }

    #[test]
    fn test_linux_x64_runtime_url() {
        let profile = PlatformProfile::for_target("linux", "x86_64", "17.0.2_8").unwrap();
        assert_eq!(
            profile.runtime_url,
            "https://github.com/adoptium/temurin17-binaries/releases/download/jdk-17.0.2%2B8/OpenJDK17U-jdk_x64_linux_hotspot_17.0.2_8.tar.gz"
        );
        assert_eq!(profile.runtime_format, ArchiveFormat::TarGz);
        assert_eq!(profile.runtime_home, PathBuf::from("jdk-17.0.2+8"));
        assert_eq!(profile.java_exec, "java");
        assert!(profile.extra_jvm_flags.is_empty());
    }

    #[test]
    fn test_linux_aarch64_runtime_url() {
        let profile = PlatformProfile::for_target("linux", "aarch64", "17.0.2_8").unwrap();
        assert!(profile.runtime_url.ends_with("OpenJDK17U-jdk_aarch64_linux_hotspot_17.0.2_8.tar.gz"));
    }

    #[test]
    fn test_windows_profile() {
        let profile = PlatformProfile::for_target("windows", "x86_64", "17.0.2_8").unwrap();
        assert!(profile.runtime_url.ends_with("OpenJDK17U-jdk_x64_windows_hotspot_17.0.2_8.zip"));
        assert_eq!(profile.runtime_format, ArchiveFormat::Zip);
        assert_eq!(profile.java_exec, "javaw.exe");
        assert_eq!(profile.runtime_archive_name(), "jdk.zip");
    }

    #[test]
    fn test_macos_profile() {
        let profile = PlatformProfile::for_target("macos", "aarch64", "17.0.2_8").unwrap();
        assert!(profile.runtime_url.ends_with("OpenJDK17U-jdk_aarch64_mac_hotspot_17.0.2_8.tar.gz"));
        assert_eq!(
            profile.runtime_home,
            PathBuf::from("jdk-17.0.2+8").join("Contents").join("Home")
        );
        assert_eq!(profile.extra_jvm_flags, vec!["-XstartOnFirstThread"]);
    }

    #[test]
    fn test_unsupported_platforms() {
        for (os, arch) in [("freebsd", "x86_64"), ("linux", "riscv64"), ("windows", "aarch64")] {
            let err = PlatformProfile::for_target(os, arch, "17.0.2_8").unwrap_err();
            assert!(matches!(err, LauncherError::UnsupportedPlatform { .. }));
        }
    }

    #[test]
    fn test_path_with_runtime_prepends_bin() {
        let profile = PlatformProfile::for_target("linux", "x86_64", "17.0.2_8").unwrap();
        let runtime = Path::new("/data/jdk");
        let path = profile.path_with_runtime(runtime, Some(OsString::from("/usr/bin")));
        let entries: Vec<PathBuf> = std::env::split_paths(&path).collect();
        assert_eq!(entries[0], runtime.join("jdk-17.0.2+8").join("bin"));
        assert_eq!(entries.last().unwrap(), &PathBuf::from("/usr/bin"));
    }
}
