//! Archive extraction into staging directories.
//!
//! Two formats are handled:
//! - **ZIP**: game packages, channel snapshots, and the Windows runtime
//! - **tar.gz**: the runtime on Linux and macOS
//!
//! Both use the same materialization rule: directory entries become directories,
//! file entries get their parent directories created and are written to a freshly
//! truncated file. ZIP extraction can additionally keep only entries under a path
//! prefix and strip that prefix from the output names.
//!
//! A failure aborts the whole extraction. Already written files are left in place;
//! destinations are always staging paths under `temp/`, so a failed extraction only
//! leaves a disposable tree behind.
//!
//! # Examples
//!
//! ```no_run
//! use quantum_launcher::extract;
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     extract::extract_zip(
//!         Path::new("temp/edge.zip"),
//!         Path::new("temp/edge-extract"),
//!         "",
//!     )?;
//!     Ok(())
//! }
//! ```

use crate::error::ExtractError;
use crate::platform::ArchiveFormat;
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};

/// Extract a ZIP archive, keeping only entries under `strip_prefix` (all entries when empty)
pub fn extract_zip(
    archive_path: &Path,
    dest_dir: &Path,
    strip_prefix: &str,
) -> std::result::Result<(), ExtractError> {
    if !archive_path.exists() {
        return Err(ExtractError::NotFound(archive_path.to_path_buf()));
    }

    tracing::info!(
        "Extracting {} to {}",
        archive_path.display(),
        dest_dir.display()
    );

    unpack_zip(archive_path, dest_dir, strip_prefix).map_err(|source| {
        tracing::error!("Failed to extract {}: {:#}", archive_path.display(), source);
        ExtractError::Failed {
            path: archive_path.to_path_buf(),
            source,
        }
    })
}

/// Extract a gzip-compressed tar archive
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> std::result::Result<(), ExtractError> {
    if !archive_path.exists() {
        return Err(ExtractError::NotFound(archive_path.to_path_buf()));
    }

    tracing::info!(
        "Extracting {} to {}",
        archive_path.display(),
        dest_dir.display()
    );

    unpack_tar_gz(archive_path, dest_dir).map_err(|source| {
        tracing::error!("Failed to extract {}: {:#}", archive_path.display(), source);
        ExtractError::Failed {
            path: archive_path.to_path_buf(),
            source,
        }
    })
}

/// Extract with the extractor matching `format`
pub fn extract_archive(
    archive_path: &Path,
    dest_dir: &Path,
    format: ArchiveFormat,
) -> std::result::Result<(), ExtractError> {
    match format {
        ArchiveFormat::Zip => extract_zip(archive_path, dest_dir, ""),
        ArchiveFormat::TarGz => extract_tar_gz(archive_path, dest_dir),
    }
}

fn unpack_zip(archive_path: &Path, dest_dir: &Path, strip_prefix: &str) -> Result<()> {
    let file = fs::File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("Failed to read ZIP archive: {}", archive_path.display()))?;

    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read archive entry {}", i))?;

        let name = entry.name().to_string();
        let Some(relative) = name.strip_prefix(strip_prefix) else {
            continue;
        };
        if relative.trim_matches('/').is_empty() {
            continue;
        }

        let output_path = dest_dir.join(safe_relative_path(relative)?);

        if entry.is_dir() {
            fs::create_dir_all(&output_path).with_context(|| {
                format!("Failed to create directory: {}", output_path.display())
            })?;
        } else {
            write_entry(&mut entry, &output_path)?;
        }
    }

    Ok(())
}

fn unpack_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let file = fs::File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    for entry in archive
        .entries()
        .with_context(|| format!("Failed to read tar archive: {}", archive_path.display()))?
    {
        let mut entry = entry.context("Failed to read tar entry")?;
        let entry_path = entry.path().context("Invalid tar entry path")?.into_owned();
        let relative = safe_relative_path(&entry_path.to_string_lossy())?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let output_path = dest_dir.join(&relative);

        match entry.header().entry_type() {
            EntryType::Directory => {
                fs::create_dir_all(&output_path).with_context(|| {
                    format!("Failed to create directory: {}", output_path.display())
                })?;
            }
            EntryType::Regular | EntryType::Continuous => {
                write_entry(&mut entry, &output_path)?;
            }
            _ => {
                // Symlinks and hard links (JDK legal/ directories use them)
                if let Some(parent) = output_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                entry.unpack_in(dest_dir).with_context(|| {
                    format!("Failed to unpack entry: {}", entry_path.display())
                })?;
            }
        }
    }

    Ok(())
}

fn write_entry(reader: &mut impl io::Read, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut outfile = fs::File::create(output_path)
        .with_context(|| format!("Failed to create file: {}", output_path.display()))?;
    io::copy(reader, &mut outfile)
        .with_context(|| format!("Failed to extract: {}", output_path.display()))?;

    Ok(())
}

/// Normalize an archive entry name, rejecting absolute paths and `..`
fn safe_relative_path(name: &str) -> Result<PathBuf> {
    let mut path = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                anyhow::bail!("Refusing to extract path outside destination: {}", name)
            }
        }
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_zip(path: &Path, entries: &[(&str, Option<&[u8]>)]) {
        let file = fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default();
        for (name, contents) in entries {
            match contents {
                Some(bytes) => {
                    zip.start_file(*name, options).unwrap();
                    zip.write_all(bytes).unwrap();
                }
                None => {
                    zip.add_directory(*name, options).unwrap();
                }
            }
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_safe_relative_path() {
        assert_eq!(safe_relative_path("a/b.txt").unwrap(), PathBuf::from("a/b.txt"));
        assert_eq!(safe_relative_path("./a/").unwrap(), PathBuf::from("a"));
        assert!(safe_relative_path("../evil").is_err());
        assert!(safe_relative_path("/etc/passwd").is_err());
    }

    #[test]
    fn test_missing_archive_is_not_found() {
        let temp = tempfile::TempDir::new().unwrap();
        let missing = temp.path().join("missing.zip");

        let err = extract_zip(&missing, &temp.path().join("out"), "").unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(_)));

        let err = extract_tar_gz(&missing, &temp.path().join("out")).unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(_)));
    }

    #[test]
    fn test_zip_prefix_strip() {
        let temp = tempfile::TempDir::new().unwrap();
        let archive = temp.path().join("pkg.zip");
        write_zip(
            &archive,
            &[
                ("foo/", None),
                ("foo/a.txt", Some(b"a")),
                ("foo/bar/b.txt", Some(b"b")),
                ("other/c.txt", Some(b"c")),
            ],
        );
        let dest = temp.path().join("out");

        extract_zip(&archive, &dest, "foo/").unwrap();

        assert_eq!(fs::read_to_string(dest.join("a.txt")).unwrap(), "a");
        assert_eq!(fs::read_to_string(dest.join("bar/b.txt")).unwrap(), "b");
        assert!(!dest.join("other").exists());
        assert!(!dest.join("c.txt").exists());
        assert!(!dest.join("foo").exists());
    }

    #[test]
    fn test_zip_without_prefix_keeps_everything() {
        let temp = tempfile::TempDir::new().unwrap();
        let archive = temp.path().join("pkg.zip");
        write_zip(
            &archive,
            &[("lib/", None), ("lib/game.jar", Some(b"jar")), ("README", Some(b"r"))],
        );
        let dest = temp.path().join("out");

        extract_archive(&archive, &dest, ArchiveFormat::Zip).unwrap();

        assert!(dest.join("lib").is_dir());
        assert_eq!(fs::read(dest.join("lib/game.jar")).unwrap(), b"jar");
        assert!(dest.join("README").is_file());
    }

    #[test]
    fn test_corrupt_zip_is_failure() {
        let temp = tempfile::TempDir::new().unwrap();
        let archive = temp.path().join("bad.zip");
        fs::write(&archive, b"this is not a zip").unwrap();

        let err = extract_zip(&archive, &temp.path().join("out"), "").unwrap_err();
        assert!(matches!(err, ExtractError::Failed { .. }));
    }

    #[test]
    fn test_tar_gz_extraction() {
        let temp = tempfile::TempDir::new().unwrap();
        let archive = temp.path().join("jdk.tar.gz");
        {
            let file = fs::File::create(&archive).unwrap();
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::fast());
            let mut builder = tar::Builder::new(encoder);

            let mut dir = tar::Header::new_gnu();
            dir.set_entry_type(EntryType::Directory);
            dir.set_mode(0o755);
            dir.set_size(0);
            dir.set_cksum();
            builder
                .append_data(&mut dir, "jdk-17.0.2+8/bin/", io::empty())
                .unwrap();

            let body = b"#!/bin/sh\n";
            let mut file_header = tar::Header::new_gnu();
            file_header.set_mode(0o644);
            file_header.set_size(body.len() as u64);
            file_header.set_cksum();
            builder
                .append_data(&mut file_header, "jdk-17.0.2+8/bin/java", &body[..])
                .unwrap();

            builder.into_inner().unwrap().finish().unwrap();
        }
        let dest = temp.path().join("jdk");

        extract_tar_gz(&archive, &dest).unwrap();

        assert!(dest.join("jdk-17.0.2+8/bin").is_dir());
        assert_eq!(
            fs::read(dest.join("jdk-17.0.2+8/bin/java")).unwrap(),
            b"#!/bin/sh\n"
        );
    }

    #[test]
    fn test_corrupt_tar_gz_is_failure() {
        let temp = tempfile::TempDir::new().unwrap();
        let archive = temp.path().join("bad.tar.gz");
        fs::write(&archive, b"not gzip").unwrap();

        let err = extract_tar_gz(&archive, &temp.path().join("out")).unwrap_err();
        assert!(matches!(err, ExtractError::Failed { .. }));
    }
}
