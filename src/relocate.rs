//! Moving extracted trees into their canonical location.
//!
//! Moves never overwrite: a destination that already exists is reported as
//! [`MoveError::DestinationExists`] and left untouched. A plain rename is tried
//! first; when that fails (typically because staging and destination live on
//! different filesystems) the tree is copied and the source removed.

use crate::error::MoveError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Move `src` to `dest`. `src` must exist and `dest` must not.
pub fn move_tree(src: &Path, dest: &Path) -> Result<(), MoveError> {
    if !src.exists() {
        return Err(MoveError::SourceMissing(src.to_path_buf()));
    }
    // symlink_metadata so a dangling link at dest still counts as occupied
    if dest.symlink_metadata().is_ok() {
        return Err(MoveError::DestinationExists(dest.to_path_buf()));
    }

    let io_err = |source| MoveError::Io {
        from: src.to_path_buf(),
        to: dest.to_path_buf(),
        source,
    };

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    match fs::rename(src, dest) {
        Ok(()) => {
            tracing::info!("Moved {} to {}", src.display(), dest.display());
            Ok(())
        }
        Err(e) => {
            tracing::debug!("Rename failed ({}), copying instead", e);
            if let Err(copy_err) = copy_tree(src, dest) {
                // The partial copy is ours to clean up; dest did not exist before
                let _ = fs::remove_dir_all(dest);
                return Err(io_err(copy_err));
            }
            fs::remove_dir_all(src).map_err(io_err)?;
            tracing::info!("Copied {} to {}", src.display(), dest.display());
            Ok(())
        }
    }
}

fn copy_tree(src: &Path, dest: &Path) -> io::Result<()> {
    if src.is_file() {
        fs::copy(src, dest)?;
        return Ok(());
    }

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dest.join(relative);

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, target: &Path) -> io::Result<()> {
    let link = fs::read_link(src)?;
    std::os::unix::fs::symlink(link, target)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, target: &Path) -> io::Result<()> {
    fs::copy(src, target).map(|_| ())
}

/// The only directory directly inside `dir`, if there is exactly one
pub fn single_child_dir(dir: &Path) -> io::Result<Option<PathBuf>> {
    let dirs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();

    Ok(match dirs.as_slice() {
        [only] => Some(only.clone()),
        _ => None,
    })
}

/// Recursively delete `path`; a missing path is not an error
pub fn remove_tree(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_into_empty_slot() {
        let temp = tempfile::TempDir::new().unwrap();
        let src = temp.path().join("temp/1.0-extract");
        fs::create_dir_all(src.join("lib")).unwrap();
        fs::write(src.join("lib/game.jar"), b"jar").unwrap();
        let dest = temp.path().join("versions/1.0");

        move_tree(&src, &dest).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(dest.join("lib/game.jar")).unwrap(), b"jar");
    }

    #[test]
    fn test_move_never_overwrites() {
        let temp = tempfile::TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dest = temp.path().join("dest");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("new.txt"), b"new").unwrap();
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("old.txt"), b"old").unwrap();

        for _ in 0..2 {
            let err = move_tree(&src, &dest).unwrap_err();
            assert!(matches!(err, MoveError::DestinationExists(_)));
        }

        assert_eq!(fs::read(dest.join("old.txt")).unwrap(), b"old");
        assert!(!dest.join("new.txt").exists());
        assert!(src.join("new.txt").exists());
    }

    #[test]
    fn test_move_missing_source() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = move_tree(&temp.path().join("nope"), &temp.path().join("dest")).unwrap_err();
        assert!(matches!(err, MoveError::SourceMissing(_)));
    }

    #[test]
    fn test_copy_tree_preserves_structure() {
        let temp = tempfile::TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("a/b")).unwrap();
        fs::write(src.join("a/b/c.txt"), b"c").unwrap();
        fs::write(src.join("top.txt"), b"t").unwrap();
        let dest = temp.path().join("dest");

        copy_tree(&src, &dest).unwrap();

        assert_eq!(fs::read(dest.join("a/b/c.txt")).unwrap(), b"c");
        assert_eq!(fs::read(dest.join("top.txt")).unwrap(), b"t");
    }

    #[test]
    fn test_single_child_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = temp.path().join("extract");
        fs::create_dir_all(root.join("game-channels-edge")).unwrap();
        assert_eq!(
            single_child_dir(&root).unwrap(),
            Some(root.join("game-channels-edge"))
        );

        fs::create_dir_all(root.join("second")).unwrap();
        assert_eq!(single_child_dir(&root).unwrap(), None);
    }

    #[test]
    fn test_remove_tree_is_idempotent() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("versions/edge");
        fs::create_dir_all(dir.join("src")).unwrap();

        remove_tree(&dir).unwrap();
        assert!(!dir.exists());
        remove_tree(&dir).unwrap();
    }
}
