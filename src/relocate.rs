//! Moving qualifying entries into the trash directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

/// A failed move. Recoverable: the sweep logs it and continues.
#[derive(Error, Debug)]
pub enum RelocateError {
    #[error("No file name in {0}")]
    NoFileName(PathBuf),

    #[error("Failed to move {from} -> {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A completed move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    pub from: PathBuf,
    pub to: PathBuf,
    /// Copied and deleted because source and trash are on different devices
    pub copied: bool,
}

/// `trash/<base name of source>`
pub fn destination_for(source: &Path, trash: &Path) -> Result<PathBuf, RelocateError> {
    source
        .file_name()
        .map(|name| trash.join(name))
        .ok_or_else(|| RelocateError::NoFileName(source.to_path_buf()))
}

/// Move `source` into `trash`, keeping its base name.
///
/// An existing entry at the destination is not checked for; the outcome is
/// whatever `rename` does on this platform. Cross-device moves fall back to
/// copy + delete.
pub fn relocate(source: &Path, trash: &Path) -> Result<Relocation, RelocateError> {
    let to = destination_for(source, trash)?;
    let move_err = |err: io::Error| RelocateError::Move {
        from: source.to_path_buf(),
        to: to.clone(),
        source: err,
    };

    match fs::rename(source, &to) {
        Ok(()) => Ok(Relocation {
            from: source.to_path_buf(),
            to,
            copied: false,
        }),
        Err(err) if err.kind() == io::ErrorKind::CrossesDevices => move_by_copy(source, to),
        Err(err) => Err(move_err(err)),
    }
}

/// Copy `source` to `to`, then delete `source`.
///
/// Refuses an existing destination. On a failed copy the partial tree at
/// `to` is removed and `source` is left untouched.
fn move_by_copy(source: &Path, to: PathBuf) -> Result<Relocation, RelocateError> {
    let move_err = |err: io::Error| RelocateError::Move {
        from: source.to_path_buf(),
        to: to.clone(),
        source: err,
    };

    // Copying cannot replace an existing entry the way rename does
    if fs::symlink_metadata(&to).is_ok() {
        return Err(move_err(io::Error::from(io::ErrorKind::AlreadyExists)));
    }
    if let Err(copy_err) = copy_tree(source, &to) {
        let _ = remove_entry(&to);
        return Err(move_err(copy_err));
    }
    remove_entry(source).map_err(move_err)?;

    Ok(Relocation {
        from: source.to_path_buf(),
        to,
        copied: true,
    })
}

/// Recursively copy `from` to `to` without following symlinks
pub(crate) fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    for entry in WalkDir::new(from)
        .follow_links(false)
        .follow_root_links(false)
    {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(io::Error::other)?;
        let target = if relative.as_os_str().is_empty() {
            to.to_path_buf()
        } else {
            to.join(relative)
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    let target = fs::read_link(from)?;
    std::os::unix::fs::symlink(target, to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to).map(|_| ())
}

fn remove_entry(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}
