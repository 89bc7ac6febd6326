//! Cache archives: gzip-compressed tarballs of build directories

use crate::transfer::TransferError;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};
use tar::{Archive, Builder};
use tracing::{debug, warn};

/// Pack `directories` (relative to `root`) into `archive`
///
/// Directories that do not exist are skipped with a warning, as are paths
/// escaping `root`. Returns the number of entries archived.
pub fn compress(root: &Path, directories: &[PathBuf], archive: &Path) -> Result<usize, TransferError> {
    if let Some(parent) = archive.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| TransferError::archive(format!("creating {}", parent.display()), e))?;
    }

    let file = File::create(archive)
        .map_err(|e| TransferError::archive(format!("creating {}", archive.display()), e))?;
    let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(false);

    let mut archived = 0;
    for dir in directories {
        if !stays_inside(dir) {
            warn!("{} is outside the build directory, not caching it", dir.display());
            continue;
        }

        let source = root.join(dir);
        if !source.exists() {
            warn!("{} does not exist, not caching it", dir.display());
            continue;
        }

        let appended = if source.is_dir() {
            builder.append_dir_all(dir, &source)
        } else {
            builder.append_path_with_name(&source, dir)
        };
        appended.map_err(|e| TransferError::archive(format!("archiving {}", dir.display()), e))?;

        debug!("Archived {}", dir.display());
        archived += 1;
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| TransferError::archive("finishing tarball", e))?;
    encoder
        .finish()
        .map_err(|e| TransferError::archive("finishing gzip stream", e))?;

    Ok(archived)
}

/// Unpack `archive` into `into`
pub fn extract(archive: &Path, into: &Path) -> Result<(), TransferError> {
    fs::create_dir_all(into)
        .map_err(|e| TransferError::archive(format!("creating {}", into.display()), e))?;

    let file = File::open(archive)
        .map_err(|e| TransferError::archive(format!("opening {}", archive.display()), e))?;
    let mut tarball = Archive::new(GzDecoder::new(file));
    tarball.set_preserve_mtime(true);
    tarball
        .unpack(into)
        .map_err(|e| TransferError::archive(format!("extracting {}", archive.display()), e))?;

    debug!("Extracted {} into {}", archive.display(), into.display());
    Ok(())
}

/// Relative path without `..` or root components
fn stays_inside(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        && path.components().next().is_some()
}
