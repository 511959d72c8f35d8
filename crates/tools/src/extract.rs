//! Archive extractor (C3): unpack a zip or tar archive into a destination
//! directory, validating every entry before any file is created.
//!
//! Both formats share the same validate-then-extract shape: a first pass
//! rejects path traversal, symlinks, absolute paths, and oversized archives
//! without writing anything, and only then does a second pass touch the
//! filesystem. This is the same two-phase structure the teacher's OpenClaw
//! tar importer uses, generalized to cover zip too.

use std::collections::HashSet;
use std::io;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;

use smartmob_domain::{Error, Result};

const MAX_PATH_DEPTH: usize = 64;
const MAX_ENTRIES_TOTAL: u64 = 100_000;

fn max_extracted_bytes() -> u64 {
    std::env::var("SMARTMOB_MAX_EXTRACTED_BYTES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(500 * 1024 * 1024)
}

/// Unpack `archive_path` (of the given `format`) into `dest_dir`. Blocking
/// and CPU-bound; callers run this on a blocking worker pool.
pub fn unpack(format: &str, archive_path: &Path, dest_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dest_dir)?;
    match format {
        "zip" => unpack_zip(archive_path, dest_dir),
        "tar" => unpack_tar(archive_path, dest_dir),
        other => Err(Error::InvalidArchiveFormat(other.to_string())),
    }
}

/// Reject absolute paths, `..` components, and anything deeper than
/// [`MAX_PATH_DEPTH`]. Returns the normalized, `/`-joined relative path.
fn validate_relative_path(raw: &Path) -> Result<PathBuf> {
    let mut normalized = PathBuf::new();
    let mut depth = 0usize;
    for component in raw.components() {
        match component {
            Component::Normal(part) => {
                normalized.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(Error::ExtractFailed(format!(
                    "path traversal in archive entry: {}",
                    raw.display()
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(Error::ExtractFailed(format!(
                    "absolute path in archive entry: {}",
                    raw.display()
                )));
            }
        }
    }
    if depth == 0 {
        return Err(Error::ExtractFailed("empty entry path".to_string()));
    }
    if depth > MAX_PATH_DEPTH {
        return Err(Error::ExtractFailed(format!(
            "entry path too deep ({depth} components): {}",
            raw.display()
        )));
    }
    Ok(normalized)
}

fn unpack_tar(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    validate_tar_entries(archive_path)?;

    let file = std::fs::File::open(archive_path)?;
    let gz = GzDecoder::new(std::io::BufReader::new(file));
    let mut archive = Archive::new(gz);

    for entry in archive
        .entries()
        .map_err(|e| Error::ExtractFailed(format!("tar entries failed: {e}")))?
    {
        let mut entry =
            entry.map_err(|e| Error::ExtractFailed(format!("tar entry read failed: {e}")))?;

        match entry.header().entry_type() {
            tar::EntryType::XHeader
            | tar::EntryType::XGlobalHeader
            | tar::EntryType::GNULongName
            | tar::EntryType::GNULongLink => continue,
            tar::EntryType::Regular | tar::EntryType::GNUSparse | tar::EntryType::Directory => {}
            other => {
                return Err(Error::ExtractFailed(format!(
                    "unexpected tar entry type {other:?}"
                )));
            }
        }

        let raw_path = entry
            .path()
            .map_err(|e| Error::ExtractFailed(format!("tar path read failed: {e}")))?
            .into_owned();
        let relative = validate_relative_path(&raw_path)?;
        let full_path = dest_dir.join(&relative);

        if entry.header().entry_type() == tar::EntryType::Directory {
            std::fs::create_dir_all(&full_path)?;
            set_dir_permissions(&full_path)?;
            continue;
        }

        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut out_file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full_path)
            .map_err(|e| {
                if e.kind() == io::ErrorKind::AlreadyExists {
                    Error::ExtractFailed(format!(
                        "duplicate entry path: {}",
                        relative.display()
                    ))
                } else {
                    Error::Io(e)
                }
            })?;
        std::io::copy(&mut entry, &mut out_file)?;
        set_file_permissions(&full_path, entry.header().mode().unwrap_or(0o644))?;
    }

    Ok(())
}

fn validate_tar_entries(archive_path: &Path) -> Result<()> {
    let file = std::fs::File::open(archive_path)?;
    let gz = GzDecoder::new(std::io::BufReader::new(file));
    let mut archive = Archive::new(gz);

    let max_bytes = max_extracted_bytes();
    let mut total_bytes: u64 = 0;
    let mut total_entries: u64 = 0;
    let mut seen = HashSet::new();

    for entry in archive
        .entries()
        .map_err(|e| Error::ExtractFailed(format!("tar entries failed: {e}")))?
    {
        let entry =
            entry.map_err(|e| Error::ExtractFailed(format!("tar entry read failed: {e}")))?;

        total_entries += 1;
        if total_entries > MAX_ENTRIES_TOTAL {
            return Err(Error::ExtractFailed("too many entries in archive".to_string()));
        }

        match entry.header().entry_type() {
            tar::EntryType::Symlink | tar::EntryType::Link => {
                return Err(Error::ExtractFailed(
                    "symlinks are not allowed in archives".to_string(),
                ));
            }
            tar::EntryType::XHeader
            | tar::EntryType::XGlobalHeader
            | tar::EntryType::GNULongName
            | tar::EntryType::GNULongLink => continue,
            _ => {}
        }

        let raw_path = entry
            .path()
            .map_err(|e| Error::ExtractFailed(format!("tar path read failed: {e}")))?
            .into_owned();
        let relative = validate_relative_path(&raw_path)?;

        if entry.header().entry_type() != tar::EntryType::Directory {
            if !seen.insert(relative.clone()) {
                return Err(Error::ExtractFailed(format!(
                    "duplicate entry path: {}",
                    relative.display()
                )));
            }
            total_bytes += entry.header().size().unwrap_or(0);
            if total_bytes > max_bytes {
                return Err(Error::ExtractFailed("extracted archive too large".to_string()));
            }
        }
    }

    Ok(())
}

fn unpack_zip(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    validate_zip_entries(archive_path)?;

    let file = std::fs::File::open(archive_path)?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| Error::ExtractFailed(format!("zip open failed: {e}")))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| Error::ExtractFailed(format!("zip entry read failed: {e}")))?;

        let raw_path = match entry.enclosed_name() {
            Some(p) => p.to_path_buf(),
            None => {
                return Err(Error::ExtractFailed(format!(
                    "unsafe zip entry name: {}",
                    entry.name()
                )));
            }
        };
        let relative = validate_relative_path(&raw_path)?;
        let full_path = dest_dir.join(&relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&full_path)?;
            set_dir_permissions(&full_path)?;
            continue;
        }

        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut out_file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full_path)
            .map_err(|e| {
                if e.kind() == io::ErrorKind::AlreadyExists {
                    Error::ExtractFailed(format!(
                        "duplicate entry path: {}",
                        relative.display()
                    ))
                } else {
                    Error::Io(e)
                }
            })?;
        std::io::copy(&mut entry, &mut out_file)?;
        set_file_permissions(&full_path, entry.unix_mode().unwrap_or(0o644))?;
    }

    Ok(())
}

fn validate_zip_entries(archive_path: &Path) -> Result<()> {
    let file = std::fs::File::open(archive_path)?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| Error::ExtractFailed(format!("zip open failed: {e}")))?;

    if archive.len() as u64 > MAX_ENTRIES_TOTAL {
        return Err(Error::ExtractFailed("too many entries in archive".to_string()));
    }

    let max_bytes = max_extracted_bytes();
    let mut total_bytes: u64 = 0;
    let mut seen = HashSet::new();

    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| Error::ExtractFailed(format!("zip entry read failed: {e}")))?;

        if entry.is_symlink() {
            return Err(Error::ExtractFailed(
                "symlinks are not allowed in archives".to_string(),
            ));
        }

        let raw_path = match entry.enclosed_name() {
            Some(p) => p.to_path_buf(),
            None => {
                return Err(Error::ExtractFailed(format!(
                    "unsafe zip entry name: {}",
                    entry.name()
                )));
            }
        };
        let relative = validate_relative_path(&raw_path)?;

        if !entry.is_dir() {
            if !seen.insert(relative.clone()) {
                return Err(Error::ExtractFailed(format!(
                    "duplicate entry path: {}",
                    relative.display()
                )));
            }
            total_bytes += entry.size();
            if total_bytes > max_bytes {
                return Err(Error::ExtractFailed("extracted archive too large".to_string()));
            }
        }
    }

    Ok(())
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    // Strip setuid/setgid/sticky; keep only rwx bits from the archive.
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o777))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
