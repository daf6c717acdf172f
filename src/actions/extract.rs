// src/actions/extract.rs

use super::{optional_str, require_str, Action, ActionContext};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

/// `extract`: unpack `archive` into `staging/<into|pkg>/`, per `format`.
/// Rejects path traversal (`..` components, absolute paths) in every entry.
pub struct Extract;

#[async_trait]
impl Action for Extract {
    async fn execute(&self, ctx: &ActionContext, params: &toml::Table) -> Result<()> {
        let archive_name = require_str(params, "archive", "extract")?;
        let format = require_str(params, "format", "extract")?;
        let strip_prefix = optional_str(params, "strip_prefix");
        let into = optional_str(params, "into").unwrap_or("pkg");

        let archive_path = ctx.downloads_dir().join(archive_name);
        let dest = ctx.staging_dir.join(into);
        std::fs::create_dir_all(&dest)?;

        match format {
            "tar.gz" => extract_tar(&archive_path, &dest, strip_prefix, Compression::Gz)?,
            "tar.xz" => extract_tar(&archive_path, &dest, strip_prefix, Compression::Xz)?,
            "tar.bz2" => extract_tar(&archive_path, &dest, strip_prefix, Compression::Bz2)?,
            "zip" => extract_zip(&archive_path, &dest, strip_prefix)?,
            "gz" => extract_single_gz(&archive_path, &dest, archive_name)?,
            "xz" => extract_single_xz(&archive_path, &dest, archive_name)?,
            "raw" => {
                let file_name = archive_path.file_name().ok_or_else(|| Error::UserError {
                    action: "extract".to_string(),
                    reason: "archive path has no file name".to_string(),
                })?;
                std::fs::copy(&archive_path, dest.join(file_name))?;
            }
            other => {
                return Err(Error::UserError {
                    action: "extract".to_string(),
                    reason: format!("unknown archive format '{other}'"),
                })
            }
        }
        Ok(())
    }
}

enum Compression {
    Gz,
    Xz,
    Bz2,
}

fn safe_relative_path(entry_path: &Path, archive: &str) -> Result<PathBuf> {
    for component in entry_path.components() {
        match component {
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::UnsafeArchivePath {
                    archive: archive.to_string(),
                    entry: entry_path.to_string_lossy().to_string(),
                })
            }
            _ => {}
        }
    }
    Ok(entry_path.to_path_buf())
}

fn apply_strip_prefix(path: &Path, strip_prefix: Option<&str>) -> Option<PathBuf> {
    match strip_prefix {
        None => Some(path.to_path_buf()),
        Some(prefix) => path.strip_prefix(prefix).ok().map(|p| p.to_path_buf()),
    }
}

fn extract_tar(
    archive_path: &Path,
    dest: &Path,
    strip_prefix: Option<&str>,
    compression: Compression,
) -> Result<()> {
    let file = std::fs::File::open(archive_path)?;
    let reader: Box<dyn Read> = match compression {
        Compression::Gz => Box::new(flate2::read::GzDecoder::new(file)),
        Compression::Xz => Box::new(xz2::read::XzDecoder::new(file)),
        Compression::Bz2 => Box::new(bzip2::read::BzDecoder::new(file)),
    };
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_path = entry.path()?.to_path_buf();
        let safe = safe_relative_path(&entry_path, &archive_path.to_string_lossy())?;
        let Some(relative) = apply_strip_prefix(&safe, strip_prefix) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        let out_path = dest.join(&relative);
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        entry.unpack(&out_path)?;
    }
    Ok(())
}

/// Unix file-type mask/value for symlinks, as stored in a zip entry's
/// external attributes (the same bits `st_mode` would carry).
const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

fn extract_zip(archive_path: &Path, dest: &Path, strip_prefix: Option<&str>) -> Result<()> {
    let file = std::fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::Other(format!("invalid zip archive: {e}")))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| Error::Other(e.to_string()))?;
        let Some(entry_path) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
            return Err(Error::UnsafeArchivePath {
                archive: archive_path.to_string_lossy().to_string(),
                entry: entry.name().to_string(),
            });
        };
        let safe = safe_relative_path(&entry_path, &archive_path.to_string_lossy())?;
        let Some(relative) = apply_strip_prefix(&safe, strip_prefix) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        let out_path = dest.join(&relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let is_symlink = entry.unix_mode().is_some_and(|mode| mode & S_IFMT == S_IFLNK);
        if is_symlink {
            let mut target = String::new();
            entry.read_to_string(&mut target)?;
            if out_path.symlink_metadata().is_ok() {
                std::fs::remove_file(&out_path)?;
            }
            write_symlink(&target, &out_path)?;
            continue;
        }

        let mut out_file = std::fs::File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out_file)?;
    }
    Ok(())
}

#[cfg(unix)]
fn write_symlink(target: &str, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_symlink(target: &str, link: &Path) -> Result<()> {
    std::fs::write(link, target)?;
    Ok(())
}

fn extract_single_gz(archive_path: &Path, dest: &Path, archive_name: &str) -> Result<()> {
    let file = std::fs::File::open(archive_path)?;
    let mut decoder = flate2::read::GzDecoder::new(file);
    let out_name = archive_name.strip_suffix(".gz").unwrap_or(archive_name);
    let mut out_file = std::fs::File::create(dest.join(out_name))?;
    std::io::copy(&mut decoder, &mut out_file)?;
    Ok(())
}

fn extract_single_xz(archive_path: &Path, dest: &Path, archive_name: &str) -> Result<()> {
    let file = std::fs::File::open(archive_path)?;
    let mut decoder = xz2::read::XzDecoder::new(file);
    let out_name = archive_name.strip_suffix(".xz").unwrap_or(archive_name);
    let mut out_file = std::fs::File::create(dest.join(out_name))?;
    std::io::copy(&mut decoder, &mut out_file)?;
    Ok(())
}
