// src/actions/install_files.rs

use super::{optional_str, Action, ActionContext};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::Path;

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

fn collect_files(params: &toml::Table, action: &str) -> Result<Vec<String>> {
    if let Some(files) = params.get("files") {
        let arr = files.as_array().ok_or_else(|| Error::UserError {
            action: action.to_string(),
            reason: "'files' must be an array of strings".to_string(),
        })?;
        return arr
            .iter()
            .map(|v| {
                v.as_str().map(str::to_string).ok_or_else(|| Error::UserError {
                    action: action.to_string(),
                    reason: "'files' entries must be strings".to_string(),
                })
            })
            .collect();
    }
    Err(Error::UserError {
        action: action.to_string(),
        reason: "must specify 'files' or 'directory'".to_string(),
    })
}

fn copy_into(ctx: &ActionContext, params: &toml::Table, dest: &Path, action: &str, exec: bool) -> Result<()> {
    std::fs::create_dir_all(dest)?;

    if let Some(dir) = optional_str(params, "directory") {
        let src_dir = ctx.staging_dir.join(dir);
        for entry in walkdir::WalkDir::new(&src_dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(&src_dir).unwrap();
            let out_path = dest.join(relative);
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &out_path)?;
            if exec {
                set_executable(&out_path)?;
            }
        }
        return Ok(());
    }

    for rel in collect_files(params, action)? {
        let src = ctx.staging_dir.join(&rel);
        if !src.exists() {
            return Err(Error::UserError {
                action: action.to_string(),
                reason: format!("file '{rel}' does not exist in staging"),
            });
        }
        let file_name = Path::new(&rel).file_name().ok_or_else(|| Error::UserError {
            action: action.to_string(),
            reason: format!("invalid file path '{rel}'"),
        })?;
        let out_path = dest.join(file_name);
        std::fs::copy(&src, &out_path)?;
        if exec {
            set_executable(&out_path)?;
        }
    }
    Ok(())
}

/// `install_binaries`: copies `files`/`directory` into `staging/bin/` with
/// mode `0755`.
pub struct InstallBinaries;

#[async_trait]
impl Action for InstallBinaries {
    async fn execute(&self, ctx: &ActionContext, params: &toml::Table) -> Result<()> {
        copy_into(ctx, params, &ctx.bin_dir(), "install_binaries", true)
    }
}

/// `install_libraries`: same as `install_binaries` but for `lib/`,
/// `include/`, `share/`, selected by `kind` (default `lib`).
pub struct InstallLibraries;

#[async_trait]
impl Action for InstallLibraries {
    async fn execute(&self, ctx: &ActionContext, params: &toml::Table) -> Result<()> {
        let dest = match optional_str(params, "kind").unwrap_or("lib") {
            "lib" => ctx.lib_dir(),
            "include" => ctx.include_dir(),
            "share" => ctx.share_dir(),
            other => {
                return Err(Error::UserError {
                    action: "install_libraries".to_string(),
                    reason: format!("unknown kind '{other}', expected lib|include|share"),
                })
            }
        };
        copy_into(ctx, params, &dest, "install_libraries", false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Arch, Host, Os};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn ctx(staging: &Path) -> ActionContext {
        ActionContext {
            staging_dir: staging.to_path_buf(),
            host: Host::new(Os::Linux, Arch::Amd64),
            tool: "x".to_string(),
            version: "1.0.0".to_string(),
            content_cache: Arc::new(crate::cache::ContentCache::new(
                PathBuf::from("/tmp/cache"),
                reqwest::Client::new(),
            )),
            client: reqwest::Client::new(),
            config: Arc::new(crate::config::Config::new(PathBuf::from("/tmp"))),
        }
    }

    #[tokio::test]
    async fn installs_named_files_into_bin() {
        let staging = tempfile::tempdir().unwrap();
        std::fs::write(staging.path().join("rg"), b"binary").unwrap();

        let mut params = toml::Table::new();
        params.insert(
            "files".to_string(),
            toml::Value::Array(vec![toml::Value::String("rg".to_string())]),
        );

        InstallBinaries.execute(&ctx(staging.path()), &params).await.unwrap();
        assert!(staging.path().join("bin/rg").exists());
    }

    #[tokio::test]
    async fn errors_when_file_missing() {
        let staging = tempfile::tempdir().unwrap();
        let mut params = toml::Table::new();
        params.insert(
            "files".to_string(),
            toml::Value::Array(vec![toml::Value::String("missing".to_string())]),
        );
        let err = InstallBinaries.execute(&ctx(staging.path()), &params).await.unwrap_err();
        assert!(matches!(err, Error::UserError { .. }));
    }

    #[tokio::test]
    async fn install_libraries_rejects_unknown_kind() {
        let staging = tempfile::tempdir().unwrap();
        let mut params = toml::Table::new();
        params.insert("kind".to_string(), toml::Value::String("nonsense".to_string()));
        params.insert("files".to_string(), toml::Value::Array(vec![]));
        let err = InstallLibraries.execute(&ctx(staging.path()), &params).await.unwrap_err();
        assert!(matches!(err, Error::UserError { .. }));
    }
}
