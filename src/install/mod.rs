// src/install/mod.rs

//! Installation manager (C7)
//!
//! Orchestrates dependency ordering, version resolution, step execution,
//! verification, and atomic activation. The tool tree is either fully
//! updated to a new, identifiable state or left exactly as it was —
//! every step's side effects land under a staging directory that is
//! deleted wholesale on any failure.

use crate::actions::{self, ActionContext};
use crate::cache::{ContentCache, VersionCache};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::host::{matches, Host};
use crate::recipe::cache::RecipeCache;
use crate::recipe::format::Recipe;
use crate::recipe::graph;
use crate::tooltree::ToolLock;
use crate::version::provider::{ProviderRegistry, SourceRef};
use crate::version::{constraint::resolve as resolve_constraint, Constraint};
use backon::{ExponentialBuilder, Retryable};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a successful install (§3 "Return").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledTool {
    pub name: String,
    pub version: String,
    pub path: std::path::PathBuf,
}

pub struct InstallationManager {
    config: Arc<Config>,
    host: Host,
    recipes: RecipeCache,
    providers: ProviderRegistry,
    version_cache: VersionCache,
    content_cache: Arc<ContentCache>,
    client: reqwest::Client,
}

impl InstallationManager {
    pub fn new(config: Config, host: Host, overlay_dir: Option<std::path::PathBuf>, bundled_dir: std::path::PathBuf) -> Self {
        let client = reqwest::Client::new();
        let config = Arc::new(config);
        Self {
            recipes: RecipeCache::new(overlay_dir, bundled_dir),
            providers: ProviderRegistry::with_builtins(client.clone()),
            version_cache: VersionCache::new(config.versions_cache_dir()),
            content_cache: Arc::new(ContentCache::new(config.downloads_cache_dir(), client.clone())),
            client,
            config,
            host,
        }
    }

    /// `install(tool, constraint?) -> InstalledTool` (§4.7).
    pub async fn install(&self, tool: &str, constraint: Option<&str>) -> Result<InstalledTool> {
        let order = graph::install_order(&self.recipes, tool)?;

        let mut result = None;
        for name in &order {
            let is_root = name == tool;
            let c = if is_root { constraint } else { None };
            let installed = self.install_one(name, c).await?;
            if is_root {
                result = Some(installed);
            }
        }
        result.ok_or_else(|| Error::RecipeNotFound { name: tool.to_string() })
    }

    async fn install_one(&self, tool: &str, constraint: Option<&str>) -> Result<InstalledTool> {
        let recipe = self.recipes.load(tool)?;
        let _lock = ToolLock::acquire(&self.config.tool_lock_path(tool))?;

        let resolved_version = self.resolve_version(&recipe, constraint).await?;

        let target_dir = if recipe.metadata.r#type == crate::recipe::format::RecipeType::Library {
            self.config.libs_dir().join(tool).join(&resolved_version)
        } else {
            self.config.tool_version_dir(tool, &resolved_version)
        };

        if target_dir.exists() && self.verify(&recipe, &target_dir).await.is_ok() {
            info!(%tool, version = %resolved_version, "already installed, re-pointing current");
            self.activate(tool, &recipe, &resolved_version)?;
            return Ok(InstalledTool { name: tool.to_string(), version: resolved_version, path: target_dir });
        }

        let staging = self.config.staging_root().join(format!("staging-{tool}-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&staging)?;

        let outcome = self.execute_steps(&recipe, &resolved_version, &staging).await;
        let outcome = match outcome {
            Ok(()) => self.verify(&recipe, &staging).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                self.commit(&staging, &target_dir)?;
                self.activate(tool, &recipe, &resolved_version)?;
                info!(%tool, version = %resolved_version, "installed");
                Ok(InstalledTool { name: tool.to_string(), version: resolved_version, path: target_dir })
            }
            Err(e) => {
                let _ = std::fs::remove_dir_all(&staging);
                Err(e)
            }
        }
    }

    async fn resolve_version(&self, recipe: &Recipe, constraint: Option<&str>) -> Result<String> {
        let source_ref = SourceRef::parse(&recipe.version.source)?;
        let provider = self.providers.get(&source_ref.scheme)?;

        let candidates = if let Some(cached) = self.version_cache.read_fresh(&recipe.version.source) {
            cached
        } else {
            let source_id = source_ref.id.clone();
            let fetch = || {
                let provider = provider.clone();
                let source_id = source_id.clone();
                async move { provider.list_versions(&source_id).await }
            };
            let versions = fetch
                .retry(ExponentialBuilder::default().with_max_times(3).with_min_delay(std::time::Duration::from_millis(500)).with_factor(2.0))
                .when(|e| e.classify() == crate::error::FailureClass::Transient)
                .await?;
            self.version_cache.write(&recipe.version.source, &versions)?;
            versions
        };

        let parsed = Constraint::parse(constraint);
        resolve_constraint(&recipe.metadata.name, &parsed, &candidates, recipe.metadata.version_format)
    }

    async fn execute_steps(&self, recipe: &Recipe, version: &str, staging: &std::path::Path) -> Result<()> {
        let ctx = ActionContext {
            staging_dir: staging.to_path_buf(),
            host: self.host.clone(),
            tool: recipe.metadata.name.clone(),
            version: version.to_string(),
            content_cache: self.content_cache.clone(),
            client: self.client.clone(),
            config: self.config.clone(),
        };

        for (index, step) in recipe.steps.iter().enumerate() {
            if !matches(&step.when, &self.host) {
                continue;
            }
            let description = step.description.clone().unwrap_or_else(|| step.action.clone());
            self.run_with_retry(&ctx, step, index, &recipe.metadata.name, &description).await?;
        }
        Ok(())
    }

    async fn run_with_retry(
        &self,
        ctx: &ActionContext,
        step: &crate::recipe::format::Step,
        index: usize,
        tool: &str,
        description: &str,
    ) -> Result<()> {
        let run_once = || async { actions::run(&step.action, ctx, &step.params).await };

        let result = run_once
            .retry(ExponentialBuilder::default().with_max_times(3).with_min_delay(std::time::Duration::from_millis(500)).with_factor(2.0))
            .when(|e: &Error| e.classify() == crate::error::FailureClass::Transient)
            .await;

        result.map_err(|source| Error::StepFailed {
            tool: tool.to_string(),
            index,
            description: description.to_string(),
            source: Box::new(source),
        })
    }

    async fn verify(&self, recipe: &Recipe, root: &std::path::Path) -> Result<()> {
        let bin_dir = root.join("bin");
        let system_path = std::env::var_os("PATH").unwrap_or_default();
        let path = std::env::join_paths(
            std::iter::once(bin_dir).chain(std::env::split_paths(&system_path)),
        )
        .map_err(|e| Error::Other(e.to_string()))?;

        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&recipe.verify.command)
            .env("PATH", &path)
            .current_dir(root)
            .output()
            .await?;

        if !output.status.success() {
            return Err(Error::VerifyFailed {
                command: recipe.verify.command.clone(),
                stdout_tail: crate::actions::run_command::tail(&output.stdout),
            });
        }

        if let Some(pattern) = &recipe.verify.pattern {
            let re = regex::Regex::new(pattern)
                .map_err(|e| Error::Other(format!("invalid verify.pattern: {e}")))?;
            let stdout = String::from_utf8_lossy(&output.stdout);
            if !re.is_match(&stdout) {
                return Err(Error::VerifyFailed {
                    command: recipe.verify.command.clone(),
                    stdout_tail: crate::actions::run_command::tail(&output.stdout),
                });
            }
        }
        Ok(())
    }

    fn commit(&self, staging: &std::path::Path, target_dir: &std::path::Path) -> Result<()> {
        if let Some(parent) = target_dir.parent() {
            std::fs::create_dir_all(parent)?;
        }
        move_dir_atomic(staging, target_dir)
    }

    fn activate(&self, tool: &str, recipe: &Recipe, version: &str) -> Result<()> {
        if recipe.metadata.r#type == crate::recipe::format::RecipeType::Library {
            return Ok(());
        }
        let current_dir = self.config.current_dir();
        std::fs::create_dir_all(&current_dir)?;
        let link = current_dir.join(tool);
        let target = self.config.tool_version_dir(tool, version);

        let tmp_link = current_dir.join(format!(".tmp-{tool}-{}", uuid::Uuid::new_v4()));
        symlink_dir(&target, &tmp_link)?;
        std::fs::rename(&tmp_link, &link)?;
        Ok(())
    }

    /// `remove(tool)` — deletes `tools/<tool>/` and the `current` symlink.
    /// Errors with `StillDepended` if another installed tool still lists it
    /// as a dependency, unless `force`.
    pub fn remove(&self, tool: &str, force: bool) -> Result<()> {
        if !force {
            let dependents = self.find_dependents(tool)?;
            if !dependents.is_empty() {
                return Err(Error::StillDepended { tool: tool.to_string(), by: dependents });
            }
        }
        let _lock = ToolLock::acquire(&self.config.tool_lock_path(tool))?;
        let _ = std::fs::remove_file(self.config.current_dir().join(tool));
        let tool_dir = self.config.tools_dir().join(tool);
        if tool_dir.exists() {
            std::fs::remove_dir_all(&tool_dir)?;
        }
        Ok(())
    }

    fn find_dependents(&self, tool: &str) -> Result<Vec<String>> {
        let mut dependents = Vec::new();
        let current_dir = self.config.current_dir();
        if !current_dir.exists() {
            return Ok(dependents);
        }
        for entry in std::fs::read_dir(&current_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == tool {
                continue;
            }
            if let Ok(recipe) = self.recipes.load(&name)
                && recipe.metadata.dependencies.iter().any(|d| d == tool)
            {
                dependents.push(name);
            }
        }
        Ok(dependents)
    }

    /// `update(tool)` = resolve against `latest`, reinstall if greater.
    pub async fn update(&self, tool: &str) -> Result<InstalledTool> {
        self.install(tool, Some("latest")).await
    }

    /// Enumerates recipe names known to this manager's overlay + bundled
    /// directories, for the `recipes` CLI subcommand (§6).
    pub fn known_recipes(&self) -> Vec<String> {
        self.recipes.list_names()
    }
}

#[cfg(unix)]
fn symlink_dir(target: &std::path::Path, link: &std::path::Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link)?;
    Ok(())
}

#[cfg(not(unix))]
fn symlink_dir(target: &std::path::Path, link: &std::path::Path) -> Result<()> {
    std::fs::create_dir_all(link)?;
    Ok(())
}

/// Rename `from` into `to`, falling back to copy+remove on cross-filesystem
/// renames (`EXDEV`), which `rename(2)` cannot perform atomically.
fn move_dir_atomic(from: &std::path::Path, to: &std::path::Path) -> Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(libc::EXDEV) => {
            copy_dir_recursive(from, to)?;
            std::fs::remove_dir_all(from)?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn copy_dir_recursive(from: &std::path::Path, to: &std::path::Path) -> std::io::Result<()> {
    std::fs::create_dir_all(to)?;
    for entry in walkdir::WalkDir::new(from).min_depth(1) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(from).unwrap();
        let dest = to.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest)?;
        } else {
            std::fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_dir_atomic_renames_within_same_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("from");
        let to = dir.path().join("to");
        std::fs::create_dir_all(&from).unwrap();
        std::fs::write(from.join("f"), b"x").unwrap();

        move_dir_atomic(&from, &to).unwrap();
        assert!(to.join("f").exists());
        assert!(!from.exists());
    }
}
