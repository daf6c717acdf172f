// src/actions/mod.rs

//! Action executor (C6)
//!
//! Each step names an `action`; the executor looks it up here, substitutes
//! templated placeholders into its params, and runs it against a per-install
//! staging directory. Actions are intentionally narrow: the dispatch logic,
//! template substitution, and failure classification live in this module;
//! each action type gets its own file.

pub mod download;
pub mod ecosystem_install;
pub mod extract;
pub mod github;
pub mod install_files;
pub mod require_system;
pub mod run_command;

use crate::error::{Error, FailureClass, Result};
use crate::host::Host;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Lifecycle state of one step's execution (§4.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionState {
    Pending,
    Running,
    Succeeded,
    Failed(FailureClass),
}

/// Everything an action needs besides its own params: where to write, what
/// host it's running on, and shared collaborators (HTTP client, content
/// cache) it may call into.
pub struct ActionContext {
    pub staging_dir: PathBuf,
    pub host: Host,
    pub tool: String,
    pub version: String,
    pub content_cache: Arc<crate::cache::ContentCache>,
    pub client: reqwest::Client,
    pub config: Arc<crate::config::Config>,
}

impl ActionContext {
    pub fn downloads_dir(&self) -> PathBuf {
        self.staging_dir.join("downloads")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.staging_dir.join("bin")
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.staging_dir.join("lib")
    }

    pub fn include_dir(&self) -> PathBuf {
        self.staging_dir.join("include")
    }

    pub fn share_dir(&self) -> PathBuf {
        self.staging_dir.join("share")
    }

    /// Substitute `{{version}}`, `{{os}}`, `{{arch}}`, `{{tool}}`,
    /// `{{staging_dir}}` placeholders in a template string.
    pub fn substitute(&self, template: &str) -> String {
        template
            .replace("{{version}}", &self.version)
            .replace("{{os}}", &self.host.os.to_string())
            .replace("{{arch}}", &self.host.arch.to_string())
            .replace("{{tool}}", &self.tool)
            .replace("{{staging_dir}}", &self.staging_dir.to_string_lossy())
    }
}

/// One action implementation (§4.6). Actions are near-pure: a function from
/// (staging dir, params, host) to (filesystem mutations, status), modulo the
/// network/subprocess calls some of them need to make.
#[async_trait]
pub trait Action: Send + Sync {
    async fn execute(&self, ctx: &ActionContext, params: &toml::Table) -> Result<()>;
}

pub fn registry() -> std::collections::HashMap<&'static str, Box<dyn Action>> {
    let mut m: std::collections::HashMap<&'static str, Box<dyn Action>> =
        std::collections::HashMap::new();
    m.insert("download", Box::new(download::Download));
    m.insert("extract", Box::new(extract::Extract));
    m.insert("github_release", Box::new(github::GithubRelease));
    m.insert("github_archive", Box::new(github::GithubArchive));
    m.insert("install_binaries", Box::new(install_files::InstallBinaries));
    m.insert("install_libraries", Box::new(install_files::InstallLibraries));
    m.insert("run_command", Box::new(run_command::RunCommand));
    m.insert("require_system", Box::new(require_system::RequireSystem));
    m.insert("cargo_install", Box::new(ecosystem_install::EcosystemInstall::cargo()));
    m.insert("gem_install", Box::new(ecosystem_install::EcosystemInstall::gem()));
    m.insert("npm_install", Box::new(ecosystem_install::EcosystemInstall::npm()));
    m.insert("pipx_install", Box::new(ecosystem_install::EcosystemInstall::pipx()));
    m.insert("go_install", Box::new(ecosystem_install::EcosystemInstall::go()));
    m.insert("cpan_install", Box::new(ecosystem_install::EcosystemInstall::cpan()));
    m.insert("apk_install", Box::new(ecosystem_install::EcosystemInstall::apk()));
    m.insert("homebrew_bottle", Box::new(github::HomebrewBottle));
    m
}

/// Look up and run the action named by `action`, returning the error
/// unchanged on failure — the installation manager decides retry/abort.
pub async fn run(action: &str, ctx: &ActionContext, params: &toml::Table) -> Result<()> {
    let registry = registry();
    let action_impl = registry
        .get(action)
        .ok_or_else(|| Error::UnknownAction(action.to_string()))?;
    action_impl.execute(ctx, params).await
}

/// Required-string extraction from a step's params table, with a
/// `UserError` on absence or wrong type (§7 "bad params in recipe").
pub fn require_str<'a>(params: &'a toml::Table, key: &str, action: &str) -> Result<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::UserError {
            action: action.to_string(),
            reason: format!("missing or non-string param '{key}'"),
        })
}

pub fn optional_str<'a>(params: &'a toml::Table, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ActionContext {
        ActionContext {
            staging_dir: PathBuf::from("/tmp/staging-x"),
            host: Host::new(crate::host::Os::Linux, crate::host::Arch::Amd64),
            tool: "ripgrep".to_string(),
            version: "14.1.0".to_string(),
            content_cache: Arc::new(crate::cache::ContentCache::new(
                PathBuf::from("/tmp/cache"),
                reqwest::Client::new(),
            )),
            client: reqwest::Client::new(),
            config: Arc::new(crate::config::Config::new(PathBuf::from("/tmp/home"))),
        }
    }

    #[test]
    fn substitutes_all_placeholders() {
        let c = ctx();
        let out = c.substitute("{{tool}}-{{version}}-{{os}}-{{arch}}");
        assert_eq!(out, "ripgrep-14.1.0-linux-amd64");
    }

    #[test]
    fn require_str_errors_on_missing() {
        let params = toml::Table::new();
        let err = require_str(&params, "url", "download").unwrap_err();
        assert!(matches!(err, Error::UserError { .. }));
    }
}
