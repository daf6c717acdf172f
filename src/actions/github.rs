// src/actions/github.rs

use super::{download::Download, extract::Extract, optional_str, require_str, Action, ActionContext};
use crate::error::Result;
use async_trait::async_trait;

/// `github_release`: resolves a platform-specific asset from a GitHub
/// release and delegates to `download` + `extract` (§4.6).
///
/// Params: `{repo, tag_prefix?, asset_pattern, format, sha256?, strip_prefix?, into?}`.
/// `asset_pattern` is template-substituted (`{{tool}}`, `{{version}}`,
/// `{{os}}`, `{{arch}}`) to name the release asset.
pub struct GithubRelease;

#[async_trait]
impl Action for GithubRelease {
    async fn execute(&self, ctx: &ActionContext, params: &toml::Table) -> Result<()> {
        let repo = require_str(params, "repo", "github_release")?;
        let pattern = require_str(params, "asset_pattern", "github_release")?;
        let format = require_str(params, "format", "github_release")?;
        let tag_prefix = optional_str(params, "tag_prefix").unwrap_or("v");

        let asset = ctx.substitute(pattern);
        let tag = format!("{tag_prefix}{}", ctx.version);
        let url = format!("https://github.com/{repo}/releases/download/{tag}/{asset}");

        let mut download_params = toml::Table::new();
        download_params.insert("url".to_string(), toml::Value::String(url));
        if let Some(sha256) = optional_str(params, "sha256") {
            download_params.insert("sha256".to_string(), toml::Value::String(sha256.to_string()));
        }
        Download.execute(ctx, &download_params).await?;

        let mut extract_params = toml::Table::new();
        extract_params.insert("archive".to_string(), toml::Value::String(asset));
        extract_params.insert("format".to_string(), toml::Value::String(format.to_string()));
        if let Some(strip) = optional_str(params, "strip_prefix") {
            extract_params.insert("strip_prefix".to_string(), toml::Value::String(strip.to_string()));
        }
        if let Some(into) = optional_str(params, "into") {
            extract_params.insert("into".to_string(), toml::Value::String(into.to_string()));
        }
        Extract.execute(ctx, &extract_params).await
    }
}

/// `github_archive`: fetches the release source tarball (`archive/refs/tags/<tag>.tar.gz`)
/// rather than a named release asset.
pub struct GithubArchive;

#[async_trait]
impl Action for GithubArchive {
    async fn execute(&self, ctx: &ActionContext, params: &toml::Table) -> Result<()> {
        let repo = require_str(params, "repo", "github_archive")?;
        let tag_prefix = optional_str(params, "tag_prefix").unwrap_or("v");
        let tag = format!("{tag_prefix}{}", ctx.version);
        let url = format!("https://github.com/{repo}/archive/refs/tags/{tag}.tar.gz");
        let asset = format!("{}-{tag}.tar.gz", repo.replace('/', "-"));

        let mut download_params = toml::Table::new();
        download_params.insert("url".to_string(), toml::Value::String(url));
        if let Some(sha256) = optional_str(params, "sha256") {
            download_params.insert("sha256".to_string(), toml::Value::String(sha256.to_string()));
        }
        Download.execute(ctx, &download_params).await?;

        let mut extract_params = toml::Table::new();
        extract_params.insert("archive".to_string(), toml::Value::String(asset));
        extract_params.insert("format".to_string(), toml::Value::String("tar.gz".to_string()));
        if let Some(strip) = optional_str(params, "strip_prefix") {
            extract_params.insert("strip_prefix".to_string(), toml::Value::String(strip.to_string()));
        }
        Extract.execute(ctx, &extract_params).await
    }
}

/// `homebrew_bottle`: fetches a Homebrew bottle tarball for the current
/// platform from the `ghcr.io/homebrew/core` registry mirror's public
/// download endpoint and extracts it.
pub struct HomebrewBottle;

#[async_trait]
impl Action for HomebrewBottle {
    async fn execute(&self, ctx: &ActionContext, params: &toml::Table) -> Result<()> {
        let formula = optional_str(params, "formula").unwrap_or(&ctx.tool);
        let bottle_tag = homebrew_bottle_tag(ctx.host.os, ctx.host.arch);
        let url = format!(
            "https://ghcr.io/v2/homebrew/core/{formula}/blobs/{bottle_tag}-{}",
            ctx.version
        );

        let mut download_params = toml::Table::new();
        download_params.insert("url".to_string(), toml::Value::String(url));
        if let Some(sha256) = optional_str(params, "sha256") {
            download_params.insert("sha256".to_string(), toml::Value::String(sha256.to_string()));
        }
        Download.execute(ctx, &download_params).await?;

        let mut extract_params = toml::Table::new();
        extract_params.insert(
            "archive".to_string(),
            toml::Value::String(format!("{bottle_tag}-{}", ctx.version)),
        );
        extract_params.insert("format".to_string(), toml::Value::String("tar.gz".to_string()));
        Extract.execute(ctx, &extract_params).await
    }
}

fn homebrew_bottle_tag(os: crate::host::Os, arch: crate::host::Arch) -> &'static str {
    use crate::host::{Arch, Os};
    match (os, arch) {
        (Os::Darwin, Arch::Arm64) => "arm64_sonoma",
        (Os::Darwin, Arch::Amd64) => "sonoma",
        (Os::Linux, _) => "x86_64_linux",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Arch, Os};

    #[test]
    fn bottle_tag_distinguishes_darwin_arch() {
        assert_eq!(homebrew_bottle_tag(Os::Darwin, Arch::Arm64), "arm64_sonoma");
        assert_eq!(homebrew_bottle_tag(Os::Darwin, Arch::Amd64), "sonoma");
        assert_eq!(homebrew_bottle_tag(Os::Linux, Arch::Amd64), "x86_64_linux");
    }
}
