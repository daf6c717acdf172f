// src/version/providers.rs

//! Concrete ecosystem version providers (C4)
//!
//! Each provider is a thin HTTP client over one ecosystem's public API,
//! mapping its native version listing into the shared `VersionEntry` shape.
//! Transient upstream failures (network errors, non-2xx responses) surface
//! as `Error::VersionUnavailable`; the installation manager applies the
//! retry-with-backoff policy around `list_versions`, not the provider itself.

use super::provider::VersionProvider;
use super::VersionEntry;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

fn transient(source: &str, cause: impl std::fmt::Display) -> Error {
    Error::VersionUnavailable { source: source.to_string(), cause: cause.to_string() }
}

/// `github:owner/repo` — release tags via the GitHub REST API.
pub struct GithubReleaseProvider {
    client: reqwest::Client,
}

impl GithubReleaseProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
    published_at: Option<String>,
    prerelease: bool,
}

#[async_trait]
impl VersionProvider for GithubReleaseProvider {
    fn scheme(&self) -> &'static str {
        "github"
    }

    async fn list_versions(&self, source_id: &str) -> Result<Vec<VersionEntry>> {
        let url = format!("https://api.github.com/repos/{source_id}/releases?per_page=100");
        debug!(%url, "probing github releases");
        let resp = self
            .client
            .get(&url)
            .header("User-Agent", "tsuku")
            .send()
            .await
            .map_err(|e| transient("github", e))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::SourceNotFound { source_id: source_id.to_string() });
        }
        if !resp.status().is_success() {
            return Err(transient("github", resp.status()));
        }

        let releases: Vec<GithubRelease> = resp.json().await.map_err(|e| transient("github", e))?;
        Ok(releases
            .into_iter()
            .filter(|r| !r.prerelease)
            .map(|r| VersionEntry {
                v: r.tag_name.clone(),
                released_at: r.published_at,
                tag: Some(r.tag_name),
                lts: false,
            })
            .collect())
    }

    async fn asset_url(
        &self,
        source_id: &str,
        version: &str,
        os: crate::host::Os,
        arch: crate::host::Arch,
    ) -> Result<Option<String>> {
        // Asset naming varies per project; recipes override via their own
        // `github_release` step mapping. This provider only supplies the
        // release's listing page as a fallback hint.
        let _ = (source_id, version, os, arch);
        Ok(None)
    }
}

/// `crates_io:name` — crates.io registry API.
pub struct CratesIoProvider {
    client: reqwest::Client,
}

impl CratesIoProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct CratesIoVersions {
    versions: Vec<CratesIoVersion>,
}

#[derive(Debug, Deserialize)]
struct CratesIoVersion {
    num: String,
    created_at: Option<String>,
    yanked: bool,
}

#[async_trait]
impl VersionProvider for CratesIoProvider {
    fn scheme(&self) -> &'static str {
        "crates_io"
    }

    async fn list_versions(&self, source_id: &str) -> Result<Vec<VersionEntry>> {
        let url = format!("https://crates.io/api/v1/crates/{source_id}/versions");
        let resp = self
            .client
            .get(&url)
            .header("User-Agent", "tsuku")
            .send()
            .await
            .map_err(|e| transient("crates_io", e))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::SourceNotFound { source_id: source_id.to_string() });
        }
        if !resp.status().is_success() {
            return Err(transient("crates_io", resp.status()));
        }
        let body: CratesIoVersions = resp.json().await.map_err(|e| transient("crates_io", e))?;
        Ok(body
            .versions
            .into_iter()
            .filter(|v| !v.yanked)
            .map(|v| VersionEntry { v: v.num, released_at: v.created_at, tag: None, lts: false })
            .collect())
    }
}

/// `npm:name` — npm registry.
pub struct NpmProvider {
    client: reqwest::Client,
}

impl NpmProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct NpmPackument {
    time: std::collections::HashMap<String, String>,
    #[serde(rename = "dist-tags")]
    dist_tags: std::collections::HashMap<String, String>,
}

#[async_trait]
impl VersionProvider for NpmProvider {
    fn scheme(&self) -> &'static str {
        "npm"
    }

    async fn list_versions(&self, source_id: &str) -> Result<Vec<VersionEntry>> {
        let url = format!("https://registry.npmjs.org/{source_id}");
        let resp = self.client.get(&url).send().await.map_err(|e| transient("npm", e))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::SourceNotFound { source_id: source_id.to_string() });
        }
        if !resp.status().is_success() {
            return Err(transient("npm", resp.status()));
        }
        let body: NpmPackument = resp.json().await.map_err(|e| transient("npm", e))?;
        let latest_tag = body.dist_tags.get("latest").cloned();
        let mut entries: Vec<VersionEntry> = body
            .time
            .into_iter()
            .filter(|(k, _)| k != "created" && k != "modified")
            .map(|(v, released_at)| VersionEntry {
                lts: latest_tag.as_deref() == Some(v.as_str()),
                v,
                released_at: Some(released_at),
                tag: None,
            })
            .collect();
        entries.sort_by(|a, b| b.released_at.cmp(&a.released_at));
        Ok(entries)
    }
}

/// `pypi:name` — PyPI JSON API.
pub struct PypiProvider {
    client: reqwest::Client,
}

impl PypiProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct PypiResponse {
    releases: std::collections::HashMap<String, Vec<PypiRelease>>,
}

#[derive(Debug, Deserialize)]
struct PypiRelease {
    upload_time_iso_8601: Option<String>,
    yanked: bool,
}

#[async_trait]
impl VersionProvider for PypiProvider {
    fn scheme(&self) -> &'static str {
        "pypi"
    }

    async fn list_versions(&self, source_id: &str) -> Result<Vec<VersionEntry>> {
        let url = format!("https://pypi.org/pypi/{source_id}/json");
        let resp = self.client.get(&url).send().await.map_err(|e| transient("pypi", e))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::SourceNotFound { source_id: source_id.to_string() });
        }
        if !resp.status().is_success() {
            return Err(transient("pypi", resp.status()));
        }
        let body: PypiResponse = resp.json().await.map_err(|e| transient("pypi", e))?;
        let mut entries: Vec<VersionEntry> = body
            .releases
            .into_iter()
            .filter(|(_, files)| !files.is_empty() && !files[0].yanked)
            .map(|(v, files)| VersionEntry {
                v,
                released_at: files[0].upload_time_iso_8601.clone(),
                tag: None,
                lts: false,
            })
            .collect();
        entries.sort_by(|a, b| b.released_at.cmp(&a.released_at));
        Ok(entries)
    }
}

/// `rubygems:name` — RubyGems API.
pub struct RubygemsProvider {
    client: reqwest::Client,
}

impl RubygemsProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct RubygemsVersion {
    number: String,
    created_at: Option<String>,
}

#[async_trait]
impl VersionProvider for RubygemsProvider {
    fn scheme(&self) -> &'static str {
        "rubygems"
    }

    async fn list_versions(&self, source_id: &str) -> Result<Vec<VersionEntry>> {
        let url = format!("https://rubygems.org/api/v1/versions/{source_id}.json");
        let resp = self.client.get(&url).send().await.map_err(|e| transient("rubygems", e))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::SourceNotFound { source_id: source_id.to_string() });
        }
        if !resp.status().is_success() {
            return Err(transient("rubygems", resp.status()));
        }
        let versions: Vec<RubygemsVersion> =
            resp.json().await.map_err(|e| transient("rubygems", e))?;
        Ok(versions
            .into_iter()
            .map(|v| VersionEntry { v: v.number, released_at: v.created_at, tag: None, lts: false })
            .collect())
    }
}

/// `go:module/path` — Go module proxy `@v/list` + `@v/<version>.info`.
pub struct GoProxyProvider {
    client: reqwest::Client,
}

impl GoProxyProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl VersionProvider for GoProxyProvider {
    fn scheme(&self) -> &'static str {
        "go"
    }

    async fn list_versions(&self, source_id: &str) -> Result<Vec<VersionEntry>> {
        let url = format!("https://proxy.golang.org/{source_id}/@v/list");
        let resp = self.client.get(&url).send().await.map_err(|e| transient("go", e))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::SourceNotFound { source_id: source_id.to_string() });
        }
        if !resp.status().is_success() {
            return Err(transient("go", resp.status()));
        }
        let body = resp.text().await.map_err(|e| transient("go", e))?;
        let mut entries: Vec<VersionEntry> = body
            .lines()
            .filter(|l| !l.is_empty())
            .map(|v| VersionEntry { v: v.to_string(), released_at: None, tag: None, lts: false })
            .collect();
        entries.reverse();
        Ok(entries)
    }
}

/// `cpan:Distribution-Name` — MetaCPAN API.
pub struct CpanProvider {
    client: reqwest::Client,
}

impl CpanProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct MetaCpanRelease {
    version: String,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetaCpanReleases {
    releases: Vec<MetaCpanRelease>,
}

#[async_trait]
impl VersionProvider for CpanProvider {
    fn scheme(&self) -> &'static str {
        "cpan"
    }

    async fn list_versions(&self, source_id: &str) -> Result<Vec<VersionEntry>> {
        let url = format!(
            "https://fastapi.metacpan.org/v1/release/_search?q=distribution:{source_id}&size=100"
        );
        let resp = self.client.get(&url).send().await.map_err(|e| transient("cpan", e))?;
        if !resp.status().is_success() {
            return Err(transient("cpan", resp.status()));
        }
        let body: MetaCpanReleases = resp.json().await.map_err(|e| transient("cpan", e))?;
        if body.releases.is_empty() {
            return Err(Error::SourceNotFound { source_id: source_id.to_string() });
        }
        let mut entries: Vec<VersionEntry> = body
            .releases
            .into_iter()
            .map(|r| VersionEntry { v: r.version, released_at: r.date, tag: None, lts: false })
            .collect();
        entries.sort_by(|a, b| b.released_at.cmp(&a.released_at));
        Ok(entries)
    }
}

/// `homebrew:name` — Homebrew formulae analytics API.
pub struct HomebrewProvider {
    client: reqwest::Client,
}

impl HomebrewProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct HomebrewFormula {
    versions: HomebrewVersions,
}

#[derive(Debug, Deserialize)]
struct HomebrewVersions {
    stable: String,
}

#[async_trait]
impl VersionProvider for HomebrewProvider {
    fn scheme(&self) -> &'static str {
        "homebrew"
    }

    async fn list_versions(&self, source_id: &str) -> Result<Vec<VersionEntry>> {
        // Homebrew only publishes the current stable bottle; there is no
        // historical version list to page through.
        let url = format!("https://formulae.brew.sh/api/formula/{source_id}.json");
        let resp = self.client.get(&url).send().await.map_err(|e| transient("homebrew", e))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::SourceNotFound { source_id: source_id.to_string() });
        }
        if !resp.status().is_success() {
            return Err(transient("homebrew", resp.status()));
        }
        let formula: HomebrewFormula = resp.json().await.map_err(|e| transient("homebrew", e))?;
        Ok(vec![VersionEntry {
            v: formula.versions.stable,
            released_at: None,
            tag: None,
            lts: false,
        }])
    }
}

/// `cask:token` — Homebrew Cask (darwin application bundles).
pub struct CaskProvider {
    client: reqwest::Client,
}

impl CaskProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct CaskInfo {
    version: String,
}

#[async_trait]
impl VersionProvider for CaskProvider {
    fn scheme(&self) -> &'static str {
        "cask"
    }

    async fn list_versions(&self, source_id: &str) -> Result<Vec<VersionEntry>> {
        let url = format!("https://formulae.brew.sh/api/cask/{source_id}.json");
        let resp = self.client.get(&url).send().await.map_err(|e| transient("cask", e))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::SourceNotFound { source_id: source_id.to_string() });
        }
        if !resp.status().is_success() {
            return Err(transient("cask", resp.status()));
        }
        let cask: CaskInfo = resp.json().await.map_err(|e| transient("cask", e))?;
        Ok(vec![VersionEntry { v: cask.version, released_at: None, tag: None, lts: false }])
    }
}
