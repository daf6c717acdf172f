// src/disambiguate/probers.rs

//! Concrete ecosystem probers (C8)
//!
//! Each prober is a thin read-only query against one ecosystem's public
//! metadata API, normalized into `ProbeResult`. A 404/not-found response
//! yields `Ok(None)`; any other failure is a hard `Error` (the disambiguator
//! doesn't retry probes — a single fan-out round is best-effort per source).

use super::prober::{EcosystemProber, ProbeResult};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;

fn not_found_as_none<T>(status: reqwest::StatusCode, result: Result<T>) -> Result<Option<T>> {
    if status == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    result.map(Some)
}

pub struct HomebrewProber {
    client: reqwest::Client,
}

impl HomebrewProber {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct HomebrewAnalytics {
    analytics: Option<HomebrewAnalyticsInner>,
}

#[derive(Debug, Deserialize)]
struct HomebrewAnalyticsInner {
    install_30d: std::collections::HashMap<String, u64>,
}

#[async_trait]
impl EcosystemProber for HomebrewProber {
    fn builder(&self) -> &'static str {
        "homebrew"
    }

    async fn probe(&self, name: &str) -> Result<Option<ProbeResult>> {
        let url = format!("https://formulae.brew.sh/api/formula/{name}.json");
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::Other(format!("homebrew probe failed: {status}")));
        }
        let body: HomebrewAnalytics = resp.json().await?;
        let downloads = body
            .analytics
            .and_then(|a| a.install_30d.values().next().copied())
            .unwrap_or(0);
        Ok(Some(ProbeResult {
            source: format!("homebrew:{name}"),
            downloads,
            version_count: 1,
            has_repository: true,
            selection_reason: None,
        }))
    }
}

pub struct CargoProber {
    client: reqwest::Client,
}

impl CargoProber {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct CratesIoCrate {
    #[serde(rename = "crate")]
    krate: CratesIoCrateInner,
}

#[derive(Debug, Deserialize)]
struct CratesIoCrateInner {
    downloads: u64,
    repository: Option<String>,
    max_version: String,
}

#[async_trait]
impl EcosystemProber for CargoProber {
    fn builder(&self) -> &'static str {
        "cargo"
    }

    async fn probe(&self, name: &str) -> Result<Option<ProbeResult>> {
        let url = format!("https://crates.io/api/v1/crates/{name}");
        let resp = self.client.get(&url).header("User-Agent", "tsuku").send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::Other(format!("crates.io probe failed: {status}")));
        }
        let body: CratesIoCrate = resp.json().await?;
        Ok(Some(ProbeResult {
            source: format!("crates_io:{name}"),
            downloads: body.krate.downloads,
            version_count: 1,
            has_repository: body.krate.repository.is_some(),
            selection_reason: None,
        }))
    }
}

pub struct NpmProber {
    client: reqwest::Client,
}

impl NpmProber {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct NpmDownloads {
    downloads: u64,
}

#[async_trait]
impl EcosystemProber for NpmProber {
    fn builder(&self) -> &'static str {
        "npm"
    }

    async fn probe(&self, name: &str) -> Result<Option<ProbeResult>> {
        let registry_url = format!("https://registry.npmjs.org/{name}");
        let resp = self.client.get(&registry_url).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::Other(format!("npm probe failed: {status}")));
        }
        let body: serde_json::Value = resp.json().await?;
        let version_count = body.get("versions").and_then(|v| v.as_object()).map(|o| o.len()).unwrap_or(1) as u32;
        let has_repository = body.get("repository").is_some();

        let downloads_url = format!("https://api.npmjs.org/downloads/point/last-month/{name}");
        let downloads = self
            .client
            .get(&downloads_url)
            .send()
            .await
            .ok()
            .and_then(|r| r.json::<NpmDownloads>().await.ok().map(|d| d.downloads))
            .unwrap_or(0);

        Ok(Some(ProbeResult {
            source: format!("npm:{name}"),
            downloads,
            version_count,
            has_repository,
            selection_reason: None,
        }))
    }
}

pub struct PypiProber {
    client: reqwest::Client,
}

impl PypiProber {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EcosystemProber for PypiProber {
    fn builder(&self) -> &'static str {
        "pypi"
    }

    async fn probe(&self, name: &str) -> Result<Option<ProbeResult>> {
        let url = format!("https://pypi.org/pypi/{name}/json");
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::Other(format!("pypi probe failed: {status}")));
        }
        let body: serde_json::Value = resp.json().await?;
        let version_count =
            body.get("releases").and_then(|v| v.as_object()).map(|o| o.len()).unwrap_or(1) as u32;
        let has_repository = body
            .get("info")
            .and_then(|i| i.get("project_urls"))
            .map(|u| !u.is_null())
            .unwrap_or(false);

        let stats_url = format!("https://pypistats.org/api/packages/{name}/recent");
        let downloads = self
            .client
            .get(&stats_url)
            .send()
            .await
            .ok()
            .and_then(|r| r.json::<serde_json::Value>().await.ok())
            .and_then(|v| v.get("data").and_then(|d| d.get("last_month")).and_then(|n| n.as_u64()))
            .unwrap_or(0);

        Ok(Some(ProbeResult {
            source: format!("pypi:{name}"),
            downloads,
            version_count,
            has_repository,
            selection_reason: None,
        }))
    }
}

pub struct RubygemsProber {
    client: reqwest::Client,
}

impl RubygemsProber {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct RubygemsInfo {
    downloads: u64,
    source_code_uri: Option<String>,
    version: String,
}

#[async_trait]
impl EcosystemProber for RubygemsProber {
    fn builder(&self) -> &'static str {
        "rubygems"
    }

    async fn probe(&self, name: &str) -> Result<Option<ProbeResult>> {
        let url = format!("https://rubygems.org/api/v1/gems/{name}.json");
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::Other(format!("rubygems probe failed: {status}")));
        }
        let body: RubygemsInfo = resp.json().await?;
        Ok(Some(ProbeResult {
            source: format!("rubygems:{name}"),
            downloads: body.downloads,
            version_count: 1,
            has_repository: body.source_code_uri.is_some(),
            selection_reason: None,
        }))
    }
}

pub struct GoProber {
    client: reqwest::Client,
}

impl GoProber {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EcosystemProber for GoProber {
    fn builder(&self) -> &'static str {
        "go"
    }

    async fn probe(&self, name: &str) -> Result<Option<ProbeResult>> {
        let url = format!("https://proxy.golang.org/{name}/@latest");
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::Other(format!("go proxy probe failed: {status}")));
        }
        // The module proxy carries no download counters; repository presence
        // is implied by the module path itself resolving.
        Ok(Some(ProbeResult {
            source: format!("go:{name}"),
            downloads: 0,
            version_count: 1,
            has_repository: true,
            selection_reason: None,
        }))
    }
}

pub struct CpanProber {
    client: reqwest::Client,
}

impl CpanProber {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EcosystemProber for CpanProber {
    fn builder(&self) -> &'static str {
        "cpan"
    }

    async fn probe(&self, name: &str) -> Result<Option<ProbeResult>> {
        let url = format!("https://fastapi.metacpan.org/v1/release/{name}");
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::Other(format!("metacpan probe failed: {status}")));
        }
        let body: serde_json::Value = resp.json().await?;
        let has_repository = body.get("resources").and_then(|r| r.get("repository")).is_some();
        Ok(Some(ProbeResult {
            source: format!("cpan:{name}"),
            downloads: 0,
            version_count: 1,
            has_repository,
            selection_reason: None,
        }))
    }
}

pub struct CaskProber {
    client: reqwest::Client,
}

impl CaskProber {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EcosystemProber for CaskProber {
    fn builder(&self) -> &'static str {
        "cask"
    }

    async fn probe(&self, name: &str) -> Result<Option<ProbeResult>> {
        let url = format!("https://formulae.brew.sh/api/cask/{name}.json");
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::Other(format!("cask probe failed: {status}")));
        }
        Ok(Some(ProbeResult {
            source: format!("cask:{name}"),
            downloads: 0,
            version_count: 1,
            has_repository: true,
            selection_reason: None,
        }))
    }
}

pub fn all_builtins(client: reqwest::Client) -> Vec<std::sync::Arc<dyn EcosystemProber>> {
    vec![
        std::sync::Arc::new(HomebrewProber::new(client.clone())),
        std::sync::Arc::new(CargoProber::new(client.clone())),
        std::sync::Arc::new(NpmProber::new(client.clone())),
        std::sync::Arc::new(PypiProber::new(client.clone())),
        std::sync::Arc::new(RubygemsProber::new(client.clone())),
        std::sync::Arc::new(GoProber::new(client.clone())),
        std::sync::Arc::new(CpanProber::new(client.clone())),
        std::sync::Arc::new(CaskProber::new(client)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_helper_maps_404_to_none() {
        let ok: Result<i32> = Ok(1);
        assert_eq!(not_found_as_none(reqwest::StatusCode::NOT_FOUND, ok).unwrap(), None);
    }
}
