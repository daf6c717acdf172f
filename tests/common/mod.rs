// tests/common/mod.rs
//
// Shared fixtures for integration tests. Not a test binary itself — each
// `tests/*.rs` file pulls this in with `mod common;`.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tsuku::disambiguate::prober::{EcosystemProber, ProbeResult};
use tsuku::host::Host;
use tsuku::Result;

/// A minimal `ActionContext` rooted at `staging_dir`, with a fresh content
/// cache and HTTP client, for exercising actions against a real staging
/// directory without a live `InstallationManager`.
pub fn action_ctx(staging_dir: PathBuf, host: Host, tool: &str) -> tsuku::actions::ActionContext {
    tsuku::actions::ActionContext {
        staging_dir: staging_dir.clone(),
        host,
        tool: tool.to_string(),
        version: "1.0.0".to_string(),
        content_cache: Arc::new(tsuku::cache::ContentCache::new(
            staging_dir.join("cache"),
            reqwest::Client::new(),
        )),
        client: reqwest::Client::new(),
        config: Arc::new(tsuku::Config::new(staging_dir.join("home"))),
    }
}

/// A stub `EcosystemProber` returning a fixed, canned result (or `NotFound`)
/// for any probe, so disambiguation tests never touch the network.
pub struct FakeProber {
    pub builder: &'static str,
    pub result: Option<ProbeResult>,
}

#[async_trait]
impl EcosystemProber for FakeProber {
    fn builder(&self) -> &'static str {
        self.builder
    }

    async fn probe(&self, _name: &str) -> Result<Option<ProbeResult>> {
        Ok(self.result.clone())
    }
}

pub fn fake(builder: &'static str, downloads: u64, version_count: u32, has_repository: bool) -> Arc<dyn EcosystemProber> {
    Arc::new(FakeProber {
        builder,
        result: Some(ProbeResult {
            source: format!("{builder}:thing"),
            downloads,
            version_count,
            has_repository,
            selection_reason: None,
        }),
    })
}

pub fn not_found(builder: &'static str) -> Arc<dyn EcosystemProber> {
    Arc::new(FakeProber { builder, result: None })
}
