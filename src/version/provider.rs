// src/version/provider.rs

//! Version provider trait and registry (C4)

use super::VersionEntry;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// One ecosystem's version source. Implementations are pure w.r.t. input +
/// upstream state; retries/caching are handled by the caller (the content
/// cache layer wraps `list_versions` with a TTL, per C4).
#[async_trait]
pub trait VersionProvider: Send + Sync {
    /// Scheme this provider handles, e.g. `"github"`, `"crates_io"`, `"npm"`.
    fn scheme(&self) -> &'static str;

    /// List versions for `source_id` (the part after the scheme prefix),
    /// newest first.
    async fn list_versions(&self, source_id: &str) -> Result<Vec<VersionEntry>>;

    /// Resolve a bare tool name to this provider's source id, for the
    /// disambiguator (§4.4). Default: identity.
    async fn resolve_source(&self, name: &str) -> Result<String> {
        Ok(name.to_string())
    }

    /// Platform-specific asset URL, for providers that know their own
    /// artifact layout (github-release, homebrew-bottle). Default: not
    /// supported by this provider.
    async fn asset_url(
        &self,
        _source_id: &str,
        _version: &str,
        _os: crate::host::Os,
        _arch: crate::host::Arch,
    ) -> Result<Option<String>> {
        Ok(None)
    }
}

/// A `scheme:identifier` version source reference, as declared in a
/// recipe's `version.source` field (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub scheme: String,
    pub id: String,
}

impl SourceRef {
    pub fn parse(raw: &str) -> Result<Self> {
        let (scheme, id) = raw.split_once(':').ok_or_else(|| Error::SourceNotFound {
            source_id: raw.to_string(),
        })?;
        Ok(Self { scheme: scheme.to_string(), id: id.to_string() })
    }
}

/// Registry of providers keyed by scheme, populated once at startup.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<&'static str, Arc<dyn VersionProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn VersionProvider>) {
        self.providers.insert(provider.scheme(), provider);
    }

    pub fn get(&self, scheme: &str) -> Result<Arc<dyn VersionProvider>> {
        self.providers
            .get(scheme)
            .cloned()
            .ok_or_else(|| Error::SourceNotFound { source_id: scheme.to_string() })
    }

    /// Build the registry with the full built-in ecosystem set (§2 C4).
    pub fn with_builtins(client: reqwest::Client) -> Self {
        let mut reg = Self::new();
        reg.register(Arc::new(super::providers::GithubReleaseProvider::new(client.clone())));
        reg.register(Arc::new(super::providers::CratesIoProvider::new(client.clone())));
        reg.register(Arc::new(super::providers::NpmProvider::new(client.clone())));
        reg.register(Arc::new(super::providers::PypiProvider::new(client.clone())));
        reg.register(Arc::new(super::providers::RubygemsProvider::new(client.clone())));
        reg.register(Arc::new(super::providers::GoProxyProvider::new(client.clone())));
        reg.register(Arc::new(super::providers::CpanProvider::new(client.clone())));
        reg.register(Arc::new(super::providers::HomebrewProvider::new(client.clone())));
        reg.register(Arc::new(super::providers::CaskProvider::new(client)));
        reg
    }
}
