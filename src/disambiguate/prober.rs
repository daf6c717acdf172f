// src/disambiguate/prober.rs

//! Ecosystem prober trait (C8)

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Read-only result of probing one ecosystem for a tool name (§4.8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub source: String,
    pub downloads: u64,
    pub version_count: u32,
    pub has_repository: bool,
    pub selection_reason: Option<String>,
}

/// One ecosystem's read-only probe. Each implementation enforces its own
/// per-host rate limit and request timeout (default 30s, applied by the
/// caller via `tokio::time::timeout`).
#[async_trait]
pub trait EcosystemProber: Send + Sync {
    /// Builder identifier used in `QueueEntry.source` and priority tie-breaks.
    fn builder(&self) -> &'static str;

    /// Probe for `name`. `Ok(None)` means "not found in this ecosystem"
    /// (§4.9 step 3a "Drop probers returning NotFound").
    async fn probe(&self, name: &str) -> Result<Option<ProbeResult>>;
}
