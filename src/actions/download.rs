// src/actions/download.rs

use super::{require_str, Action, ActionContext};
use crate::error::{Error, Result};
use async_trait::async_trait;

/// `download`: fetch `url` into `staging/downloads/<basename>`, verifying
/// `sha256` when supplied (required on non-library recipes, enforced by the
/// installation manager rather than here).
pub struct Download;

#[async_trait]
impl Action for Download {
    async fn execute(&self, ctx: &ActionContext, params: &toml::Table) -> Result<()> {
        let url = ctx.substitute(require_str(params, "url", "download")?);
        let sha256 = params.get("sha256").and_then(|v| v.as_str());

        let cached = ctx.content_cache.fetch(&url, sha256).await?;

        let basename = url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::UserError {
                action: "download".to_string(),
                reason: format!("cannot derive a filename from url '{url}'"),
            })?;

        let dest_dir = ctx.downloads_dir();
        std::fs::create_dir_all(&dest_dir)?;
        let dest = dest_dir.join(basename);
        std::fs::copy(&cached, &dest)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Arch, Host, Os};
    use std::path::PathBuf;
    use std::sync::Arc;

    #[tokio::test]
    async fn derives_basename_and_copies_into_downloads() {
        let staging = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(crate::cache::ContentCache::new(
            cache_dir.path().to_path_buf(),
            reqwest::Client::new(),
        ));

        let data = b"archive bytes";
        let hash = crate::hash::sha256(data);
        cache.put(data, &hash).await.unwrap();

        let ctx = ActionContext {
            staging_dir: staging.path().to_path_buf(),
            host: Host::new(Os::Linux, Arch::Amd64),
            tool: "x".to_string(),
            version: "1.0.0".to_string(),
            content_cache: cache,
            client: reqwest::Client::new(),
            config: Arc::new(crate::config::Config::new(PathBuf::from("/tmp"))),
        };

        let mut params = toml::Table::new();
        params.insert("url".to_string(), toml::Value::String("https://x.test/pkg.tar.gz".into()));
        params.insert("sha256".to_string(), toml::Value::String(hash));

        Download.execute(&ctx, &params).await.unwrap();
        assert!(staging.path().join("downloads/pkg.tar.gz").exists());
    }
}
