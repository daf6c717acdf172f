// src/cache/content.rs

//! Content-addressed cache (C3)
//!
//! Keyed by SHA-256. `cache/downloads/<sha256>` holds the verified bytes.
//! Concurrent `fetch()` calls for the same hash coalesce onto one in-flight
//! download via a broadcast channel, the same singleflight shape the
//! teacher's request coalescer uses for upstream metadata fetches.

use crate::error::{Error, Result};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

type Coalesced = broadcast::Sender<Result<PathBuf, String>>;

pub struct ContentCache {
    root: PathBuf,
    client: reqwest::Client,
    inflight: DashMap<String, Coalesced>,
}

impl ContentCache {
    pub fn new(root: PathBuf, client: reqwest::Client) -> Self {
        Self { root, client, inflight: DashMap::new() }
    }

    fn path_for(&self, hash: &str) -> PathBuf {
        self.root.join(hash)
    }

    /// Returns `Some(path)` if an entry for `hash` exists and its recomputed
    /// hash still matches its filename — "the cache never lies" (§4.3).
    async fn verified_existing(&self, hash: &str) -> Result<Option<PathBuf>> {
        let path = self.path_for(hash);
        if !path.exists() {
            return Ok(None);
        }
        let actual = hash_file(&path).await?;
        if actual == hash {
            Ok(Some(path))
        } else {
            warn!(%hash, %actual, "cache entry hash mismatch, treating as absent");
            let _ = tokio::fs::remove_file(&path).await;
            Ok(None)
        }
    }

    /// Fetch `url`, verifying against `expected_sha256` when supplied.
    /// Concurrent callers for the same hash share one download.
    pub async fn fetch(&self, url: &str, expected_sha256: Option<&str>) -> Result<PathBuf> {
        if let Some(hash) = expected_sha256
            && let Some(path) = self.verified_existing(hash).await?
        {
            debug!(%hash, "content cache hit");
            return Ok(path);
        }

        let key = expected_sha256.map(str::to_string).unwrap_or_else(|| url.to_string());

        // Join an in-flight download for this key, if any.
        if let Some(tx) = self.inflight.get(&key) {
            let mut rx = tx.subscribe();
            drop(tx);
            return rx.recv().await.map_err(|e| Error::Other(e.to_string()))?.map_err(Error::Other);
        }

        let (tx, _rx) = broadcast::channel(1);
        self.inflight.insert(key.clone(), tx.clone());

        let result = self.download_and_verify(url, expected_sha256).await;
        self.inflight.remove(&key);

        let broadcastable = result.as_ref().map(|p| p.clone()).map_err(|e| e.to_string());
        let _ = tx.send(broadcastable);
        result
    }

    async fn download_and_verify(&self, url: &str, expected_sha256: Option<&str>) -> Result<PathBuf> {
        info!(%url, "downloading");
        std::fs::create_dir_all(&self.root)?;

        let tmp = self.root.join(format!(".tmp-{}", uuid::Uuid::new_v4()));
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(Error::Other(format!("download failed: {} ({url})", resp.status())));
        }

        let mut file = tokio::fs::File::create(&tmp).await?;
        let mut hasher = Sha256::new();
        let mut stream = resp.bytes_stream();
        use futures_util::StreamExt;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            hasher.update(&chunk);
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        let actual = hex::encode(hasher.finalize());
        if let Some(expected) = expected_sha256
            && expected != actual
        {
            let _ = std::fs::remove_file(&tmp);
            return Err(Error::ChecksumMismatch {
                url: url.to_string(),
                expected: expected.to_string(),
                actual,
            });
        }

        let final_path = self.path_for(&actual);
        std::fs::rename(&tmp, &final_path)?;
        Ok(final_path)
    }

    /// Store `bytes` directly, verifying against `expected_sha256`.
    pub async fn put(&self, bytes: &[u8], expected_sha256: &str) -> Result<PathBuf> {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let actual = hex::encode(hasher.finalize());
        if actual != expected_sha256 {
            return Err(Error::ChecksumMismatch {
                url: "<inline>".to_string(),
                expected: expected_sha256.to_string(),
                actual,
            });
        }

        std::fs::create_dir_all(&self.root)?;
        let tmp = self.root.join(format!(".tmp-{}", uuid::Uuid::new_v4()));
        std::fs::write(&tmp, bytes)?;
        let final_path = self.path_for(&actual);
        std::fs::rename(&tmp, &final_path)?;
        Ok(final_path)
    }
}

async fn hash_file(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_verifies_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ContentCache::new(dir.path().to_path_buf(), reqwest::Client::new());
        let data = b"hello world";
        let mut hasher = Sha256::new();
        hasher.update(data);
        let hash = hex::encode(hasher.finalize());

        let path = cache.put(data, &hash).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), data);
    }

    #[tokio::test]
    async fn put_rejects_mismatched_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ContentCache::new(dir.path().to_path_buf(), reqwest::Client::new());
        let err = cache.put(b"hello", "deadbeef").await.unwrap_err();
        assert!(matches!(err, Error::ChecksumMismatch { .. }));
    }

    #[tokio::test]
    async fn stale_entry_with_wrong_hash_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ContentCache::new(dir.path().to_path_buf(), reqwest::Client::new());
        let fake_hash = "a".repeat(64);
        std::fs::write(dir.path().join(&fake_hash), b"corrupted").unwrap();

        let existing = cache.verified_existing(&fake_hash).await.unwrap();
        assert!(existing.is_none());
        assert!(!dir.path().join(&fake_hash).exists());
    }
}
