// src/cache/versions.rs

//! Version-list cache with TTL (C4 shared layer, §3/§6)
//!
//! One JSON file per source at `cache/versions/<source>.json`:
//! `{source, fetched_at, ttl_seconds, versions: [...]}`. Multi-reader safe;
//! writes land via temp + rename so a reader never observes a partial file.

use crate::error::Result;
use crate::version::VersionEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_TTL_SECONDS: u64 = 3600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionCacheFile {
    pub source: String,
    pub fetched_at: DateTime<Utc>,
    pub ttl_seconds: u64,
    pub versions: Vec<VersionEntry>,
}

pub struct VersionCache {
    root: PathBuf,
}

impl VersionCache {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn path_for(&self, source: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize(source)))
    }

    /// Read a cached entry if present and not yet expired.
    pub fn read_fresh(&self, source: &str) -> Option<Vec<VersionEntry>> {
        let path = self.path_for(source);
        let contents = std::fs::read_to_string(&path).ok()?;
        let file: VersionCacheFile = serde_json::from_str(&contents).ok()?;
        let age = Utc::now().signed_duration_since(file.fetched_at);
        if age.num_seconds() as u64 > file.ttl_seconds {
            None
        } else {
            Some(file.versions)
        }
    }

    /// Write a fresh entry, replacing any existing one atomically.
    pub fn write(&self, source: &str, versions: &[VersionEntry]) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        let file = VersionCacheFile {
            source: source.to_string(),
            fetched_at: Utc::now(),
            ttl_seconds: DEFAULT_TTL_SECONDS,
            versions: versions.to_vec(),
        };
        let body = serde_json::to_string_pretty(&file)?;
        let path = self.path_for(source);
        let tmp = self.root.join(format!(".tmp-{}-{}", sanitize(source), uuid::Uuid::new_v4()));
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

fn sanitize(source: &str) -> String {
    source.replace(['/', ':'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(v: &str) -> VersionEntry {
        VersionEntry { v: v.to_string(), released_at: None, tag: None, lts: false }
    }

    #[test]
    fn write_then_read_fresh_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VersionCache::new(dir.path().to_path_buf());
        cache.write("github:a/b", &[entry("1.0.0"), entry("0.9.0")]).unwrap();

        let got = cache.read_fresh("github:a/b").unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].v, "1.0.0");
    }

    #[test]
    fn expired_entry_is_not_returned() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VersionCache::new(dir.path().to_path_buf());
        let path = cache.path_for("github:a/b");
        let file = VersionCacheFile {
            source: "github:a/b".to_string(),
            fetched_at: Utc::now() - chrono::Duration::hours(2),
            ttl_seconds: 3600,
            versions: vec![entry("1.0.0")],
        };
        std::fs::write(&path, serde_json::to_string(&file).unwrap()).unwrap();

        assert!(cache.read_fresh("github:a/b").is_none());
    }

    #[test]
    fn missing_entry_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VersionCache::new(dir.path().to_path_buf());
        assert!(cache.read_fresh("nothing:here").is_none());
    }
}
