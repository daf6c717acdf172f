// src/config.rs

//! Engine configuration (§9 "Global state: None required")
//!
//! `Config` is constructed once by the caller and passed down explicitly;
//! nothing in this crate reaches for a process-global.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_FRESHNESS_THRESHOLD_DAYS: u32 = 30;

/// Tie-break ratio for the disambiguator's "version history" selection rule
/// (§4.9): one candidate's `version_count` must be at least this many times
/// every other candidate's to win on that basis alone.
pub const VERSION_HISTORY_RATIO: u32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the tool tree, `$TSUKU_HOME` or `~/.tsuku` (§3).
    pub tsuku_home: PathBuf,

    pub download_timeout: Duration,
    pub subprocess_timeout: Duration,
    pub prober_timeout: Duration,
    pub disambiguator_deadline: Duration,
    pub version_list_timeout: Duration,

    pub freshness_threshold_days: u32,
}

impl Config {
    /// Build configuration from the environment, per §6's
    /// "Environment variables consumed by the core".
    pub fn from_env() -> std::io::Result<Self> {
        let tsuku_home = match std::env::var_os("TSUKU_HOME") {
            Some(v) => PathBuf::from(v),
            None => dirs::home_dir()
                .ok_or_else(|| std::io::Error::other("could not determine home directory"))?
                .join(".tsuku"),
        };
        Ok(Self::new(tsuku_home))
    }

    /// Build configuration rooted at an explicit path (tests, sandboxes).
    pub fn new(tsuku_home: PathBuf) -> Self {
        Self {
            tsuku_home,
            download_timeout: Duration::from_secs(5 * 60),
            subprocess_timeout: Duration::from_secs(10 * 60),
            prober_timeout: Duration::from_secs(30),
            disambiguator_deadline: Duration::from_secs(30),
            version_list_timeout: Duration::from_secs(15),
            freshness_threshold_days: DEFAULT_FRESHNESS_THRESHOLD_DAYS,
        }
    }

    pub fn tools_dir(&self) -> PathBuf {
        self.tsuku_home.join("tools")
    }

    pub fn libs_dir(&self) -> PathBuf {
        self.tsuku_home.join("libs")
    }

    pub fn apps_dir(&self) -> PathBuf {
        self.tsuku_home.join("apps")
    }

    pub fn current_dir(&self) -> PathBuf {
        self.tools_dir().join("current")
    }

    pub fn downloads_cache_dir(&self) -> PathBuf {
        self.tsuku_home.join("cache").join("downloads")
    }

    pub fn versions_cache_dir(&self) -> PathBuf {
        self.tsuku_home.join("cache").join("versions")
    }

    pub fn keys_cache_dir(&self) -> PathBuf {
        self.tsuku_home.join("cache").join("keys")
    }

    pub fn recipes_dir(&self) -> PathBuf {
        self.tsuku_home.join("recipes")
    }

    pub fn staging_root(&self) -> PathBuf {
        self.tsuku_home.join("tmp")
    }

    pub fn tool_version_dir(&self, tool: &str, version: &str) -> PathBuf {
        self.tools_dir().join(tool).join(version)
    }

    pub fn tool_lock_path(&self, tool: &str) -> PathBuf {
        self.tools_dir().join(tool).join(".lock")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_paths_from_home() {
        let cfg = Config::new(PathBuf::from("/home/u/.tsuku"));
        assert_eq!(cfg.tools_dir(), PathBuf::from("/home/u/.tsuku/tools"));
        assert_eq!(cfg.current_dir(), PathBuf::from("/home/u/.tsuku/tools/current"));
        assert_eq!(cfg.downloads_cache_dir(), PathBuf::from("/home/u/.tsuku/cache/downloads"));
        assert_eq!(cfg.tool_lock_path("rg"), PathBuf::from("/home/u/.tsuku/tools/rg/.lock"));
    }

    #[test]
    fn default_freshness_threshold_is_30_days() {
        let cfg = Config::new(PathBuf::from("/tmp/x"));
        assert_eq!(cfg.freshness_threshold_days, 30);
    }
}
