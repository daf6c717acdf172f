// src/host.rs

//! Host descriptor and platform matcher (C2)
//!
//! `Host` is immutable for the lifetime of a run. `matches` evaluates a
//! recipe step's `when`-guard against it; the function is pure and never
//! touches the filesystem or network.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating system identifier, as used in recipe `platform`/`os` tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    Darwin,
    Windows,
}

impl Os {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "linux" => Some(Self::Linux),
            "darwin" | "macos" => Some(Self::Darwin),
            "windows" => Some(Self::Windows),
            _ => None,
        }
    }

    /// Detect the OS this binary is running on.
    pub fn current() -> Self {
        if cfg!(target_os = "linux") {
            Self::Linux
        } else if cfg!(target_os = "macos") {
            Self::Darwin
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Linux
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Darwin => write!(f, "darwin"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

/// CPU architecture, restricted to the set §4.1 validates recipe tuples against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Amd64,
    Arm64,
    #[serde(rename = "386")]
    X86,
}

impl Arch {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "amd64" | "x86_64" | "x64" => Some(Self::Amd64),
            "arm64" | "aarch64" => Some(Self::Arm64),
            "386" | "i386" | "x86" => Some(Self::X86),
            _ => None,
        }
    }

    pub fn current() -> Self {
        if cfg!(target_arch = "x86_64") {
            Self::Amd64
        } else if cfg!(target_arch = "aarch64") {
            Self::Arm64
        } else {
            Self::X86
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Amd64 => write!(f, "amd64"),
            Self::Arm64 => write!(f, "arm64"),
            Self::X86 => write!(f, "386"),
        }
    }
}

/// The Linux distribution family, empty (`None`) on non-Linux hosts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct LinuxFamily(pub Option<String>);

impl LinuxFamily {
    pub fn detect() -> Self {
        if Os::current() != Os::Linux {
            return Self(None);
        }
        let release = std::fs::read_to_string("/etc/os-release").unwrap_or_default();
        let id_like = release
            .lines()
            .find_map(|l| l.strip_prefix("ID_LIKE=").or_else(|| l.strip_prefix("ID=")))
            .map(|v| v.trim_matches('"').split_whitespace().next().unwrap_or(v).to_string());
        Self(id_like)
    }
}

/// Immutable per-run description of the host a recipe installs onto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub os: Os,
    pub arch: Arch,
    pub linux_family: Option<String>,
    pub package_manager: Option<String>,
}

impl Host {
    pub fn detect() -> Self {
        let os = Os::current();
        let linux_family = if os == Os::Linux { LinuxFamily::detect().0 } else { None };
        Self {
            os,
            arch: Arch::current(),
            linux_family,
            package_manager: detect_package_manager(os),
        }
    }

    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch, linux_family: None, package_manager: None }
    }
}

fn detect_package_manager(os: Os) -> Option<String> {
    if os != Os::Linux {
        return None;
    }
    for (bin, name) in [
        ("apt-get", "apt"),
        ("dnf", "dnf"),
        ("yum", "yum"),
        ("pacman", "pacman"),
        ("apk", "apk"),
        ("zypper", "zypper"),
    ] {
        if which::which(bin).is_ok() {
            return Some(name.to_string());
        }
    }
    None
}

/// A step's `when` guard (§3, §4.2). `platform` and `os` are mutually
/// exclusive — enforced at parse time, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WhenGuard {
    pub platform: Vec<(Os, Arch)>,
    pub os: Vec<Os>,
    pub arch: Option<Arch>,
    pub linux_family: Option<String>,
    pub package_manager: Option<String>,
}

impl WhenGuard {
    pub fn is_empty(&self) -> bool {
        self.platform.is_empty()
            && self.os.is_empty()
            && self.arch.is_none()
            && self.linux_family.is_none()
            && self.package_manager.is_none()
    }
}

/// Evaluate a guard against a host. Pure, deterministic, no I/O (§4.2).
///
/// `package_manager` in a guard is a runtime-only hint: it is always
/// considered satisfied here (re-verified by the `require_system` action at
/// execution time), since the scheduler doesn't know yet which package
/// manager variant a step will actually need.
pub fn matches(guard: &WhenGuard, host: &Host) -> bool {
    if guard.is_empty() {
        return true;
    }

    if !guard.platform.is_empty() {
        return guard.platform.iter().any(|(os, arch)| *os == host.os && *arch == host.arch);
    }

    if !guard.os.is_empty() && !guard.os.contains(&host.os) {
        return false;
    }
    if let Some(arch) = guard.arch
        && arch != host.arch
    {
        return false;
    }
    if let Some(family) = &guard.linux_family
        && Some(family.as_str()) != host.linux_family.as_deref()
    {
        return false;
    }
    // package_manager: always true at schedule time (see doc comment above).
    true
}
