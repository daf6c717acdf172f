// src/version/mod.rs

//! Version ordering and constraint resolution (C5)

mod constraint;
pub mod provider;
pub mod providers;

pub use constraint::{Constraint, VersionFormat};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A single entry from a provider's version list (§3, version-cache JSON).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub v: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub released_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub lts: bool,
}

/// Parse a version string for ordering comparisons, according to a
/// recipe's declared `version_format`. Returns an opaque, comparable key —
/// callers never need to inspect its internals, only compare two keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum VersionKey {
    Semver(semver::Version),
    Calver(Vec<ZeroPadded>),
    Opaque(String),
}

/// A calver field normalized for lexicographic ordering: numeric fields are
/// zero-padded to a fixed width so `"2"` sorts before `"10"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ZeroPadded(String);

impl ZeroPadded {
    fn from_field(field: &str) -> Self {
        match field.parse::<u64>() {
            Ok(n) => Self(format!("{n:020}")),
            Err(_) => Self(field.to_string()),
        }
    }
}

/// Parse a raw version string into a comparable key under `format`.
///
/// Semver parsing tolerates a leading `v` (common in release tags, e.g.
/// `v1.2.3`) by stripping it before handing off to the `semver` crate.
pub fn parse_key(raw: &str, format: VersionFormat) -> Result<VersionKey> {
    match format {
        VersionFormat::Semver => {
            let stripped = raw.strip_prefix('v').unwrap_or(raw);
            semver::Version::parse(stripped)
                .map(VersionKey::Semver)
                .map_err(|e| Error::ConstraintNotSupported {
                    constraint: raw.to_string(),
                    reason: format!("not valid semver: {e}"),
                })
        }
        VersionFormat::Calver => Ok(VersionKey::Calver(
            raw.split(['.', '-']).map(ZeroPadded::from_field).collect(),
        )),
        VersionFormat::Opaque => Ok(VersionKey::Opaque(raw.to_string())),
    }
}

/// Normalize a version string for exact-literal equality comparison (§4.5
/// rule 2): strips a leading `v`, otherwise compares verbatim.
pub fn normalize(raw: &str) -> &str {
    raw.strip_prefix('v').unwrap_or(raw)
}
