// src/recipe/format.rs

//! Recipe data model and TOML deserialization (§3, §6)
//!
//! The on-disk format is TOML: three top-level tables (`metadata`, `version`,
//! `verify`) and an array-of-tables for `steps`. Several fields accept either
//! a bare scalar or a list as shorthand (`when.os = "linux"` == `["linux"]`);
//! those use a `deserialize_with` helper since `#[serde(default)]` alone can't
//! normalize both optionality and scalar-vs-vec at once. A step's `when`
//! guard deserializes into `RawWhenGuard` (strings, always succeeds) rather
//! than failing on an invalid `os`/`arch` token during `toml::from_str` —
//! token validation happens in `build_when_guard`, called from
//! `parser::parse_str`, so a bad token joins every other structural
//! violation in one aggregated `InvalidRecipe`.

use crate::host::{Arch, Os, WhenGuard};
use crate::version::VersionFormat;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

/// A fully parsed, immutable recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub path: PathBuf,
    pub metadata: Metadata,
    pub version: VersionSource,
    pub steps: Vec<Step>,
    pub verify: VerifySpec,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Metadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub version_format: VersionFormat,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many_opt")]
    pub supported_os: Option<Vec<Os>>,
    #[serde(default)]
    pub satisfies: std::collections::HashMap<String, String>,
    #[serde(default)]
    pub r#type: RecipeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecipeType {
    #[default]
    Tool,
    Library,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VersionSource {
    pub source: String,
    #[serde(default)]
    pub tag_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VerifySpec {
    pub command: String,
    #[serde(default)]
    pub pattern: Option<String>,
}

/// One step in the install pipeline. `params` holds action-specific
/// key/value data; the executor validates it per action (§4.6).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Step {
    pub action: String,
    /// Guard as written in the recipe: scalar-or-vec normalized, but tokens
    /// (`os`/`arch`/platform tuples) not yet validated — that happens in
    /// `parser::validate`, which aggregates every bad token into one
    /// `InvalidRecipe` alongside every other structural violation.
    #[serde(rename = "when", default)]
    pub when_raw: RawWhenGuard,
    /// Built from `when_raw` once validated; empty (matches everything)
    /// until `parser::parse_str` populates it.
    #[serde(skip)]
    pub when: WhenGuard,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub params: toml::Table,
}

/// A step's `when` guard exactly as written: strings, not yet validated
/// against the closed `Os`/`Arch` vocabularies.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawWhenGuard {
    #[serde(default, deserialize_with = "one_or_many_opt")]
    pub platform: Option<Vec<String>>,
    #[serde(default, deserialize_with = "one_or_many_opt")]
    pub os: Option<Vec<String>>,
    #[serde(default)]
    pub arch: Option<String>,
    #[serde(default)]
    pub linux_family: Option<String>,
    #[serde(default)]
    pub package_manager: Option<String>,
}

// -- TOML raw form for Recipe, then converted into the public model --

#[derive(Debug, Deserialize)]
pub(crate) struct RawRecipe {
    pub metadata: Metadata,
    pub version: VersionSource,
    pub verify: VerifySpec,
    #[serde(default, rename = "steps")]
    pub steps: Vec<Step>,
}

impl RawRecipe {
    pub fn into_recipe(self, path: PathBuf) -> Recipe {
        Recipe {
            path,
            metadata: self.metadata,
            version: self.version,
            steps: self.steps,
            verify: self.verify,
        }
    }
}

/// Accepts either a bare string or a list of strings; normalizes to `Vec<T>`.
fn one_or_many<'de, D, T>(de: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        One(T),
        Many(Vec<T>),
    }
    Ok(match OneOrMany::<T>::deserialize(de)? {
        OneOrMany::One(v) => vec![v],
        OneOrMany::Many(v) => v,
    })
}

fn one_or_many_opt<'de, D, T>(de: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(one_or_many(de)?))
}

/// `"linux/amd64"` parsed into an `(Os, Arch)` tuple for `when.platform`.
fn parse_platform_tuple(s: &str) -> Option<(Os, Arch)> {
    let (os, arch) = s.split_once('/')?;
    Some((Os::parse(os)?, Arch::parse(arch)?))
}

/// Convert one step's raw guard into a typed `WhenGuard`, pushing a reason
/// string onto `reasons` for each token that doesn't match its closed
/// vocabulary (§4.1 rule d) instead of failing on the first bad token.
/// Invalid entries are dropped from the returned guard; callers only use the
/// result when `reasons` stays empty, since `parse_str` fails the whole
/// recipe otherwise.
pub(crate) fn build_when_guard(raw: &RawWhenGuard, step_index: usize, reasons: &mut Vec<String>) -> WhenGuard {
    let platform = raw
        .platform
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .filter_map(|s| match parse_platform_tuple(s) {
            Some(tuple) => Some(tuple),
            None => {
                reasons.push(format!("step {step_index}: invalid platform tuple '{s}'"));
                None
            }
        })
        .collect();

    let os = raw
        .os
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .filter_map(|s| match Os::parse(s) {
            Some(os) => Some(os),
            None => {
                reasons.push(format!("step {step_index}: invalid os '{s}'"));
                None
            }
        })
        .collect();

    let arch = raw.arch.as_deref().and_then(|s| match Arch::parse(s) {
        Some(arch) => Some(arch),
        None => {
            reasons.push(format!("step {step_index}: invalid arch '{s}'"));
            None
        }
    });

    WhenGuard {
        platform,
        os,
        arch,
        linux_family: raw.linux_family.clone(),
        package_manager: raw.package_manager.clone(),
    }
}
