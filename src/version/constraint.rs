// src/version/constraint.rs

//! Constraint parsing and resolution against a provider's version list (C5)

use super::{parse_key, normalize, VersionEntry};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// How a recipe's versions are ordered, declared in `metadata.version_format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VersionFormat {
    #[default]
    Semver,
    Calver,
    Opaque,
}

/// A parsed user-facing version constraint (§4.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// `latest` — first element of the provider's (newest-first) list.
    Latest,
    /// An exact literal, e.g. `1.2.3`.
    Exact(String),
    /// A semver range expression, e.g. `^1.2`, `>=1.0, <2.0`.
    Range(String),
    /// An ecosystem alias resolved via provider release metadata, e.g. `@LTS`.
    Alias(String),
}

impl Constraint {
    /// Parse the constraint string a user or dependency entry supplies.
    /// `None`/empty input means "no constraint" (defaults to `Latest`).
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(s) = raw else { return Constraint::Latest };
        if s.is_empty() || s == "latest" {
            return Constraint::Latest;
        }
        if let Some(alias) = s.strip_prefix('@') {
            return Constraint::Alias(alias.to_string());
        }
        if looks_like_range(s) {
            return Constraint::Range(s.to_string());
        }
        Constraint::Exact(s.to_string())
    }

    pub fn display(&self) -> String {
        match self {
            Constraint::Latest => "latest".to_string(),
            Constraint::Exact(s) => s.clone(),
            Constraint::Range(s) => s.clone(),
            Constraint::Alias(s) => format!("@{s}"),
        }
    }
}

fn looks_like_range(s: &str) -> bool {
    s.contains(',') || s.starts_with(['^', '~', '>', '<', '=']) || s.contains('*')
}

/// Resolve `constraint` against `candidates` (newest-first, per C4) under the
/// given ordering format. Returns the chosen concrete version string.
pub fn resolve(
    tool: &str,
    constraint: &Constraint,
    candidates: &[VersionEntry],
    format: VersionFormat,
) -> Result<String> {
    if candidates.is_empty() {
        return Err(Error::NoMatchingVersion {
            tool: tool.to_string(),
            constraint: constraint.display(),
            candidates: Vec::new(),
        });
    }

    match constraint {
        Constraint::Latest => Ok(candidates[0].v.clone()),

        Constraint::Exact(want) => {
            let want_norm = normalize(want);
            candidates
                .iter()
                .find(|c| normalize(&c.v) == want_norm)
                .map(|c| c.v.clone())
                .ok_or_else(|| Error::NoMatchingVersion {
                    tool: tool.to_string(),
                    constraint: constraint.display(),
                    candidates: candidates.iter().map(|c| c.v.clone()).collect(),
                })
        }

        Constraint::Alias(name) => {
            if name.eq_ignore_ascii_case("lts") {
                candidates
                    .iter()
                    .find(|c| c.lts)
                    .map(|c| c.v.clone())
                    .ok_or_else(|| Error::ConstraintNotSupported {
                        constraint: constraint.display(),
                        reason: "provider does not carry LTS metadata".to_string(),
                    })
            } else {
                Err(Error::ConstraintNotSupported {
                    constraint: constraint.display(),
                    reason: format!("unknown alias '@{name}'"),
                })
            }
        }

        Constraint::Range(expr) => resolve_range(tool, expr, candidates, format),
    }
}

fn resolve_range(
    tool: &str,
    expr: &str,
    candidates: &[VersionEntry],
    format: VersionFormat,
) -> Result<String> {
    match format {
        VersionFormat::Semver => resolve_semver_range(tool, expr, candidates),
        VersionFormat::Calver => resolve_ordered_range(tool, expr, candidates, format),
        VersionFormat::Opaque => Err(Error::ConstraintNotSupported {
            constraint: expr.to_string(),
            reason: "opaque version format allows only exact constraints".to_string(),
        }),
    }
}

fn resolve_semver_range(
    tool: &str,
    expr: &str,
    candidates: &[VersionEntry],
) -> Result<String> {
    let req = semver::VersionReq::parse(expr).map_err(|e| Error::ConstraintNotSupported {
        constraint: expr.to_string(),
        reason: format!("invalid range expression: {e}"),
    })?;

    let mut best: Option<(&VersionEntry, semver::Version)> = None;
    for c in candidates {
        let Ok(super::VersionKey::Semver(v)) = parse_key(&c.v, VersionFormat::Semver) else {
            continue;
        };
        if req.matches(&v) && best.as_ref().map(|(_, b)| v > *b).unwrap_or(true) {
            best = Some((c, v));
        }
    }

    best.map(|(c, _)| c.v.clone()).ok_or_else(|| Error::NoMatchingVersion {
        tool: tool.to_string(),
        constraint: expr.to_string(),
        candidates: candidates.iter().map(|c| c.v.clone()).collect(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Ge,
    Le,
    Gt,
    Lt,
    Eq,
}

/// A comma-separated list of comparators (e.g. `>=2024.1, <2025.1`) resolved
/// against the zero-padded `VersionKey` ordering §4.5 rule 3 describes for
/// calver. Each candidate must satisfy every comparator; the greatest
/// satisfying candidate wins, matching the semver-range tie-break rule.
fn resolve_ordered_range(
    tool: &str,
    expr: &str,
    candidates: &[VersionEntry],
    format: VersionFormat,
) -> Result<String> {
    let comparators: Vec<(CompareOp, super::VersionKey)> = expr
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_comparator(s, format))
        .collect::<Result<_>>()?;

    if comparators.is_empty() {
        return Err(Error::ConstraintNotSupported {
            constraint: expr.to_string(),
            reason: "empty range expression".to_string(),
        });
    }

    let mut best: Option<(&VersionEntry, super::VersionKey)> = None;
    for c in candidates {
        let Ok(key) = parse_key(&c.v, format) else { continue };
        let satisfies = comparators.iter().all(|(op, bound)| match op {
            CompareOp::Ge => key >= *bound,
            CompareOp::Le => key <= *bound,
            CompareOp::Gt => key > *bound,
            CompareOp::Lt => key < *bound,
            CompareOp::Eq => key == *bound,
        });
        if satisfies && best.as_ref().map(|(_, b)| key > *b).unwrap_or(true) {
            best = Some((c, key));
        }
    }

    best.map(|(c, _)| c.v.clone()).ok_or_else(|| Error::NoMatchingVersion {
        tool: tool.to_string(),
        constraint: expr.to_string(),
        candidates: candidates.iter().map(|c| c.v.clone()).collect(),
    })
}

fn parse_comparator(s: &str, format: VersionFormat) -> Result<(CompareOp, super::VersionKey)> {
    let (op, rest) = if let Some(r) = s.strip_prefix(">=") {
        (CompareOp::Ge, r)
    } else if let Some(r) = s.strip_prefix("<=") {
        (CompareOp::Le, r)
    } else if let Some(r) = s.strip_prefix('>') {
        (CompareOp::Gt, r)
    } else if let Some(r) = s.strip_prefix('<') {
        (CompareOp::Lt, r)
    } else if let Some(r) = s.strip_prefix('=') {
        (CompareOp::Eq, r)
    } else {
        (CompareOp::Eq, s)
    };
    let key = parse_key(rest.trim(), format).map_err(|_| Error::ConstraintNotSupported {
        constraint: s.to_string(),
        reason: format!("invalid comparator bound '{}'", rest.trim()),
    })?;
    Ok((op, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(vs: &[&str]) -> Vec<VersionEntry> {
        vs.iter()
            .map(|v| VersionEntry { v: v.to_string(), released_at: None, tag: None, lts: false })
            .collect()
    }

    #[test]
    fn parse_recognizes_shapes() {
        assert_eq!(Constraint::parse(None), Constraint::Latest);
        assert_eq!(Constraint::parse(Some("latest")), Constraint::Latest);
        assert_eq!(Constraint::parse(Some("@LTS")), Constraint::Alias("LTS".into()));
        assert_eq!(Constraint::parse(Some("^1.2")), Constraint::Range("^1.2".into()));
        assert_eq!(Constraint::parse(Some("1.2.3")), Constraint::Exact("1.2.3".into()));
    }

    #[test]
    fn latest_picks_first_element() {
        let c = entries(&["3.0.0", "2.0.0", "1.0.0"]);
        let got = resolve("x", &Constraint::Latest, &c, VersionFormat::Semver).unwrap();
        assert_eq!(got, "3.0.0");
    }

    #[test]
    fn exact_matches_normalized() {
        let c = entries(&["v1.2.3", "v1.2.4"]);
        let got = resolve("x", &Constraint::Exact("1.2.3".into()), &c, VersionFormat::Semver).unwrap();
        assert_eq!(got, "v1.2.3");
    }

    #[test]
    fn range_picks_greatest_match() {
        let c = entries(&["2.0.0", "1.5.0", "1.2.0", "1.0.0"]);
        let got = resolve("x", &Constraint::Range("^1".into()), &c, VersionFormat::Semver).unwrap();
        assert_eq!(got, "1.5.0");
    }

    #[test]
    fn calver_range_resolves_via_zero_padded_ordering() {
        let c = entries(&["2024.9", "2024.10", "2024.2", "2023.12"]);
        let got =
            resolve("x", &Constraint::Range(">=2024.1, <2025".into()), &c, VersionFormat::Calver)
                .unwrap();
        assert_eq!(got, "2024.10");
    }

    #[test]
    fn range_on_opaque_is_unsupported() {
        let c = entries(&["nightly-2024"]);
        let err = resolve("x", &Constraint::Range("^1".into()), &c, VersionFormat::Opaque).unwrap_err();
        assert!(matches!(err, Error::ConstraintNotSupported { .. }));
    }

    #[test]
    fn lts_alias_requires_metadata() {
        let mut c = entries(&["1.0.0", "2.0.0"]);
        c[1].lts = true;
        let got = resolve("x", &Constraint::Alias("LTS".into()), &c, VersionFormat::Semver).unwrap();
        assert_eq!(got, "2.0.0");

        let none_lts = entries(&["1.0.0"]);
        let err = resolve("x", &Constraint::Alias("LTS".into()), &none_lts, VersionFormat::Semver)
            .unwrap_err();
        assert!(matches!(err, Error::ConstraintNotSupported { .. }));
    }

    #[test]
    fn empty_candidates_is_no_matching_version() {
        let err = resolve("x", &Constraint::Latest, &[], VersionFormat::Semver).unwrap_err();
        assert!(matches!(err, Error::NoMatchingVersion { .. }));
    }
}
