// src/recipe/parser.rs

//! Structural validation (C1, §4.1). Parsing is pure: no filesystem access
//! beyond the caller having already read the file into `contents`.

use super::format::{RawRecipe, Recipe};
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9._+-]*$").unwrap());

/// The closed set of actions C6 implements.
const KNOWN_ACTIONS: &[&str] = &[
    "download",
    "extract",
    "github_archive",
    "github_release",
    "homebrew_bottle",
    "cargo_install",
    "gem_install",
    "npm_install",
    "pipx_install",
    "go_install",
    "cpan_install",
    "apk_install",
    "install_binaries",
    "install_libraries",
    "run_command",
    "require_system",
];

/// Parse and validate a recipe's TOML text. Collects every structural
/// violation rather than stopping at the first (§4.1) — including invalid
/// `when`-guard tokens, which would otherwise surface as an opaque TOML
/// parse error before any other violation could be reported.
pub fn parse_str(contents: &str, path: &Path) -> Result<Recipe> {
    let raw: RawRecipe = toml::from_str(contents)?;
    let mut recipe = raw.into_recipe(path.to_path_buf());

    let mut reasons = Vec::new();
    for (i, step) in recipe.steps.iter_mut().enumerate() {
        step.when = super::format::build_when_guard(&step.when_raw, i, &mut reasons);
    }
    reasons.extend(validate(&recipe));

    if !reasons.is_empty() {
        return Err(Error::InvalidRecipe { path: path.to_path_buf(), reasons });
    }
    Ok(recipe)
}

pub fn parse_file(path: &Path) -> Result<Recipe> {
    let contents = std::fs::read_to_string(path)?;
    parse_str(&contents, path)
}

fn validate(recipe: &Recipe) -> Vec<String> {
    let mut reasons = Vec::new();

    if !NAME_RE.is_match(&recipe.metadata.name) {
        reasons.push(format!(
            "metadata.name '{}' must match ^[a-z0-9][a-z0-9._+-]*$",
            recipe.metadata.name
        ));
    }

    for dep in &recipe.metadata.dependencies {
        if !NAME_RE.is_match(dep) {
            reasons.push(format!("dependency name '{dep}' is malformed"));
        }
    }

    if recipe.verify.command.trim().is_empty() {
        reasons.push("verify.command must be non-empty".to_string());
    }

    for (i, step) in recipe.steps.iter().enumerate() {
        if !KNOWN_ACTIONS.contains(&step.action.as_str()) {
            reasons.push(format!("step {i}: unknown action '{}'", step.action));
        }

        let has_platform = step.when_raw.platform.as_ref().is_some_and(|v| !v.is_empty());
        let has_os = step.when_raw.os.as_ref().is_some_and(|v| !v.is_empty());
        if has_platform && has_os {
            reasons.push(format!("step {i}: when.platform and when.os are mutually exclusive"));
        }

        if let Some(supported) = &recipe.metadata.supported_os {
            let guard_oss: Vec<_> = if !step.when.platform.is_empty() {
                step.when.platform.iter().map(|(os, _)| *os).collect()
            } else {
                step.when.os.clone()
            };
            for os in guard_oss {
                if !supported.contains(&os) {
                    reasons.push(format!(
                        "step {i}: when-guard os '{os}' is not in metadata.supported_os"
                    ));
                }
            }
        }
    }

    reasons
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> PathBuf {
        PathBuf::from("test.toml")
    }

    #[test]
    fn rejects_bad_name() {
        let toml_str = r#"
[metadata]
name = "Bad Name!"

[version]
source = "github:a/b"

[verify]
command = "x"
"#;
        let err = parse_str(toml_str, &path()).unwrap_err();
        match err {
            Error::InvalidRecipe { reasons, .. } => {
                assert!(reasons.iter().any(|r| r.contains("metadata.name")));
            }
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn rejects_unknown_action() {
        let toml_str = r#"
[metadata]
name = "x"

[version]
source = "github:a/b"

[verify]
command = "x --version"

[[steps]]
action = "teleport"
"#;
        let err = parse_str(toml_str, &path()).unwrap_err();
        match err {
            Error::InvalidRecipe { reasons, .. } => {
                assert!(reasons.iter().any(|r| r.contains("unknown action")));
            }
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn rejects_mutually_exclusive_guard() {
        let toml_str = r#"
[metadata]
name = "x"

[version]
source = "github:a/b"

[verify]
command = "x --version"

[[steps]]
action = "download"
when = { platform = ["linux/amd64"], os = "linux" }
"#;
        let err = parse_str(toml_str, &path()).unwrap_err();
        match err {
            Error::InvalidRecipe { reasons, .. } => {
                assert!(reasons.iter().any(|r| r.contains("mutually exclusive")));
            }
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn rejects_invalid_platform_tuple() {
        let toml_str = r#"
[metadata]
name = "x"

[version]
source = "github:a/b"

[verify]
command = "x --version"

[[steps]]
action = "download"
when = { platform = ["solaris/sparc"] }
"#;
        let err = parse_str(toml_str, &path()).unwrap_err();
        match err {
            Error::InvalidRecipe { reasons, .. } => {
                assert!(reasons.iter().any(|r| r.contains("invalid platform tuple")));
            }
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn aggregates_bad_guard_token_alongside_other_violations() {
        // A bad when.os token and a bad metadata.name both appear in the
        // same recipe; both must be reported, not just whichever the TOML
        // deserializer happens to hit first.
        let toml_str = r#"
[metadata]
name = "Bad Name!"

[version]
source = "github:a/b"

[verify]
command = "x --version"

[[steps]]
action = "download"
when = { os = "plan9" }
"#;
        let err = parse_str(toml_str, &path()).unwrap_err();
        match err {
            Error::InvalidRecipe { reasons, .. } => {
                assert!(reasons.iter().any(|r| r.contains("metadata.name")));
                assert!(reasons.iter().any(|r| r.contains("invalid os 'plan9'")));
            }
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn accepts_well_formed_recipe() {
        let toml_str = r#"
[metadata]
name = "ripgrep"
supported_os = ["linux", "darwin"]

[version]
source = "github:BurntSushi/ripgrep"

[verify]
command = "rg --version"

[[steps]]
action = "github_release"
when = { os = "linux" }
"#;
        assert!(parse_str(toml_str, &path()).is_ok());
    }

    #[test]
    fn rejects_guard_os_outside_supported_os() {
        let toml_str = r#"
[metadata]
name = "x"
supported_os = "linux"

[version]
source = "github:a/b"

[verify]
command = "x --version"

[[steps]]
action = "download"
when = { os = "darwin" }
"#;
        let err = parse_str(toml_str, &path()).unwrap_err();
        match err {
            Error::InvalidRecipe { reasons, .. } => {
                assert!(reasons.iter().any(|r| r.contains("supported_os")));
            }
            _ => panic!("wrong error"),
        }
    }
}
