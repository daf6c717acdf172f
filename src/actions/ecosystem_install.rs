// src/actions/ecosystem_install.rs

use super::{optional_str, require_str, Action, ActionContext};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::process::Stdio;

/// `*_install` actions: delegate to an ecosystem's own CLI within a
/// staging-local prefix; artifacts must land in `staging/bin/` (§4.6).
pub struct EcosystemInstall {
    binary: &'static str,
    /// Builds the subprocess args given the package name and staging bin dir.
    build_args: fn(package: &str, bin_dir: &std::path::Path) -> Vec<String>,
}

impl EcosystemInstall {
    pub fn cargo() -> Self {
        Self {
            binary: "cargo",
            build_args: |pkg, bin_dir| {
                vec!["install".into(), "--root".into(), bin_dir.to_string_lossy().into_owned(), pkg.into()]
            },
        }
    }

    pub fn gem() -> Self {
        Self {
            binary: "gem",
            build_args: |pkg, bin_dir| {
                vec![
                    "install".into(),
                    pkg.into(),
                    "--install-dir".into(),
                    bin_dir.to_string_lossy().into_owned(),
                    "--bindir".into(),
                    bin_dir.to_string_lossy().into_owned(),
                    "--no-document".into(),
                ]
            },
        }
    }

    pub fn npm() -> Self {
        Self {
            binary: "npm",
            build_args: |pkg, bin_dir| {
                vec![
                    "install".into(),
                    "--global".into(),
                    "--prefix".into(),
                    bin_dir.to_string_lossy().into_owned(),
                    pkg.into(),
                ]
            },
        }
    }

    pub fn pipx() -> Self {
        Self {
            binary: "pipx",
            build_args: |pkg, _bin_dir| vec!["install".into(), pkg.into()],
        }
    }

    pub fn go() -> Self {
        Self {
            binary: "go",
            build_args: |pkg, _bin_dir| vec!["install".into(), pkg.into()],
        }
    }

    pub fn cpan() -> Self {
        Self {
            binary: "cpanm",
            build_args: |pkg, _bin_dir| vec!["--local-lib".into(), "staging".into(), pkg.into()],
        }
    }

    pub fn apk() -> Self {
        Self {
            binary: "apk",
            build_args: |pkg, _bin_dir| vec!["add".into(), "--no-cache".into(), pkg.into()],
        }
    }
}

#[async_trait]
impl Action for EcosystemInstall {
    async fn execute(&self, ctx: &ActionContext, params: &toml::Table) -> Result<()> {
        if which::which(self.binary).is_err() {
            return Err(Error::SystemDependencyMissing {
                command: self.binary.to_string(),
                guidance: format!("install {} to use this action", self.binary),
            });
        }

        let package = optional_str(params, "package").unwrap_or(&ctx.tool);
        let package = require_str_or(package, ctx)?;

        std::fs::create_dir_all(&ctx.bin_dir())?;
        let args = (self.build_args)(&package, &ctx.bin_dir());

        let output = tokio::time::timeout(
            ctx.config.subprocess_timeout,
            tokio::process::Command::new(self.binary)
                .args(&args)
                .current_dir(&ctx.staging_dir)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output(),
        )
        .await
        .map_err(|_| Error::Timeout {
            op: format!("{} install", self.binary),
            limit_secs: ctx.config.subprocess_timeout.as_secs(),
        })??;

        if !output.status.success() {
            return Err(Error::CommandFailed {
                code: output.status.code().unwrap_or(-1),
                stderr_tail: super::run_command::tail(&output.stderr),
            });
        }
        Ok(())
    }
}

fn require_str_or(s: &str, ctx: &ActionContext) -> Result<String> {
    if s.is_empty() {
        return Err(Error::UserError {
            action: "ecosystem_install".to_string(),
            reason: format!("no package name resolvable for tool '{}'", ctx.tool),
        });
    }
    Ok(ctx.substitute(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cargo_args_include_root_and_package() {
        let installer = EcosystemInstall::cargo();
        let args = (installer.build_args)("ripgrep", std::path::Path::new("/tmp/bin"));
        assert_eq!(args, vec!["install", "--root", "/tmp/bin", "ripgrep"]);
    }

    #[test]
    fn npm_args_use_global_prefix() {
        let installer = EcosystemInstall::npm();
        let args = (installer.build_args)("typescript", std::path::Path::new("/tmp/bin"));
        assert!(args.contains(&"--global".to_string()));
        assert!(args.contains(&"--prefix".to_string()));
    }
}
