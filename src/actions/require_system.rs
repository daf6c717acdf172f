// src/actions/require_system.rs

use super::{optional_str, require_str, Action, ActionContext};
use crate::error::{Error, Result};
use async_trait::async_trait;

/// `require_system`: probes the host for `command`'s presence, optionally
/// enforcing `min_version` via `version_regex` (default capture group 1)
/// compared semver-lexicographically.
pub struct RequireSystem;

#[async_trait]
impl Action for RequireSystem {
    async fn execute(&self, ctx: &ActionContext, params: &toml::Table) -> Result<()> {
        let command = require_str(params, "command", "require_system")?;

        if which::which(command).is_err() {
            return Err(Error::SystemDependencyMissing {
                command: command.to_string(),
                guidance: install_guidance(command, &ctx.host),
            });
        }

        let Some(min_version) = optional_str(params, "min_version") else {
            return Ok(());
        };

        let pattern = optional_str(params, "version_regex").unwrap_or(r"(\d+\.\d+\.\d+)");
        let re = regex::Regex::new(pattern)
            .map_err(|e| Error::UserError { action: "require_system".to_string(), reason: e.to_string() })?;

        let output = std::process::Command::new(command)
            .arg("--version")
            .output()
            .map_err(|e| Error::Other(e.to_string()))?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        let found = re
            .captures(&stdout)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| Error::SystemDependencyMissing {
                command: command.to_string(),
                guidance: format!("could not parse version from `{command} --version` output"),
            })?;

        let found_ver = semver::Version::parse(&found).map_err(|e| Error::UserError {
            action: "require_system".to_string(),
            reason: format!("'{found}' is not semver: {e}"),
        })?;
        let min_ver = semver::Version::parse(min_version).map_err(|e| Error::UserError {
            action: "require_system".to_string(),
            reason: format!("min_version '{min_version}' is not semver: {e}"),
        })?;

        if found_ver < min_ver {
            return Err(Error::SystemDependencyMissing {
                command: command.to_string(),
                guidance: format!(
                    "found {command} {found}, need >= {min_version}: {}",
                    install_guidance(command, &ctx.host)
                ),
            });
        }
        Ok(())
    }
}

fn install_guidance(command: &str, host: &crate::host::Host) -> String {
    match host.os {
        crate::host::Os::Darwin => format!("install with: brew install {command}"),
        crate::host::Os::Linux => match host.linux_family.as_deref() {
            Some("debian") => format!("install with: apt-get install {command}"),
            Some("fedora") | Some("rhel") => format!("install with: dnf install {command}"),
            Some(family) => format!("install '{command}' using your {family} package manager"),
            None => format!("install '{command}' using your distribution's package manager"),
        },
        crate::host::Os::Windows => format!("install '{command}' manually or via winget/choco"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Arch, Host, Os};

    #[test]
    fn darwin_guidance_mentions_brew() {
        let host = Host::new(Os::Darwin, Arch::Arm64);
        assert!(install_guidance("cmake", &host).contains("brew"));
    }

    #[test]
    fn debian_guidance_mentions_apt() {
        let mut host = Host::new(Os::Linux, Arch::Amd64);
        host.linux_family = Some("debian".to_string());
        assert!(install_guidance("cmake", &host).contains("apt-get"));
    }
}
