// src/actions/run_command.rs

use super::{optional_str, require_str, Action, ActionContext};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::process::Stdio;

/// `run_command`: runs `command` with a `PATH` containing only staging's
/// `bin/` plus the host's read-only system path, cwd pinned to `staging/`.
/// Exit code != 0 -> `CommandFailed`. Time-limited (default 10 min).
pub struct RunCommand;

#[async_trait]
impl Action for RunCommand {
    async fn execute(&self, ctx: &ActionContext, params: &toml::Table) -> Result<()> {
        let command = ctx.substitute(require_str(params, "command", "run_command")?);
        let cwd = optional_str(params, "cwd").map(|c| ctx.staging_dir.join(c)).unwrap_or_else(|| ctx.staging_dir.clone());

        std::fs::create_dir_all(&ctx.bin_dir())?;
        let system_path = std::env::var_os("PATH").unwrap_or_default();
        let path = std::env::join_paths(
            std::iter::once(ctx.bin_dir()).chain(std::env::split_paths(&system_path)),
        )
        .map_err(|e| Error::Other(e.to_string()))?;

        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c")
            .arg(&command)
            .current_dir(&cwd)
            .env("PATH", &path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(env) = params.get("env").and_then(|v| v.as_table()) {
            for (k, v) in env {
                if let Some(v) = v.as_str() {
                    cmd.env(k, ctx.substitute(v));
                }
            }
        }

        let output = tokio::time::timeout(ctx.config.subprocess_timeout, cmd.output())
            .await
            .map_err(|_| Error::Timeout {
                op: format!("run_command '{command}'"),
                limit_secs: ctx.config.subprocess_timeout.as_secs(),
            })??;

        if !output.status.success() {
            let stderr_tail = tail(&output.stderr);
            return Err(Error::CommandFailed {
                code: output.status.code().unwrap_or(-1),
                stderr_tail,
            });
        }
        Ok(())
    }
}

/// Last ~2 KiB of a command's output, for error context without dumping
/// megabytes of log into an error value.
pub fn tail(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let max = 2048;
    if text.len() <= max {
        text.into_owned()
    } else {
        text[text.len() - max..].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Arch, Host, Os};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn ctx(staging: &std::path::Path) -> ActionContext {
        ActionContext {
            staging_dir: staging.to_path_buf(),
            host: Host::new(Os::Linux, Arch::Amd64),
            tool: "x".to_string(),
            version: "1.0.0".to_string(),
            content_cache: Arc::new(crate::cache::ContentCache::new(
                PathBuf::from("/tmp/cache"),
                reqwest::Client::new(),
            )),
            client: reqwest::Client::new(),
            config: Arc::new(crate::config::Config::new(PathBuf::from("/tmp"))),
        }
    }

    #[tokio::test]
    async fn successful_command_runs() {
        let staging = tempfile::tempdir().unwrap();
        let mut params = toml::Table::new();
        params.insert("command".to_string(), toml::Value::String("echo hi".to_string()));
        RunCommand.execute(&ctx(staging.path()), &params).await.unwrap();
    }

    #[tokio::test]
    async fn nonzero_exit_is_command_failed() {
        let staging = tempfile::tempdir().unwrap();
        let mut params = toml::Table::new();
        params.insert("command".to_string(), toml::Value::String("exit 7".to_string()));
        let err = RunCommand.execute(&ctx(staging.path()), &params).await.unwrap_err();
        assert!(matches!(err, Error::CommandFailed { code: 7, .. }));
    }

    #[test]
    fn tail_truncates_long_output() {
        let big = vec![b'a'; 5000];
        assert_eq!(tail(&big).len(), 2048);
    }
}
