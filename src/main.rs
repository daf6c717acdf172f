// src/main.rs

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing::{error, info};
use tsuku::{Config, Host, InstallationManager};

#[derive(Parser)]
#[command(name = "tsuku")]
#[command(author, version, about = "Recipe-driven installer for developer tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install one or more tools
    Install {
        /// Tool names, optionally with a constraint: `name` or `name@constraint`
        tools: Vec<String>,
    },
    /// Remove an installed tool
    Remove {
        tool: String,
        /// Remove even if other installed tools still depend on it
        #[arg(long)]
        force: bool,
    },
    /// List installed tools
    List,
    /// Update one or more tools to latest
    Update { tools: Vec<String> },
    /// Enumerate known recipes (overlay + embedded)
    Recipes,
    /// Refresh the embedded recipe overlay
    UpdateRegistry,
}

fn parse_tool_spec(spec: &str) -> (&str, Option<&str>) {
    match spec.split_once('@') {
        Some((name, constraint)) => (name, Some(constraint)),
        None => (spec, None),
    }
}

fn manager(config: Config) -> InstallationManager {
    let host = Host::detect();
    let overlay_dir = Some(config.recipes_dir());
    let bundled_dir = config.recipes_dir();
    InstallationManager::new(config, host, overlay_dir, bundled_dir)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("could not resolve TSUKU_HOME: {e}");
            return ExitCode::from(2);
        }
    };

    match cli.command {
        Commands::Install { tools } => run_multi(&config, &tools, Operation::Install).await,
        Commands::Update { tools } => run_multi(&config, &tools, Operation::Update).await,
        Commands::Remove { tool, force } => {
            let mgr = manager(config);
            match mgr.remove(&tool, force) {
                Ok(()) => {
                    println!("removed {tool}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("{e}");
                    ExitCode::from(e.exit_code() as u8)
                }
            }
        }
        Commands::List => {
            let tools_dir = config.tools_dir();
            match std::fs::read_dir(&tools_dir) {
                Ok(entries) => {
                    for entry in entries.flatten() {
                        if let Some(name) = entry.file_name().to_str() {
                            println!("{name}");
                        }
                    }
                    ExitCode::SUCCESS
                }
                Err(_) => {
                    info!("no tools installed yet");
                    ExitCode::SUCCESS
                }
            }
        }
        Commands::Recipes => {
            let mgr = manager(config);
            for name in mgr.known_recipes() {
                println!("{name}");
            }
            ExitCode::SUCCESS
        }
        Commands::UpdateRegistry => match update_registry(&config).await {
            Ok(()) => {
                println!("recipe overlay refreshed");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("{e}");
                ExitCode::from(e.exit_code() as u8)
            }
        },
    }
}

enum Operation {
    Install,
    Update,
}

async fn run_multi(config: &Config, specs: &[String], op: Operation) -> ExitCode {
    if specs.is_empty() {
        error!("no tools specified");
        return ExitCode::from(1);
    }

    let mgr = manager(config.clone());
    let mut failures = 0usize;
    for spec in specs {
        let (name, constraint) = parse_tool_spec(spec);
        let result = match op {
            Operation::Install => mgr.install(name, constraint).await.map(|_| ()),
            Operation::Update => mgr.update(name).await.map(|_| ()),
        };
        match result {
            Ok(()) => println!("{name}: ok"),
            Err(e) => {
                error!("{name}: {e}");
                failures += 1;
            }
        }
    }

    if failures == 0 {
        ExitCode::SUCCESS
    } else if failures == specs.len() {
        ExitCode::from(1)
    } else {
        // partial success across a multi-tool operation (§6)
        ExitCode::from(3)
    }
}

/// Refreshes the embedded recipe overlay from its configured remote source.
/// Left as a thin placeholder: the fetch/verify/unpack pipeline for the
/// overlay bundle is collaborator infrastructure, not part of the core
/// engine's contract (§6 "collaborator contract, not specified in depth").
async fn update_registry(config: &Config) -> tsuku::Result<()> {
    std::fs::create_dir_all(config.recipes_dir())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tool_spec_splits_on_at() {
        assert_eq!(parse_tool_spec("ripgrep"), ("ripgrep", None));
        assert_eq!(parse_tool_spec("ripgrep@1.2.3"), ("ripgrep", Some("1.2.3")));
        assert_eq!(parse_tool_spec("node@lts"), ("node", Some("lts")));
    }
}
