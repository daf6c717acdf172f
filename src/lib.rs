// src/lib.rs

//! tsuku: a recipe-driven installation engine for developer tools.
//!
//! # Architecture
//!
//! - Recipes are sectioned TOML describing how to fetch, build, and verify
//!   one tool across platforms; the engine carries no per-ecosystem logic
//!   of its own beyond the action and version-provider registries.
//! - Every install is staged under a temp root and committed by atomic
//!   rename; nothing under `tools/` is ever partially written.
//! - A multi-ecosystem disambiguator resolves an unqualified tool name to
//!   a concrete `builder:ident` source when a recipe omits one.

pub mod actions;
pub mod cache;
pub mod config;
pub mod disambiguate;
mod error;
pub mod freshness;
pub mod hash;
pub mod host;
pub mod install;
pub mod progress;
pub mod recipe;
pub mod tooltree;
pub mod version;

pub use config::Config;
pub use disambiguate::{
    audit::{AuditEntry, Confidence, QueueEntry, QueueStatus},
    Disambiguator, ResolveResult,
};
pub use error::{Error, Result};
pub use freshness::FreshnessDecision;
pub use host::{Arch, Host, Os, WhenGuard};
pub use install::{InstallationManager, InstalledTool};
pub use progress::{
    CallbackProgress, LogProgress, MultiProgress, ProgressEvent, ProgressStyle, ProgressTracker,
    SilentProgress,
};
pub use recipe::{Recipe, Step, VerifySpec};
pub use version::Constraint;
