// src/error.rs

//! Crate-wide error taxonomy
//!
//! Every component surfaces errors through this single enum. Kinds map
//! directly to the engine's error taxonomy: each carries enough context
//! (tool, action, underlying cause) for a caller to act without log mining.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid recipe at {path}: {}", .reasons.join("; "))]
    InvalidRecipe {
        path: PathBuf,
        reasons: Vec<String>,
    },

    #[error("recipe not found: {name}")]
    RecipeNotFound { name: String },

    #[error("cyclic dependency: {}", .path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    #[error("source not found: {source_id}")]
    SourceNotFound { source_id: String },

    #[error("version list unavailable for {source}: {cause}")]
    VersionUnavailable { source: String, cause: String },

    #[error("no version of {constraint} satisfies candidates for {tool}: [{}]", .candidates.join(", "))]
    NoMatchingVersion {
        tool: String,
        constraint: String,
        candidates: Vec<String>,
    },

    #[error("constraint not supported: {constraint} ({reason})")]
    ConstraintNotSupported { constraint: String, reason: String },

    #[error("checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("unsafe archive path in {archive}: {entry}")]
    UnsafeArchivePath { archive: String, entry: String },

    #[error("system dependency missing: {command} ({guidance})")]
    SystemDependencyMissing { command: String, guidance: String },

    #[error("command failed ({code}): {stderr_tail}")]
    CommandFailed { code: i32, stderr_tail: String },

    #[error("verify failed for `{command}`: {stdout_tail}")]
    VerifyFailed { command: String, stdout_tail: String },

    #[error("{op} timed out after {limit_secs}s")]
    Timeout { op: String, limit_secs: u64 },

    #[error("{tool} is still depended on by: {}", .by.join(", "))]
    StillDepended { tool: String, by: Vec<String> },

    #[error("action '{action}' received bad parameters: {reason}")]
    UserError { action: String, reason: String },

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("step {index} ({description}) of '{tool}' failed: {source}")]
    StepFailed {
        tool: String,
        index: usize,
        description: String,
        #[source]
        source: Box<Error>,
    },

    #[error("lock held on {path}: {reason}")]
    LockFailed { path: PathBuf, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("toml serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// How a failure should be treated by the retry/abort policy (§4.6, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Checksum, archive, unmet system dep — never retried.
    Deterministic,
    /// Network, 5xx, timeout — eligible for retry with backoff.
    Transient,
    /// Bad recipe parameters — fatal, surfaced to the recipe author.
    UserError,
}

impl Error {
    /// Classify this error for the retry/abort policy.
    pub fn classify(&self) -> FailureClass {
        match self {
            Error::VersionUnavailable { .. } | Error::Timeout { .. } | Error::Http(_) => {
                FailureClass::Transient
            }
            Error::UserError { .. } | Error::InvalidRecipe { .. } => FailureClass::UserError,
            _ => FailureClass::Deterministic,
        }
    }

    /// Process exit code for the CLI surface (§6): 1 for a user/recipe
    /// error the recipe author or operator must fix, 2 for everything
    /// else (network, filesystem, subprocess, environment).
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidRecipe { .. }
            | Error::RecipeNotFound { .. }
            | Error::CyclicDependency { .. }
            | Error::SourceNotFound { .. }
            | Error::NoMatchingVersion { .. }
            | Error::ConstraintNotSupported { .. }
            | Error::UserError { .. }
            | Error::UnknownAction(_)
            | Error::StillDepended { .. } => 1,
            Error::StepFailed { source, .. } => source.exit_code(),
            _ => 2,
        }
    }
}
