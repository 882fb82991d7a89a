//! Error types for the nixbuild-runner CLI.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for a build invocation.
///
/// Each variant maps to an exit code via [`BuilderError::exit_code`].
#[derive(Error, Debug)]
pub enum BuilderError {
    /// Invalid, contradictory, or incomplete configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Cloning or pulling the repository failed.
    #[error("Repository sync failed: {0}")]
    Sync(String),

    /// The build command failed the `nix`/`nix-build` allow-list.
    #[error("Invalid command '{0}': command must start with \"nix\" or \"nix-build\"")]
    DisallowedCommand(String),

    /// The build process terminated unsuccessfully.
    #[error("{}", describe_build_failure(.code))]
    BuildFailure {
        /// Exit status of the build, `None` when killed by a signal.
        code: Option<i32>,
    },

    /// Filesystem or process-spawn failure outside of git.
    #[error("{0}")]
    Io(String),
}

fn describe_build_failure(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("Build failed with exit code {}", code),
        None => "Build was terminated by a signal".to_string(),
    }
}

impl BuilderError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuilderError::DisallowedCommand(_) => exit_codes::DISALLOWED_COMMAND,
            BuilderError::Config(_)
            | BuilderError::Sync(_)
            | BuilderError::BuildFailure { .. }
            | BuilderError::Io(_) => exit_codes::FAILURE,
        }
    }
}

/// Configuration could not be resolved into a `BuildConfig`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `--json` was combined with other configuration flags.
    #[error("--json cannot be combined with other flags (also set: {})", .flags.join(", "))]
    MutuallyExclusive { flags: Vec<String> },

    /// The `--json` value is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// The JSON document does not match the request schema.
    #[error("JSON does not match the build request schema:\n  {}", .0.join("\n  "))]
    SchemaValidation(Vec<String>),

    /// A required top-level section is absent from the JSON document.
    #[error("JSON must contain 'git_config', 'build_options' and 'cachix_config' keys (missing '{0}')")]
    MissingSection(&'static str),

    /// A value required by the current mode is absent.
    #[error("{field} is required {reason}")]
    MissingField { field: String, reason: String },

    /// `--substituter` and `--trusted-key` were not given pairwise.
    #[error(
        "--substituter and --trusted-key must be set equally often (got {substituters} substituter(s) and {trusted_keys} trusted key(s))"
    )]
    SubstituterMismatch {
        substituters: usize,
        trusted_keys: usize,
    },

    /// A substituter entry lacks a URL or trusted keys.
    #[error("invalid substituter: {0}")]
    InvalidSubstituter(String),

    /// The push target cannot be split into host prefix and cache name.
    #[error("invalid cache target '{0}': expected <host>/<cache name>")]
    InvalidTarget(String),

    /// The working directory path cannot be made absolute.
    #[error("invalid working directory '{path}': {reason}")]
    InvalidWorkDir { path: String, reason: String },

    /// The build command is empty.
    #[error("build command must not be empty")]
    EmptyCommand,

    /// The build command cannot be tokenized.
    #[error("failed to parse build command '{command}': {reason}")]
    MalformedCommand { command: String, reason: String },
}

/// Result type alias for nixbuild-runner operations.
pub type Result<T> = std::result::Result<T, BuilderError>;
