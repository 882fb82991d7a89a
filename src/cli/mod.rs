//! CLI argument parsing for nixbuild-runner.
//!
//! Uses clap derive macros for declarative argument definitions. The flag
//! set is kept in [`FlagInputs`] so the configuration resolver can be driven
//! without going through clap.

use crate::exit_codes;
use clap::error::ErrorKind;
use clap::{Args, Parser};
use std::path::PathBuf;

/// Default working directory for the local checkout.
pub const DEFAULT_WORK_DIR: &str = "/tmp/repos";

/// Build a Nix flake and publish the result to a binary cache.
///
/// Configuration is given either through individual flags or as a single
/// JSON document with `--json`, never both.
#[derive(Parser, Debug)]
#[command(name = "nixbuild-runner")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence when set).
    #[arg(short, long)]
    pub verbose: bool,

    #[command(flatten)]
    pub flags: FlagInputs,
}

impl Cli {
    /// Parse command-line arguments.
    ///
    /// Errors are returned rather than exiting so the caller controls the
    /// exit code; see [`usage_exit_code`].
    pub fn parse_args() -> Result<Self, clap::Error> {
        Self::try_parse()
    }
}

/// Exit code for a failed parse.
///
/// `--help` and `--version` succeed. Every usage error is a configuration
/// failure, keeping exit code 2 reserved for a disallowed build command.
pub fn usage_exit_code(err: &clap::Error) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => exit_codes::SUCCESS,
        _ => exit_codes::FAILURE,
    }
}

/// Every configuration flag accepted on the command line.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagInputs {
    /// The directory the repository is cloned into.
    #[arg(long, default_value = DEFAULT_WORK_DIR)]
    pub dir: PathBuf,

    /// Don't clone or pull any repository.
    #[arg(long)]
    pub no_clone: bool,

    /// The repository to clone.
    #[arg(long)]
    pub repository: Option<String>,

    /// The branch to check out.
    #[arg(long)]
    pub branch: Option<String>,

    /// Username embedded into the repository URL.
    #[arg(long)]
    pub git_user: Option<String>,

    /// Key or token embedded into the repository URL.
    #[arg(long)]
    pub git_key: Option<String>,

    /// The build command, starting with `nix` or `nix-build`.
    #[arg(long)]
    pub command: Option<String>,

    /// Don't push any build result.
    #[arg(long)]
    pub no_push: bool,

    /// URL of the binary cache including the cache name (https://caches.example.org/default).
    #[arg(long)]
    pub target: Option<String>,

    /// Auth token for the cache.
    #[arg(long)]
    pub api_key: Option<String>,

    /// Key used to sign the built derivations.
    #[arg(long)]
    pub signing_key: Option<String>,

    /// A substituter used during the build (repeatable, paired with --trusted-key).
    #[arg(long, action = clap::ArgAction::Append)]
    pub substituter: Vec<String>,

    /// A trusted public key of a substituter (repeatable).
    #[arg(long, action = clap::ArgAction::Append)]
    pub trusted_key: Vec<String>,

    /// Provide all settings as a single JSON document.
    #[arg(long)]
    pub json: Option<String>,
}

impl FlagInputs {
    /// Flag-mode inputs rooted at the default working directory.
    pub fn new() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_WORK_DIR),
            ..Default::default()
        }
    }

    /// Names of configuration flags holding a non-default value.
    ///
    /// `--dir` and `--json` are excluded: the working directory is
    /// accepted alongside a JSON document.
    pub fn explicit_flags(&self) -> Vec<String> {
        let mut set = Vec::new();
        let mut mark = |present: bool, name: &str| {
            if present {
                set.push(name.to_string());
            }
        };

        mark(self.no_clone, "--no-clone");
        mark(self.repository.is_some(), "--repository");
        mark(self.branch.is_some(), "--branch");
        mark(self.git_user.is_some(), "--git-user");
        mark(self.git_key.is_some(), "--git-key");
        mark(self.command.is_some(), "--command");
        mark(self.no_push, "--no-push");
        mark(self.target.is_some(), "--target");
        mark(self.api_key.is_some(), "--api-key");
        mark(self.signing_key.is_some(), "--signing-key");
        mark(!self.substituter.is_empty(), "--substituter");
        mark(!self.trusted_key.is_empty(), "--trusted-key");

        set
    }
}
