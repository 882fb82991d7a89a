//! Build command construction.
//!
//! Turns a `BuildConfig` into the final argument vector:
//!
//! ```text
//! [cachix -c ./cachix.dhall watch-exec <cache> --] <build command tokens> [--option ...]
//! ```
//!
//! The push wrapper has to come first so `watch-exec` sees the whole
//! remaining argv as the command it wraps, and the substituter options come
//! last so they follow the build subcommand and its own arguments.

pub mod cachix;
pub mod template;

use crate::config::{BuildConfig, Substituter};
use crate::error::{BuilderError, ConfigError, Result};
use tracing::info;

pub use template::{DhallRenderer, Renderer, TemplateError};

/// Programs a build command may start with.
pub const ALLOWED_PROGRAMS: [&str; 2] = ["nix", "nix-build"];

/// Tokenize a build command and enforce the program allow-list.
///
/// Tokens follow shell word rules, so quoted arguments stay intact.
pub fn parse_command(command: &str) -> Result<Vec<String>> {
    let tokens = shell_words::split(command).map_err(|e| ConfigError::MalformedCommand {
        command: command.to_string(),
        reason: e.to_string(),
    })?;

    match tokens.first() {
        None => Err(ConfigError::EmptyCommand.into()),
        Some(program) if ALLOWED_PROGRAMS.contains(&program.as_str()) => Ok(tokens),
        Some(_) => Err(BuilderError::DisallowedCommand(command.to_string())),
    }
}

/// `--option` arguments adding the configured substituters and their keys.
///
/// Empty when no substituters are configured.
pub fn substituter_options(substituters: &[Substituter]) -> Vec<String> {
    if substituters.is_empty() {
        return Vec::new();
    }

    let keys: Vec<&str> = substituters
        .iter()
        .flat_map(|s| s.trusted_keys.iter().map(String::as_str))
        .collect();
    let urls: Vec<&str> = substituters.iter().map(|s| s.url.as_str()).collect();

    vec![
        "--option".to_string(),
        "extra-trusted-public-keys".to_string(),
        keys.join(" "),
        "--option".to_string(),
        "extra-substituters".to_string(),
        urls.join(" "),
    ]
}

/// Assemble the build argv for `config`.
///
/// When pushing is enabled this renders the cachix client config into the
/// working directory as a side effect.
pub fn build(config: &BuildConfig, renderer: &dyn Renderer) -> Result<Vec<String>> {
    let command_tokens = parse_command(config.build_command())?;

    let mut argv = Vec::new();
    if let Some(push) = config.push_spec() {
        cachix::write_config(config.work_dir(), push, renderer)?;
        info!("Pushing results to cache '{}'", push.cache_name());
        argv.extend(cachix::wrapper_args(push));
    }
    argv.extend(command_tokens);
    argv.extend(substituter_options(config.substituters()));

    Ok(argv)
}
