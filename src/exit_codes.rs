//! Exit code constants for the nixbuild-runner CLI.
//!
//! The contract consumed by the scheduler that launches a build:
//! - 0: Success
//! - 1: Configuration, repository sync, or build failure
//! - 2: Build command rejected by the allow-list

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// Any configuration, synchronization, or build failure.
pub const FAILURE: i32 = 1;

/// The build command does not start with `nix` or `nix-build`.
pub const DISALLOWED_COMMAND: i32 = 2;
