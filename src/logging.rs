//! Log output setup.
//!
//! Logs go to stderr so stdout carries only the relayed build output.

use tracing_subscriber::EnvFilter;

/// Filter directive used when `RUST_LOG` is not set.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

/// Build the filter, preferring `RUST_LOG` over the verbosity flag.
pub fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false), "info");
        assert_eq!(default_directive(true), "debug");
    }

    #[test]
    #[serial]
    fn test_rust_log_takes_precedence() {
        // SAFETY: serialized with the other tests touching the environment.
        unsafe { std::env::set_var("RUST_LOG", "warn") };
        let filter = env_filter(true);
        unsafe { std::env::remove_var("RUST_LOG") };
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    #[serial]
    fn test_verbose_without_rust_log() {
        unsafe { std::env::remove_var("RUST_LOG") };
        assert_eq!(env_filter(true).to_string(), "debug");
        assert_eq!(env_filter(false).to_string(), "info");
    }

    #[test]
    #[serial]
    fn test_init_twice_is_harmless() {
        init(false);
        init(true);
    }
}
