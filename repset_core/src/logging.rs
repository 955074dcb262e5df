//! Tracing setup shared by every Repset front end.
//!
//! Log lines go to stderr; stdout belongs to command output and prompts.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter directive used when neither `RUST_LOG` nor `-v` says otherwise
pub const DEFAULT_LEVEL: &str = "warn";

/// Map a repeated `-v` count to a filter directive
pub fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => DEFAULT_LEVEL,
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

pub fn init() {
    init_with_level(DEFAULT_LEVEL);
}

/// Install the global subscriber with `default_level` unless `RUST_LOG` is set.
///
/// Returns `false` when a subscriber was already installed, in which case
/// the existing one keeps running.
pub fn init_with_level(default_level: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}

#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(level_for_verbosity(0), "warn");
        assert_eq!(level_for_verbosity(1), "info");
        assert_eq!(level_for_verbosity(2), "debug");
        assert_eq!(level_for_verbosity(7), "trace");
    }

    #[test]
    fn test_second_init_is_harmless() {
        init_test();
        assert!(!init_with_level("info"));
        init();
    }
}
