//! Diagnostic logging to stderr.
//!
//! The filter comes from `POSTERIZED_LOG`, then `RUST_LOG`, then the level
//! chosen on the command line. Stdout stays reserved for command output.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV_VAR: &str = "POSTERIZED_LOG";

/// Filter directive used when no environment variable is set.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "posterized=warn",
        1 => "posterized=info",
        2 => "posterized=debug",
        _ => "trace",
    }
}

fn build_filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)))
}

/// Install the global subscriber. A second call keeps the first subscriber.
pub fn init_logging(verbosity: u8) {
    let _ = tracing_subscriber::registry()
        .with(build_filter(verbosity))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_the_default_level() {
        assert_eq!(default_directive(0), "posterized=warn");
        assert_eq!(default_directive(2), "posterized=debug");
        assert_eq!(default_directive(9), "trace");
    }
}
