//! Log subscriber setup.

use tracing_subscriber::EnvFilter;

/// Default filter directive for a `-v` count.
#[must_use]
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Installs a stderr subscriber. `RUST_LOG` overrides the level derived from
/// `verbosity`. Does nothing if a subscriber is already installed.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(default_directive(0), "warn");
        assert_eq!(default_directive(1), "info");
        assert_eq!(default_directive(2), "debug");
        assert_eq!(default_directive(7), "debug");
    }

    #[test]
    fn init_twice_does_not_panic() {
        init(0);
        init(2);
    }
}
