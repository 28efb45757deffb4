use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Maps the `-v` count to the default filter used when `RUST_LOG` is unset.
#[must_use]
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "psrkit=warn",
        1 => "psrkit=info",
        _ => "psrkit=debug",
    }
}

/// Installs a compact stderr subscriber so stdout stays free for results.
pub fn init_cli_logger(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

    // Keeps any global subscriber an embedding program installed first.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::default_filter;

    #[test]
    fn verbosity_raises_the_default_level() {
        assert_eq!(default_filter(0), "psrkit=warn");
        assert_eq!(default_filter(1), "psrkit=info");
        assert_eq!(default_filter(2), "psrkit=debug");
        assert_eq!(default_filter(9), "psrkit=debug");
    }
}
