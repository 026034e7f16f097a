//! Tracing subscriber setup.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogFormat;

static INIT: Once = Once::new();

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `default_level` when it is set. Calling this more
/// than once is a no-op, which keeps tests that build several servers quiet.
pub fn init_logging(format: LogFormat, default_level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));

        let registry = tracing_subscriber::registry().with(filter);
        let result = match format {
            LogFormat::Json => registry
                .with(fmt::layer().json().with_current_span(false).with_target(true))
                .try_init(),
            LogFormat::Text => registry.with(fmt::layer().with_target(true)).try_init(),
        };

        if let Err(err) = result {
            eprintln!("lineagekit: warning: failed to install log subscriber: {err}");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init_logging(LogFormat::Text, "warn");
        init_logging(LogFormat::Json, "debug");
        tracing::info!("still logging");
    }
}
