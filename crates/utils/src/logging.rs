//! provides logging helpers

use tracing::Subscriber;
use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Parses a log level name as accepted on the command line.
///
/// Accepts `trace`, `debug`, `info`, `warn`, `error` and `off`, case-insensitive.
pub fn parse_level(level: &str) -> Result<filter::LevelFilter, String> {
    level
        .trim()
        .parse::<filter::LevelFilter>()
        .map_err(|_| format!("unknown log level '{level}'"))
}

/// Build an env filter, `RUST_LOG` overrides the given default level.
pub fn env_filter(default_level: filter::LevelFilter) -> filter::EnvFilter {
    filter::EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy()
}

/// stderr formatting layer shared by all binaries of the workspace
pub fn get_fmt_layer<S>(default_level: filter::LevelFilter) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(false)
        .with_filter(env_filter(default_level))
}

/// initiate the global tracing subscriber
pub fn init(default_level: filter::LevelFilter) {
    tracing_subscriber::registry()
        .with(get_fmt_layer(default_level))
        .init();
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn parse_level_accepts_known_names() {
        assert_eq!(parse_level("info").unwrap(), filter::LevelFilter::INFO);
        assert_eq!(parse_level("WARN").unwrap(), filter::LevelFilter::WARN);
        assert_eq!(parse_level(" debug ").unwrap(), filter::LevelFilter::DEBUG);
        assert_eq!(parse_level("off").unwrap(), filter::LevelFilter::OFF);
    }

    #[test]
    fn parse_level_rejects_unknown_names() {
        let err = parse_level("loud").unwrap_err();
        assert!(err.contains("loud"), "error should name the value: {err}");
    }
}
