// crates/observability/src/logging.rs
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset: quiet, except for scheduler events.
pub const DEFAULT_FILTER: &str = "warn,pixelforge_server_jobs=info,pixelforge_cli=info";

/// Output format for log lines on stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides [`DEFAULT_FILTER`]. Fails if a subscriber is already
/// installed.
pub fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn test_second_init_fails() {
        assert!(init_tracing(LogFormat::Compact).is_ok());
        let err = init_tracing(LogFormat::Json).unwrap_err();
        assert!(err.to_string().contains("failed to install tracing subscriber"));
    }
}
