//! Logging setup.
//!
//! Structured logs go to stderr so they never mix with command output.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when nothing else is configured.
pub const DEFAULT_FILTER: &str = "warn";

/// Build the filter from the first directive given, in priority order:
/// command line (or `CODESHELL_LOG`), settings file, default.
pub fn build_filter(cli: Option<&str>, settings: Option<&str>) -> anyhow::Result<EnvFilter> {
    let directives = cli
        .or(settings)
        .filter(|d| !d.trim().is_empty())
        .unwrap_or(DEFAULT_FILTER);
    EnvFilter::try_new(directives)
        .map_err(|e| anyhow::anyhow!("invalid log filter '{}': {}", directives, e))
}

/// Install the global subscriber.
pub fn init_logging(cli: Option<&str>, settings: Option<&str>) -> anyhow::Result<()> {
    let filter = build_filter(cli, settings)?;
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_priority() {
        let filter = build_filter(Some("debug"), Some("error")).unwrap();
        assert_eq!(filter.to_string(), "debug");
        let filter = build_filter(None, Some("codeshell_core=trace")).unwrap();
        assert_eq!(filter.to_string(), "codeshell_core=trace");
        let filter = build_filter(Some(" "), None).unwrap();
        assert_eq!(filter.to_string(), DEFAULT_FILTER);
    }
}
