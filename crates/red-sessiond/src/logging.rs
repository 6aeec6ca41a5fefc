//! Logging setup for the session server.
//!
//! Informational events go to stdout, failure traces to stderr. Each event
//! is written as one line prefixed with a local `HH:MM:SS.mmm` timestamp.

use std::fmt;

use anyhow::{anyhow, Context, Result};
use tracing::Level;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Crates logging at `info` unless `RUST_LOG` says otherwise.
const DEFAULT_DIRECTIVES: [&str; 3] = ["red_sessiond=info", "red_core=info", "red_session=info"];

const TIMESTAMP_FORMAT: &str = "%H:%M:%S%.3f";

/// Local wall-clock timestamps.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl FormatTime for LocalClock {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", chrono::Local::now().format(TIMESTAMP_FORMAT))
    }
}

/// Builds the filter from `RUST_LOG`, or the default directives when unset.
pub fn env_filter() -> Result<EnvFilter> {
    filter_from(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref())
}

fn filter_from(rust_log: Option<&str>) -> Result<EnvFilter> {
    match rust_log {
        Some(directives) if !directives.trim().is_empty() => {
            EnvFilter::try_new(directives).with_context(|| {
                format!("invalid {} directives '{directives}'", EnvFilter::DEFAULT_ENV)
            })
        }
        _ => Ok(EnvFilter::try_new(DEFAULT_DIRECTIVES.join(","))?),
    }
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_logging() -> Result<()> {
    let writer = std::io::stderr
        .with_max_level(Level::ERROR)
        .or_else(std::io::stdout);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter()?)
        .with_timer(LocalClock)
        .with_writer(writer)
        .with_target(false)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("failed to install logging subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_when_unset() {
        let filter = filter_from(None).unwrap().to_string();
        for directive in DEFAULT_DIRECTIVES {
            assert!(filter.contains(directive), "{filter}");
        }
        assert_eq!(filter_from(Some("  ")).unwrap().to_string(), filter);
    }

    #[test]
    fn test_rust_log_overrides_defaults() {
        let filter = filter_from(Some("red_sessiond=debug")).unwrap().to_string();
        assert!(filter.contains("red_sessiond=debug"), "{filter}");
        assert!(!filter.contains("red_sessiond=info"), "{filter}");
    }

    #[test]
    fn test_invalid_rust_log_is_rejected() {
        let err = filter_from(Some("red_sessiond=loud")).unwrap_err();
        assert!(err.to_string().contains("invalid RUST_LOG directives"));
    }

    #[test]
    fn test_clock_format() {
        let mut text = String::new();
        LocalClock.format_time(&mut Writer::new(&mut text)).unwrap();
        let parts: Vec<&str> = text.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(text.len(), "00:00:00.000".len());
    }
}
