//! Structured logging for bw-core.
//!
//! Stdout belongs to the command payload; every log line goes to stderr,
//! either as `tracing_subscriber::fmt` console output or as JSONL
//! ([`JsonlLayer`]). Pipeline code logs through [`log_event!`](crate::log_event)
//! so each line carries the run id, snapshot digest and [`Stage`].

pub mod config;
pub mod events;
pub mod layer;

pub use config::{LogConfig, LogFormat, DEFAULT_LEVEL};
pub use events::{event_names, LogContext, LogRecord, Stage};
pub use layer::JsonlLayer;

use std::io::IsTerminal;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. Later calls keep the first one.
pub fn init_logging(config: &LogConfig) {
    // A single global level so the dotted event targets are not filtered
    // out by crate-path directives.
    let filter = EnvFilter::default().add_directive(config.level.into());

    let console = (config.format == LogFormat::Human).then(|| {
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(std::io::stderr().is_terminal());
        if config.timestamps {
            layer.boxed()
        } else {
            layer.without_time().boxed()
        }
    });
    let jsonl = (config.format == LogFormat::Jsonl).then(JsonlLayer::stderr);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(jsonl)
        .try_init();
}

/// Fresh run id: `run-` plus 12 hex chars of a v4 UUID.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("run-{}", &uuid[..12])
}

/// Emit a pipeline event with the run's correlation keys.
///
/// ```ignore
/// log_event!(ctx, INFO, event_names::DECIDE_RECOMMENDED, Stage::Decide,
///     "recommendation ready", interval_seconds = 900.0, method = "poissonProcess");
/// ```
#[macro_export]
macro_rules! log_event {
    ($ctx:expr, $level:ident, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::event!(
            target: $event,
            tracing::Level::$level,
            run_id = $ctx.run_id.as_str(),
            snapshot = $ctx.snapshot_or_dash(),
            stage = $stage.as_str(),
            $($key = $val,)*
            "{}",
            $msg
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_run_id() {
        let a = generate_run_id();
        let b = generate_run_id();
        assert!(a.starts_with("run-"));
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
    }

    #[test]
    fn test_init_logging_twice_is_harmless() {
        let config = LogConfig::default()
            .with_level(tracing_subscriber::filter::LevelFilter::OFF)
            .with_timestamps(false);
        init_logging(&config);
        init_logging(&config.clone().with_level(DEFAULT_LEVEL));
    }

    #[test]
    fn test_log_event_expands_for_every_level() {
        let ctx = LogContext::new("run-test").with_snapshot("abcdef");
        crate::log_event!(ctx, TRACE, event_names::MODEL_FITTED, Stage::Model, "t", n = 1u64);
        crate::log_event!(ctx, DEBUG, event_names::MODEL_FITTED, Stage::Model, "d");
        crate::log_event!(ctx, INFO, event_names::RUN_STARTED, Stage::Ingest, "i");
        crate::log_event!(ctx, WARN, event_names::INGEST_MALFORMED, Stage::Ingest, "w");
        crate::log_event!(ctx, ERROR, event_names::CONFIG_ERROR, Stage::Output, "e");
    }
}
