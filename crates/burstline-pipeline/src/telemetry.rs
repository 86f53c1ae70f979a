//! Tracing initialization for the burstline binary.
//!
//! Call [`init_tracing`] once at program start. The default filter keeps
//! third-party crates at `warn` and raises only the burstline crates to the
//! requested level; `RUST_LOG` overrides the whole filter when set.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Default verbosity for the `--verbose` flag.
pub fn verbosity_level(verbose: bool) -> Level {
    if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

/// Initialize the global tracing subscriber.
///
/// * `json`: emit newline-delimited JSON log lines for log collection
///   pipelines.
/// * `level`: verbosity applied to the burstline crates when `RUST_LOG`
///   is not set.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,burstline={level},burstline_core={level},burstline_pipeline={level}",
            level = level.as_str().to_lowercase()
        ))
    });

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false))
            .try_init()
            .ok();
    }
}
