//! Log output for the CLI.
//!
//! The library crates log through the `log` facade. `init_logging` installs a
//! `tracing-subscriber` fmt layer on stderr, which also receives `log`
//! records through the subscriber's `tracing-log` bridge.
//!
//! | Flag   | Level |
//! |--------|-------|
//! | `-q`   | warn  |
//! | (none) | info  |
//! | `-v`   | debug |
//! | `-vv`  | trace |
//!
//! `RUST_LOG` replaces the flag-derived filter when set.

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const OWN_CRATES: [&str; 3] = ["stockback_cli", "stockback_recon", "stockback_io"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    pub level: Level,
    pub with_ansi: bool,
}

impl LogConfig {
    pub fn from_flags(verbosity: u8, quiet: bool) -> Self {
        let level = match (quiet, verbosity) {
            (true, _) => Level::WARN,
            (false, 0) => Level::INFO,
            (false, 1) => Level::DEBUG,
            (false, _) => Level::TRACE,
        };
        Self { level, with_ansi: false }
    }
}

/// Filter directive string: our crates at `level`, everything else at warn.
pub fn default_directives(level: Level) -> String {
    let level = level.as_str().to_lowercase();
    let mut directives = vec!["warn".to_string()];
    directives.extend(OWN_CRATES.iter().map(|c| format!("{c}={level}")));
    directives.join(",")
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config.level)));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.with_ansi)
        .with_target(false)
        .without_time();

    if tracing_subscriber::registry().with(filter).with(layer).try_init().is_err() {
        log::debug!("logging already initialised");
    }
}
