//! Stderr logger for the `log` facade.
//!
//! Lines look like `[  0.012s DEBUG curvature] message`: elapsed time since
//! installation, the level and the emitting module (without the crate
//! prefix). Install once at startup with [`init_with_level`].

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

struct LaneLogger {
    level: LevelFilter,
    started: Instant,
}

impl LaneLogger {
    fn short_target<'a>(&self, target: &'a str) -> &'a str {
        target.rsplit("::").next().unwrap_or(target)
    }
}

impl Log for LaneLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let elapsed = self.started.elapsed().as_secs_f64();
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "[{:7.3}s {:>5} {}] {}",
            elapsed,
            record.level(),
            self.short_target(record.target()),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<LaneLogger> = OnceLock::new();

/// Install the stderr logger with the given level filter.
///
/// Only the first call installs the logger; later calls keep the original
/// level and return `Ok(())`.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| LaneLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Install a `tracing` subscriber that records estimator spans.
///
/// The filter comes from `RUST_LOG` and falls back to `info`. With `json`
/// set, events are flattened JSON objects, one per line.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    init_tracing_with_default(json, "info");
}

/// Like [`init_tracing`], with `default_directive` used when `RUST_LOG` is unset.
#[cfg(feature = "tracing")]
pub fn init_tracing_with_default(json: bool, default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE);
    if json {
        let _ = builder.json().flatten_event(true).finish().try_init();
    } else {
        let _ = builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init();
    }
}
