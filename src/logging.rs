//! Terminal logging for the command-line client
//!
//! Library code logs through `tracing`; with its `log` feature enabled and no subscriber
//! installed, those events are forwarded to the `log` facade and end up here.

use crate::error::{GlassboxError, Result};
use env_logger::{Builder, Env};
use log::{self, LevelFilter};
use chrono::Local;
use std::io::Write;
use yansi::Paint;

/// Installs the coloured `env_logger` formatter
///
/// `RUST_LOG` wins over `log_level` when set. Valid levels: error, warn, info, debug, trace.
pub fn init(log_level: &str) -> Result<()> {
    let env = Env::default()
        .filter_or("RUST_LOG", format!("glassbox={}", parse_log_level(log_level)))
        .write_style_or("RUST_LOG_STYLE", "auto");

    Builder::from_env(env)
        .format(|buf, record| writeln!(buf, "{}", format_log(record)))
        .try_init()
        .map_err(|e| GlassboxError::Config(format!("Logger already initialised: {}", e)))
}

/// Formats a record as `[timestamp] LEVEL [target] message`
pub fn format_log(record: &log::Record) -> String {
    let level = match record.level() {
        log::Level::Error => Paint::red("ERROR").bold(),
        log::Level::Warn => Paint::yellow("WARN ").bold(),
        log::Level::Info => Paint::cyan("INFO ").bold(),
        log::Level::Debug => Paint::blue("DEBUG").bold(),
        log::Level::Trace => Paint::new("TRACE"),
    };

    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let target = if !record.target().is_empty() {
        record.target()
    } else {
        record.module_path().unwrap_or("unknown")
    };

    format!("[{}] {} [{}] {}", timestamp, level, target, record.args())
}

/// Parses a level name, falling back to `Warn` so the progress display stays clean
pub fn parse_log_level(level: &str) -> LevelFilter {
    match level.trim().to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Warn,
    }
}
