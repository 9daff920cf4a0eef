// src/logging.rs

//! Logging setup for `adminagent` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log filter:
//! 1. `--log-level`, then `-v`/`-q` on the command line
//! 2. `ADMINAGENT_LOG` environment variable (any `EnvFilter` directive)
//! 3. default to `warn`
//!
//! Records go to the `[log] file` when one is configured, unless `--console`
//! was given; otherwise to stderr.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "ADMINAGENT_LOG";

/// How the global subscriber should be built.
#[derive(Debug, Clone, Default)]
pub struct LogOptions<'a> {
    pub level: Option<LogLevel>,
    pub extended: bool,
    pub file: Option<&'a Path>,
}

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(opts: LogOptions<'_>) -> Result<()> {
    let filter = build_filter(opts.level);

    match opts.file {
        Some(path) => {
            let file = open_log_file(path)?;
            install(filter, opts.extended, false, Mutex::new(file))
        }
        None => install(filter, opts.extended, true, std::io::stderr),
    }
}

fn install<W>(filter: EnvFilter, extended: bool, ansi: bool, writer: W) -> Result<()>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(extended)
        .with_line_number(extended)
        .with_ansi(ansi)
        .with_writer(writer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))
}

fn build_filter(cli_level: Option<LogLevel>) -> EnvFilter {
    match cli_level {
        Some(lvl) => EnvFilter::new(level_directive(lvl)),
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
    }
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating log directory {}", parent.display()))?;
        }
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}

fn level_directive(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
