// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `adminagent`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "adminagent",
    version,
    about = "Run admin jobs on request and report their results to a chat.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// Overrides `-v`/`-q`. If neither is given, `ADMINAGENT_LOG` or `warn`
    /// is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Raise verbosity one level per occurrence (`-v` info, `-vv` debug, ...).
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long)]
    pub quiet: bool,

    /// Include source file and line in log records.
    #[arg(short = 'x', long)]
    pub extended_log: bool,

    /// Log to stderr even when `[log] file` is configured.
    #[arg(short, long)]
    pub console: bool,

    /// Load and validate the config, print the command table, then exit.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Level requested on the command line, if any.
    pub fn requested_level(&self) -> Option<LogLevel> {
        if let Some(level) = self.log_level {
            return Some(level);
        }
        if self.quiet {
            return Some(LogLevel::Error);
        }
        match self.verbose {
            0 => None,
            1 => Some(LogLevel::Info),
            2 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("adminagent").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let a = args(&[]);
        assert_eq!(a.config, default_config_path());
        assert_eq!(a.requested_level(), None);
        assert!(!a.dry_run);
    }

    #[test]
    fn verbosity_counts() {
        assert_eq!(args(&["-v"]).requested_level(), Some(LogLevel::Info));
        assert_eq!(args(&["-vv"]).requested_level(), Some(LogLevel::Debug));
        assert_eq!(args(&["-vvvv"]).requested_level(), Some(LogLevel::Trace));
        assert_eq!(args(&["-q"]).requested_level(), Some(LogLevel::Error));
    }

    #[test]
    fn explicit_level_wins() {
        let a = args(&["-vv", "--log-level", "warn"]);
        assert_eq!(a.requested_level(), Some(LogLevel::Warn));
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(CliArgs::try_parse_from(["adminagent", "-v", "-q"]).is_err());
    }
}
