// src/errors.rs

//! Configuration errors and the crate `Result` alias.
//!
//! Runtime failures have their own enums next to the code that raises them
//! (`DispatchError`, `SpawnError`, `NotifyError`, `JobError`).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parsing error in {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, AgentError>;
