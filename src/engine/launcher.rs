// src/engine/launcher.rs

//! Process creation seam.
//!
//! The engine never calls `Command::spawn` directly; it asks a [`Launcher`].
//! Production uses [`SystemLauncher`]; tests substitute launchers that fail
//! for selected jobs so spawn failures can be exercised deterministically.

use std::io;

use thiserror::Error;
use tokio::process::Child;

use super::job::Job;

#[derive(Error, Debug)]
pub enum SpawnError {
    #[error("failed to launch '{command}': {source}")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("job limit reached ({limit} running)")]
    Saturated { limit: usize },

    #[error("launched process has no pid")]
    NoPid,
}

impl SpawnError {
    /// OS error number, when there is one.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            SpawnError::Launch { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}

pub trait Launcher: Send + Sync + 'static {
    /// Start the job's process. Must not wait for it.
    fn launch(&self, job: &Job) -> io::Result<Child>;
}

/// Launches jobs as real OS processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn launch(&self, job: &Job) -> io::Result<Child> {
        job.to_command().spawn()
    }
}
