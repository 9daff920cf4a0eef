// src/engine/mod.rs

//! Job execution engine.
//!
//! - [`job`] defines the [`Job`] value and its validation.
//! - [`launcher`] is the process creation seam ([`Launcher`]).
//! - [`runner`] owns [`JobEngine`], which starts jobs, supervises their
//!   processes and emits the completion notification.
//! - [`report`] formats completion text.
//!
//! Every job runs in its own OS process. Jobs that must not touch the agent's
//! working directory (pull) get their directory through
//! `Command::current_dir`, so the agent process itself never calls `chdir`.

use std::fmt;

pub mod job;
pub mod launcher;
pub mod report;
pub mod runner;

pub use job::{CommandLine, Job, JobError, MAX_COMMAND_LEN, MAX_TITLE_LEN};
pub use launcher::{Launcher, SpawnError, SystemLauncher};
pub use report::JobOutput;
pub use runner::{JobEngine, JobHandle, PipedResult};

/// How a job is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStrategy {
    /// Detached process supervised by a background task.
    Worker,
    /// Like `Worker`, in a separate working directory.
    Isolated,
    /// Runs on the caller's task; the caller waits for the report.
    Piped,
}

impl ExecStrategy {
    /// Strategy for a job handed to [`JobEngine::spawn`].
    pub fn for_job(job: &Job) -> Self {
        if job.working_dir().is_some() {
            ExecStrategy::Isolated
        } else {
            ExecStrategy::Worker
        }
    }
}

impl fmt::Display for ExecStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecStrategy::Worker => "worker",
            ExecStrategy::Isolated => "isolated",
            ExecStrategy::Piped => "piped",
        };
        f.write_str(s)
    }
}
