// src/facade.rs

//! The five operations exposed to the RPC layer.
//!
//! Each operation validates its input, builds one or more [`Job`]s from the
//! configuration and hands them to the [`JobEngine`]. Validation and spawn
//! failures are returned synchronously and never produce a notification;
//! everything after a successful start is reported to the chat only.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::model::{artifact_path, expand_placeholders};
use crate::config::ConfigFile;
use crate::engine::{CommandLine, Job, JobEngine, JobError, JobHandle, PipedResult, SpawnError};
use crate::orders::{OrderIdSet, OrderSetError};
use crate::types::OutputMode;

/// `EINVAL`, returned for requests that fail validation.
pub const STATUS_INVALID: i32 = -22;

/// Returned when a process could not be started.
pub const STATUS_SPAWN_FAILED: i32 = -1;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("invalid order list: {0}")]
    Orders(#[from] OrderSetError),

    #[error("invalid job: {0}")]
    Job(#[from] JobError),

    #[error(transparent)]
    Spawn(#[from] SpawnError),
}

impl DispatchError {
    /// RPC status code for this rejection.
    pub fn status_code(&self) -> i32 {
        match self {
            DispatchError::UnknownCommand(_) => 0,
            DispatchError::Orders(_) | DispatchError::Job(_) => STATUS_INVALID,
            DispatchError::Spawn(_) => STATUS_SPAWN_FAILED,
        }
    }
}

/// Who hears about a job: the chat, and optionally the message it answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub chat: u32,
    /// Message id to reply to; `0` means a plain message.
    pub reply_to: u32,
}

impl Target {
    pub fn reply(chat: u32, reply_to: u32) -> Self {
        Self { chat, reply_to }
    }
}

impl From<u32> for Target {
    fn from(chat: u32) -> Self {
        Self { chat, reply_to: 0 }
    }
}

/// Entry point for RPC requests.
pub struct Dispatcher {
    config: Arc<ConfigFile>,
    engine: JobEngine,
}

impl Dispatcher {
    pub fn new(config: Arc<ConfigFile>, engine: JobEngine) -> Self {
        Self { config, engine }
    }

    /// Run the named maintenance command from `[commands.<name>]`.
    pub fn run_command(&self, name: &str, target: Target) -> Result<JobHandle, DispatchError> {
        let Target { chat, reply_to } = target;
        let Some(command) = self.config.commands.get(name) else {
            warn!(command = name, chat, "unknown command rejected");
            return Err(DispatchError::UnknownCommand(name.to_string()));
        };

        let title = command.title.clone().unwrap_or_else(|| name.to_string());
        let line = self.config.expand(&command.cmd);
        let job = self
            .build(Job::new(chat, title, CommandLine::shell(line)))?
            .reply_to(reply_to)
            .with_output(command.output)
            .map_err(|e| self.reject("run", chat, e))?;

        self.start("run", job)
    }

    /// Report the last `count` lines of the configured log file.
    ///
    /// Runs to completion before returning; `count` below 1 is treated as 1.
    pub async fn tail(&self, count: i32, target: Target) -> Result<PipedResult, DispatchError> {
        let Target { chat, reply_to } = target;
        let count = count.max(1);
        let log = self.config.paths.tail_log.to_string_lossy().into_owned();
        let job = self.build(Job::new(
            chat,
            format!("Tail({count})"),
            CommandLine::exec("tail", ["-n".to_string(), count.to_string(), log]),
        ))?;
        let job = job
            .reply_to(reply_to)
            .with_output(OutputMode::Text)
            .map_err(|e| self.reject("tail", chat, e))?;

        info!(count, chat, "tail requested");
        Ok(self.engine.run_piped(job).await)
    }

    /// Update the source tree in a process of its own.
    pub fn pull(&self, target: Target) -> Result<JobHandle, DispatchError> {
        let Target { chat, reply_to } = target;
        let line = self.config.expand(&self.config.pull.cmd);
        let job = self
            .build(Job::new(chat, self.config.pull.title.clone(), CommandLine::shell(line)))?
            .reply_to(reply_to)
            .in_dir(&self.config.paths.git)
            .with_output(OutputMode::Text)
            .map_err(|e| self.reject("pull", chat, e))?;

        self.start("pull", job)
    }

    /// Start one export job per order; each uploads its own artifact.
    ///
    /// Returns how many jobs were started. Ids whose job cannot be built or
    /// started are logged and skipped; the others still run.
    pub fn export(&self, target: Target, orders: &OrderIdSet) -> Result<usize, DispatchError> {
        let Target { chat, reply_to } = target;
        if chat == 0 {
            return Err(self.reject("export", chat, JobError::MissingChat));
        }

        let template = self.config.expand(&self.config.export.cmd);
        let mut started = 0;

        for order in orders.iter() {
            let order_arg = order.to_string();
            let line = expand_placeholders(&template, &[("order", order_arg.as_str())]);
            let job = match Job::new(
                chat,
                format!("{} #{order}", self.config.export.title),
                CommandLine::shell(line),
            ) {
                Ok(job) => job
                    .reply_to(reply_to)
                    .attach(artifact_path(&self.config, order)),
                Err(e) => {
                    warn!(order, chat, error = %e, "export job rejected; skipping order");
                    continue;
                }
            };

            match self.engine.spawn(job) {
                Ok(handle) => {
                    info!(order, chat, job = handle.id, pid = handle.pid, "export started");
                    started += 1;
                }
                Err(e) => {
                    warn!(order, chat, error = %e, "export spawn failed; skipping order");
                }
            }
        }

        info!(chat, requested = orders.len(), started, "export dispatched");
        Ok(started)
    }

    /// Start one job that clears every order in `orders`.
    pub fn clear(&self, target: Target, orders: &OrderIdSet) -> Result<JobHandle, DispatchError> {
        let Target { chat, reply_to } = target;
        let template = self.config.expand(&self.config.clear.cmd);
        let ids = orders.to_args();
        let line = expand_placeholders(&template, &[("orders", ids.as_str())]);
        let job = self
            .build(Job::new(chat, self.config.clear.title.clone(), CommandLine::shell(line)))?
            .reply_to(reply_to)
            .with_output(self.config.clear.output)
            .map_err(|e| self.reject("clear", chat, e))?;

        self.start("clear", job)
    }

    fn build(&self, job: Result<Job, JobError>) -> Result<Job, DispatchError> {
        job.map_err(|e| {
            warn!(error = %e, "job rejected");
            DispatchError::Job(e)
        })
    }

    fn reject(&self, op: &str, chat: u32, e: JobError) -> DispatchError {
        warn!(op, chat, error = %e, "job rejected");
        DispatchError::Job(e)
    }

    fn start(&self, op: &str, job: Job) -> Result<JobHandle, DispatchError> {
        let chat = job.chat_id();
        let handle = self.engine.spawn(job)?;
        info!(op, chat, job = handle.id, pid = handle.pid, "job accepted");
        Ok(handle)
    }
}
