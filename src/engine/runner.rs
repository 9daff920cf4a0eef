// src/engine/runner.rs

//! Job execution: start a process, supervise it, report once.

use std::io;
use std::process::ExitStatus;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::AsyncRead;
use tokio::process::Child;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, warn};

use crate::capture::CommandOutput;
use crate::notify::Notifier;
use crate::types::{JobState, OutputMode};

use super::job::Job;
use super::launcher::{Launcher, SpawnError};
use super::report::{self, JobOutput};
use super::ExecStrategy;

/// Identifies a started job: engine-local sequence number plus OS pid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobHandle {
    pub id: u64,
    pub pid: u32,
}

/// Result of a job run on the calling task.
#[derive(Debug)]
pub enum PipedResult {
    /// The process could not be started.
    OpenFailed(io::Error),
    /// The process ran; `status` is the wait result.
    Finished {
        status: io::Result<ExitStatus>,
        output: JobOutput,
    },
}

/// Runs jobs and emits exactly one notification for each one it starts.
///
/// Concurrency is unbounded unless `max_concurrent` is non-zero, in which
/// case a job that finds no free slot is rejected as a spawn failure.
pub struct JobEngine {
    launcher: Arc<dyn Launcher>,
    notifier: Notifier,
    limiter: Option<(Arc<Semaphore>, usize)>,
    next_id: AtomicU64,
}

impl JobEngine {
    pub fn new(notifier: Notifier, launcher: Arc<dyn Launcher>, max_concurrent: usize) -> Self {
        let limiter =
            (max_concurrent > 0).then(|| (Arc::new(Semaphore::new(max_concurrent)), max_concurrent));
        Self {
            launcher,
            notifier,
            limiter,
            next_id: AtomicU64::new(1),
        }
    }

    /// Start `job` in its own process and return without waiting.
    ///
    /// A supervising task drains the job's pipes, waits for the exit status,
    /// and sends the completion notification. On `Err` nothing is notified.
    pub fn spawn(&self, job: Job) -> Result<JobHandle, SpawnError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let strategy = ExecStrategy::for_job(&job);

        debug!(
            job = id,
            title = job.title(),
            cmd = %job.command(),
            %strategy,
            state = %JobState::Created,
            "job created"
        );

        let permit = match self.acquire_slot() {
            Ok(permit) => permit,
            Err(e) => {
                warn!(job = id, title = job.title(), error = %e, state = %JobState::SpawnFailed, "job rejected");
                return Err(e);
            }
        };

        if let Some(path) = job.attachment_path() {
            remove_stale_artifact(id, path);
        }

        let child = match self.launcher.launch(&job) {
            Ok(child) => child,
            Err(source) => {
                let e = SpawnError::Launch {
                    command: job.command().to_string(),
                    source,
                };
                error!(job = id, title = job.title(), error = %e, state = %JobState::SpawnFailed, "job spawn failed");
                return Err(e);
            }
        };

        let Some(pid) = child.id() else {
            error!(job = id, title = job.title(), state = %JobState::SpawnFailed, "job process has no pid");
            return Err(SpawnError::NoPid);
        };

        info!(job = id, pid, title = job.title(), %strategy, state = %JobState::Running, "job started");

        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let (status, output) = supervise(child).await;
            complete(&notifier, id, job, &status, &output);
        });

        Ok(JobHandle { id, pid })
    }

    /// Run `job` to completion on the calling task and send its report
    /// before returning.
    pub async fn run_piped(&self, job: Job) -> PipedResult {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(
            job = id,
            title = job.title(),
            cmd = %job.command(),
            strategy = %ExecStrategy::Piped,
            "piped job started"
        );

        let result = match self.launcher.launch(&job) {
            Ok(child) => {
                let (status, output) = supervise(child).await;
                PipedResult::Finished { status, output }
            }
            Err(e) => {
                error!(job = id, title = job.title(), error = %e, "pipe open failed");
                PipedResult::OpenFailed(e)
            }
        };

        let text = match &result {
            PipedResult::OpenFailed(e) => report::open_failure_text(e),
            PipedResult::Finished { status, output } => {
                report::completion_text(job.title(), OutputMode::Text, status, output)
            }
        };

        if let Err(e) = self
            .notifier
            .send_report(job.chat_id(), text, job.response_to())
        {
            error!(job = id, chat = job.chat_id(), error = %e, "failed to queue piped job report");
        }

        result
    }

    fn acquire_slot(&self) -> Result<Option<OwnedSemaphorePermit>, SpawnError> {
        match &self.limiter {
            None => Ok(None),
            Some((sem, limit)) => Arc::clone(sem)
                .try_acquire_owned()
                .map(Some)
                .map_err(|_| SpawnError::Saturated { limit: *limit }),
        }
    }
}

/// Drain both pipes concurrently, then reap the child.
async fn supervise(mut child: Child) -> (io::Result<ExitStatus>, JobOutput) {
    let mut output = JobOutput::default();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    tokio::join!(
        drain(stdout, &mut output.stdout),
        drain(stderr, &mut output.stderr)
    );

    let status = child.wait().await;
    (status, output)
}

async fn drain<R>(pipe: Option<R>, buf: &mut CommandOutput)
where
    R: AsyncRead + Unpin,
{
    if let Some(pipe) = pipe {
        if let Err(e) = buf.fill_from(pipe).await {
            warn!(error = %e, captured = buf.len(), "pipe read failed; keeping partial output");
        }
    }
}

fn complete(
    notifier: &Notifier,
    id: u64,
    job: Job,
    status: &io::Result<ExitStatus>,
    output: &JobOutput,
) {
    match status {
        Ok(s) => info!(job = id, title = job.title(), exit = %report::describe_status(s), success = s.success(), "job process exited"),
        Err(e) => warn!(job = id, title = job.title(), error = %e, "waiting for job process failed"),
    }

    let succeeded = matches!(status, Ok(s) if s.success());
    let queued = match (job.output_mode(), job.attachment_path()) {
        (OutputMode::Document, Some(path)) if succeeded => notifier.send_document(
            job.chat_id(),
            path,
            job.title(),
            job.response_to(),
        ),
        _ => notifier.send_report(
            job.chat_id(),
            report::completion_text(job.title(), job.output_mode(), status, output),
            job.response_to(),
        ),
    };

    match queued {
        Ok(()) => info!(job = id, chat = job.chat_id(), state = %JobState::Completed, "job completed"),
        Err(e) => error!(job = id, chat = job.chat_id(), error = %e, "failed to queue job notification"),
    }
}

fn remove_stale_artifact(id: u64, path: &std::path::Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(job = id, path = %path.display(), "removed stale artifact"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(job = id, path = %path.display(), error = %e, "could not remove stale artifact"),
    }
}
