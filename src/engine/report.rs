// src/engine/report.rs

//! Report text for completed jobs.

use std::io;
use std::process::ExitStatus;

use crate::capture::CommandOutput;
use crate::notify::message::truncate_text;
use crate::notify::MAX_MESSAGE_LEN;
use crate::types::OutputMode;

/// Output captured from a job's pipes.
#[derive(Debug, Clone, Default)]
pub struct JobOutput {
    pub stdout: CommandOutput,
    pub stderr: CommandOutput,
}

impl JobOutput {
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }

    pub fn is_truncated(&self) -> bool {
        self.stdout.is_truncated() || self.stderr.is_truncated()
    }

    /// stdout followed by stderr, trailing whitespace trimmed.
    pub fn combined(&self) -> String {
        let out = self.stdout.as_text();
        let err = self.stderr.as_text();
        [out.trim_end(), err.trim_end()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Report for a process that could not be started at all (pipe open failure).
pub fn open_failure_text(err: &io::Error) -> String {
    format!("🛑 ERR({}): {}", err.raw_os_error().unwrap_or(-1), err)
}

/// Report for a process that was started and has finished (or could not be
/// waited on).
pub fn completion_text(
    title: &str,
    mode: OutputMode,
    status: &io::Result<ExitStatus>,
    output: &JobOutput,
) -> String {
    let status = match status {
        Ok(status) => status,
        Err(e) => return format!("🛑 {title}: {e}"),
    };

    if !status.success() {
        let mut text = format!("⚠️ {title}: {}", describe_status(status));
        if !output.is_empty() {
            push_block(&mut text, output);
        }
        return text;
    }

    match mode {
        OutputMode::Text if !output.is_empty() => {
            let mut text = format!("✅ {title}");
            push_block(&mut text, output);
            text
        }
        OutputMode::Text => format!("✅ {title}: done, no output"),
        OutputMode::None | OutputMode::Document => format!("✅ {title}: done"),
    }
}

pub fn describe_status(status: &ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exited with code {code}"),
        None => "terminated by a signal".to_string(),
    }
}

const FENCE_OPEN: &str = "\n```\n";
const FENCE_CLOSE: &str = "\n```";
const TRUNCATED_NOTE: &str = "\n(output truncated)";

/// Append the output as a fenced block. The block is cut so that the whole
/// message, closing fence included, stays within [`MAX_MESSAGE_LEN`].
fn push_block(text: &mut String, output: &JobOutput) {
    let combined = output.combined();
    let budget = MAX_MESSAGE_LEN
        .saturating_sub(text.len() + FENCE_OPEN.len() + FENCE_CLOSE.len() + TRUNCATED_NOTE.len());
    let body = truncate_text(&combined, budget);

    text.push_str(FENCE_OPEN);
    text.push_str(body);
    text.push_str(FENCE_CLOSE);
    if output.is_truncated() || body.len() < combined.len() {
        text.push_str(TRUNCATED_NOTE);
    }
}
