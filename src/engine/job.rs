// src/engine/job.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;

use crate::types::OutputMode;

/// Longest accepted job title, in bytes.
pub const MAX_TITLE_LEN: usize = 128;

/// Longest accepted rendered command line, in bytes.
pub const MAX_COMMAND_LEN: usize = 512;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("job has no target chat")]
    MissingChat,

    #[error("job title is {len} bytes (max {max})")]
    TitleTooLong { len: usize, max: usize },

    #[error("command line is {len} bytes (max {max})")]
    CommandTooLong { len: usize, max: usize },

    #[error("document output requires an attachment path")]
    MissingAttachment,
}

/// External invocation of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// Run through `sh -c`.
    Shell(String),
    /// Run `program` directly with `args`; nothing is shell-interpreted.
    Exec { program: String, args: Vec<String> },
}

impl CommandLine {
    pub fn shell(line: impl Into<String>) -> Self {
        CommandLine::Shell(line.into())
    }

    pub fn exec<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandLine::Exec {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Build the process command. Stdio is left to the caller.
    pub fn to_command(&self) -> Command {
        match self {
            CommandLine::Shell(line) => {
                let mut c = Command::new("sh");
                c.arg("-c").arg(line);
                c
            }
            CommandLine::Exec { program, args } => {
                let mut c = Command::new(program);
                c.args(args);
                c
            }
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandLine::Shell(line) => f.write_str(line),
            CommandLine::Exec { program, args } => {
                f.write_str(program)?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
        }
    }
}

/// One unit of asynchronous work.
///
/// Built and validated by the façade, then moved into the task that runs it;
/// nothing else holds a reference once it has been handed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    chat_id: u32,
    response_to: u32,
    title: String,
    command: CommandLine,
    output_mode: OutputMode,
    attachment_path: Option<PathBuf>,
    working_dir: Option<PathBuf>,
}

impl Job {
    pub fn new(
        chat_id: u32,
        title: impl Into<String>,
        command: CommandLine,
    ) -> Result<Self, JobError> {
        if chat_id == 0 {
            return Err(JobError::MissingChat);
        }

        let title = title.into();
        if title.len() > MAX_TITLE_LEN {
            return Err(JobError::TitleTooLong {
                len: title.len(),
                max: MAX_TITLE_LEN,
            });
        }

        let len = command.to_string().len();
        if len > MAX_COMMAND_LEN {
            return Err(JobError::CommandTooLong {
                len,
                max: MAX_COMMAND_LEN,
            });
        }

        Ok(Self {
            chat_id,
            response_to: 0,
            title,
            command,
            output_mode: OutputMode::None,
            attachment_path: None,
            working_dir: None,
        })
    }

    /// Correlate the completion message with an earlier message id.
    pub fn reply_to(mut self, message_id: u32) -> Self {
        self.response_to = message_id;
        self
    }

    /// Select `None` or `Text` output. `Document` needs [`Job::attach`].
    pub fn with_output(mut self, mode: OutputMode) -> Result<Self, JobError> {
        if mode == OutputMode::Document && self.attachment_path.is_none() {
            return Err(JobError::MissingAttachment);
        }
        self.output_mode = mode;
        Ok(self)
    }

    /// Upload `path` as a document when the job succeeds.
    pub fn attach(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachment_path = Some(path.into());
        self.output_mode = OutputMode::Document;
        self
    }

    /// Run the command in `dir` instead of the agent's working directory.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn chat_id(&self) -> u32 {
        self.chat_id
    }

    pub fn response_to(&self) -> u32 {
        self.response_to
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn command(&self) -> &CommandLine {
        &self.command
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    pub fn attachment_path(&self) -> Option<&Path> {
        self.attachment_path.as_deref()
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Whether stdout should be piped and captured.
    pub fn captures_stdout(&self) -> bool {
        self.output_mode == OutputMode::Text
    }

    /// Process command with stdio and working directory applied.
    ///
    /// stdout is piped only for `Text` output; stderr is always piped so
    /// failures can be reported.
    pub fn to_command(&self) -> Command {
        let mut cmd = self.command.to_command();
        cmd.stdin(Stdio::null())
            .stdout(if self.captures_stdout() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}
