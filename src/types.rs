// src/types.rs

use std::fmt;

use serde::Deserialize;

/// Formatting applied to an outbound notification.
///
/// The three text modes map onto the endpoint's `parse_mode` field; `Document`
/// switches the submission from a JSON body to a multipart upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    #[default]
    #[serde(alias = "plain")]
    Markdown,
    MarkdownV2,
    Html,
    Document,
}

impl ReportMode {
    /// Value of the `parse_mode` field for this mode.
    ///
    /// Documents carry a caption that is sent unformatted, so they fall back to
    /// the plain markdown dialect.
    pub fn parse_mode(self) -> &'static str {
        match self {
            ReportMode::Markdown | ReportMode::Document => "Markdown",
            ReportMode::MarkdownV2 => "MarkdownV2",
            ReportMode::Html => "HTML",
        }
    }
}

/// What a job sends when it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// A short "done" line; command output is discarded.
    #[default]
    None,
    /// Captured stdout/stderr inlined into the report text.
    #[serde(alias = "inline")]
    Text,
    /// A file produced by the command is uploaded as a document.
    Document,
}

/// Lifecycle of a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    Running,
    Completed,
    SpawnFailed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Created => "created",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::SpawnFailed => "spawn-failed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mode_strings_match_endpoint_names() {
        assert_eq!(ReportMode::Markdown.parse_mode(), "Markdown");
        assert_eq!(ReportMode::MarkdownV2.parse_mode(), "MarkdownV2");
        assert_eq!(ReportMode::Html.parse_mode(), "HTML");
    }
}
