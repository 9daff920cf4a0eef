// src/notify/message.rs

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::types::ReportMode;

/// Longest text the messaging endpoint accepts in one message.
pub const MAX_MESSAGE_LEN: usize = 4096;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification has no target chat")]
    MissingChat,

    #[error("notification text is empty")]
    MissingText,

    #[error("document notification has no file path")]
    MissingDocument,

    #[error("notification queue is closed")]
    QueueClosed,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("payload encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationBody {
    Text { text: String, mode: ReportMode },
    Document { path: PathBuf, caption: String },
}

/// One outbound message, consumed by exactly one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub chat_id: u32,
    pub reply_to: Option<u32>,
    pub body: NotificationBody,
}

impl Notification {
    /// Build a text notification. `reply_to == 0` means "not a reply".
    pub fn text(
        chat_id: u32,
        text: impl Into<String>,
        mode: ReportMode,
        reply_to: u32,
    ) -> Result<Self, NotifyError> {
        if chat_id == 0 {
            return Err(NotifyError::MissingChat);
        }
        let text = text.into();
        if text.is_empty() {
            return Err(NotifyError::MissingText);
        }
        let text = truncate_text(&text, MAX_MESSAGE_LEN).to_string();
        Ok(Self {
            chat_id,
            reply_to: reply_id(reply_to),
            body: NotificationBody::Text { text, mode },
        })
    }

    /// Build a document notification. `reply_to == 0` means "not a reply".
    pub fn document(
        chat_id: u32,
        path: impl Into<PathBuf>,
        caption: impl Into<String>,
        reply_to: u32,
    ) -> Result<Self, NotifyError> {
        if chat_id == 0 {
            return Err(NotifyError::MissingChat);
        }
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(NotifyError::MissingDocument);
        }
        Ok(Self {
            chat_id,
            reply_to: reply_id(reply_to),
            body: NotificationBody::Document {
                path,
                caption: caption.into(),
            },
        })
    }

    pub fn mode(&self) -> ReportMode {
        match &self.body {
            NotificationBody::Text { mode, .. } => *mode,
            NotificationBody::Document { .. } => ReportMode::Document,
        }
    }

    /// Text of a text notification, `None` for documents.
    pub fn text_body(&self) -> Option<&str> {
        match &self.body {
            NotificationBody::Text { text, .. } => Some(text),
            NotificationBody::Document { .. } => None,
        }
    }
}

fn reply_id(reply_to: u32) -> Option<u32> {
    (reply_to != 0).then_some(reply_to)
}

/// JSON body of `sendMessage`.
#[derive(Debug, Serialize)]
pub struct SendMessagePayload<'a> {
    pub chat_id: u32,
    pub text: &'a str,
    pub parse_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_parameters: Option<ReplyParameters>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReplyParameters {
    pub message_id: u32,
}

impl ReplyParameters {
    pub fn from_reply_to(reply_to: Option<u32>) -> Option<Self> {
        reply_to.map(|message_id| Self { message_id })
    }
}

/// Longest prefix of `s` that is at most `max` bytes and ends on a char
/// boundary.
pub fn truncate_text(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
