// src/notify/transport.rs

//! Pluggable delivery backend.
//!
//! The dispatcher talks to a `Transport` instead of a concrete HTTP client, so
//! tests can record notifications without a network. Production code uses
//! [`HttpTransport`].

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use tokio::fs::File;
use tracing::{debug, trace, warn};

use crate::capture::ResponseCapture;
use crate::config::TelegramSection;
use crate::notify::message::{
    Notification, NotificationBody, NotifyError, ReplyParameters, SendMessagePayload,
};
use crate::types::ReportMode;

pub type DeliveryFuture = Pin<Box<dyn Future<Output = Result<Delivery, NotifyError>> + Send>>;

/// What the endpoint answered. Kept for diagnostics only.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub status: u16,
    pub chunks: u32,
    pub body: String,
}

impl Delivery {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait abstracting how a notification reaches the endpoint.
///
/// The returned future must not borrow `self`: the dispatcher moves it into
/// its own delivery task.
pub trait Transport: Send + Sync + 'static {
    fn deliver(&self, notification: Notification) -> DeliveryFuture;
}

/// Delivery over the messaging endpoint's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base: String,
}

impl HttpTransport {
    /// `base` is the endpoint prefix, e.g. `https://api.telegram.org/bot<token>`.
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base: base.into(),
        }
    }

    pub fn from_config(cfg: &TelegramSection) -> Self {
        Self::new(cfg.endpoint_base())
    }

    /// Use a client that gives up on unreachable endpoints after `timeout`.
    ///
    /// Only connection setup is bounded; a slow upload runs to completion.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Result<Self, NotifyError> {
        self.client = Client::builder().connect_timeout(timeout).build()?;
        Ok(self)
    }
}

impl Transport for HttpTransport {
    fn deliver(&self, notification: Notification) -> DeliveryFuture {
        let client = self.client.clone();
        let base = self.base.clone();

        Box::pin(async move {
            let Notification {
                chat_id,
                reply_to,
                body,
            } = notification;

            match body {
                NotificationBody::Text { text, mode } => {
                    send_message(&client, &base, chat_id, reply_to, &text, mode).await
                }
                NotificationBody::Document { path, caption } => {
                    send_document(&client, &base, chat_id, reply_to, &path, &caption).await
                }
            }
        })
    }
}

async fn send_message(
    client: &Client,
    base: &str,
    chat_id: u32,
    reply_to: Option<u32>,
    text: &str,
    mode: ReportMode,
) -> Result<Delivery, NotifyError> {
    let payload = SendMessagePayload {
        chat_id,
        text,
        parse_mode: mode.parse_mode(),
        reply_parameters: ReplyParameters::from_reply_to(reply_to),
    };
    trace!(chat = chat_id, payload = ?payload, "sendMessage");

    let resp = client
        .post(format!("{base}/sendMessage"))
        .json(&payload)
        .send()
        .await?;

    read_response(resp).await
}

/// Upload a file as a document.
///
/// If the file cannot be opened or stat'd the upload degrades to a text
/// report describing the problem, so the chat still hears about the job.
async fn send_document(
    client: &Client,
    base: &str,
    chat_id: u32,
    reply_to: Option<u32>,
    path: &Path,
    caption: &str,
) -> Result<Delivery, NotifyError> {
    let (file, len) = match open_document(path).await {
        Ok(opened) => opened,
        Err(e) => {
            warn!(
                chat = chat_id,
                path = %path.display(),
                error = %e,
                "document unavailable; sending text report instead"
            );
            let text = format!("🛑 {caption}: cannot read `{}`: {e}", path.display());
            return send_message(client, base, chat_id, reply_to, &text, ReportMode::Markdown)
                .await;
        }
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());

    debug!(chat = chat_id, path = %path.display(), size = len, "sendDocument");

    let part = Part::stream_with_length(Body::from(file), len).file_name(file_name);
    let mut form = Form::new()
        .part("document", part)
        .text("caption", caption.to_string());
    if let Some(reply) = ReplyParameters::from_reply_to(reply_to) {
        form = form.text("reply_parameters", serde_json::to_string(&reply)?);
    }

    let resp = client
        .post(format!("{base}/sendDocument"))
        .query(&[("chat_id", chat_id)])
        .multipart(form)
        .send()
        .await?;

    read_response(resp).await
}

async fn open_document(path: &Path) -> std::io::Result<(File, u64)> {
    let file = File::open(path).await?;
    let meta = file.metadata().await?;
    if !meta.is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a regular file",
        ));
    }
    Ok((file, meta.len()))
}

/// Capture the (bounded) response body. The body is never interpreted.
async fn read_response(mut resp: Response) -> Result<Delivery, NotifyError> {
    let status = resp.status();
    let mut capture = ResponseCapture::new();

    while let Some(chunk) = resp.chunk().await? {
        capture.write(&chunk);
    }

    trace!(
        status = status.as_u16(),
        chunks = capture.chunks(),
        size = capture.len(),
        body = %capture.as_text(),
        "endpoint response"
    );

    Ok(Delivery {
        status: status.as_u16(),
        chunks: capture.chunks(),
        body: capture.as_text().into_owned(),
    })
}
