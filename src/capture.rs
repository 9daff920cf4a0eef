// src/capture.rs

//! Fixed-capacity sink for subprocess and HTTP response output.
//!
//! A [`CaptureBuffer`] accepts chunks until the next chunk would push it past
//! its capacity `N`. From then on the buffer is closed: that chunk and every
//! later one are dropped whole without an error, so the retained bytes are
//! always a contiguous prefix of the stream. Readers keep draining their
//! source after the buffer is closed so a child process never blocks on a
//! full pipe.

use std::borrow::Cow;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

/// Capacity used for captured command output.
pub const CMD_OUTPUT_SZ: usize = 2000;

/// Capacity used for HTTP response bodies kept for diagnostics.
pub const RESPONSE_SZ: usize = 2560;

/// Read size used when draining a pipe.
const READ_CHUNK_SZ: usize = 512;

pub type CommandOutput = CaptureBuffer<CMD_OUTPUT_SZ>;
pub type ResponseCapture = CaptureBuffer<RESPONSE_SZ>;

#[derive(Debug, Clone)]
pub struct CaptureBuffer<const N: usize> {
    buf: Vec<u8>,
    chunks: u32,
    dropped: u32,
}

impl<const N: usize> Default for CaptureBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> CaptureBuffer<N> {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(N),
            chunks: 0,
            dropped: 0,
        }
    }

    /// Append a chunk, returning how many bytes were retained (all or none).
    ///
    /// Once a chunk has been dropped nothing more is accepted, even chunks
    /// that would still fit.
    pub fn write(&mut self, chunk: &[u8]) -> usize {
        if chunk.is_empty() {
            return 0;
        }
        if self.is_truncated() || self.buf.len() + chunk.len() > N {
            self.dropped += 1;
            trace!(chunk = chunk.len(), total = self.buf.len(), "chunk dropped");
            return 0;
        }
        self.buf.extend_from_slice(chunk);
        self.chunks += 1;
        trace!(chunk = chunk.len(), total = self.buf.len(), "chunk captured");
        chunk.len()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of chunks that were retained.
    pub fn chunks(&self) -> u32 {
        self.chunks
    }

    /// Number of chunks that were dropped for lack of room.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn is_truncated(&self) -> bool {
        self.dropped > 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Captured bytes as text; invalid UTF-8 is replaced.
    pub fn as_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.buf)
    }

    /// Drain `reader` to EOF into the buffer.
    ///
    /// A read error stops the drain and is returned; whatever was captured up
    /// to that point stays in the buffer.
    pub async fn fill_from<R>(&mut self, mut reader: R) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut chunk = [0u8; READ_CHUNK_SZ];
        loop {
            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                return Ok(());
            }
            self.write(&chunk[..n]);
        }
    }
}
