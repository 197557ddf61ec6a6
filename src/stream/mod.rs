//! Streaming response normalization.
//!
//! Each provider streams newline-delimited, `data: `-prefixed event records,
//! but carries the generated text at a different path inside the event JSON.
//! This module turns the raw byte stream into a sequence of text fragments:
//! buffer bytes into complete lines (a line split across two chunks is
//! reassembled), decode each line against the provider's dialect, and drop
//! everything that is not generated text.
//!
//! Malformed event JSON is skipped, never fatal: an upstream provider that
//! emits one bad frame must not abort an otherwise healthy stream.

use crate::error::{InnsiktError, Result};
use crate::provider::{Dialect, ProviderDescriptor};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use tracing::{debug, trace};

/// Sentinel payload meaning "no more events". Benign, distinct from
/// connection close.
const DONE_SENTINEL: &str = "[DONE]";

/// Accumulates raw byte chunks and yields only complete lines.
///
/// Trailing bytes without a newline stay buffered until the next chunk
/// (or `flush` at end-of-stream), so chunk boundaries never split an
/// event record. Buffering bytes rather than text also keeps a UTF-8
/// codepoint split across chunks intact.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return all complete lines it closed off.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = &raw[..raw.len() - 1];
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            lines.push(String::from_utf8_lossy(line).into_owned());
        }
        lines
    }

    /// Drain any unterminated trailing line at end-of-stream.
    pub fn flush(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        Some(line)
    }
}

/// What one protocol line amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// A fragment of generated text.
    Text(String),
    /// The stream-terminated sentinel. A no-op, not an error.
    Done,
    /// Anything else: keep-alives, `event:` lines, control frames,
    /// malformed JSON.
    Skip,
}

/// Decode one protocol line against a dialect.
pub fn scan_line(dialect: Dialect, line: &str) -> LineEvent {
    let Some(data) = line.strip_prefix("data: ") else {
        return LineEvent::Skip;
    };

    if data == DONE_SENTINEL {
        return LineEvent::Done;
    }

    let Ok(event) = serde_json::from_str::<serde_json::Value>(data) else {
        trace!("Skipping malformed event line");
        return LineEvent::Skip;
    };

    let text = match dialect {
        Dialect::AnthropicSse => {
            if event["type"] == "content_block_delta" && event["delta"]["type"] == "text_delta" {
                event["delta"]["text"].as_str()
            } else {
                None
            }
        }
        Dialect::OpenAiSse => event["choices"][0]["delta"]["content"].as_str(),
        Dialect::GeminiSse => event["candidates"][0]["content"]["parts"][0]["text"].as_str(),
    };

    match text {
        Some(t) => LineEvent::Text(t.to_string()),
        None => LineEvent::Skip,
    }
}

/// A live streaming completion: a lazy, finite, non-restartable sequence
/// of text fragments.
pub struct TextStream {
    body: Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>,
    buffer: LineBuffer,
    pending: VecDeque<String>,
    dialect: Dialect,
    exhausted: bool,
}

impl std::fmt::Debug for TextStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextStream")
            .field("dialect", &self.dialect)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

impl TextStream {
    /// Issue the streaming request and fail fast on a non-2xx response,
    /// before entering the streaming loop.
    pub async fn open(
        client: &reqwest::Client,
        descriptor: &ProviderDescriptor,
        secret: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<Self> {
        let response = descriptor
            .build_request(client, secret, prompt, max_tokens)
            .send()
            .await
            .map_err(classify_transport)?;

        if !response.status().is_success() {
            return Err(classify_status(descriptor, response).await);
        }

        debug!("Opened {} stream", descriptor.display_name);

        Ok(Self {
            body: Box::pin(response.bytes_stream()),
            buffer: LineBuffer::new(),
            pending: VecDeque::new(),
            dialect: descriptor.dialect,
            exhausted: false,
        })
    }

    /// Wrap an already-open body stream speaking the given dialect.
    pub fn from_stream(
        body: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
        dialect: Dialect,
    ) -> Self {
        Self {
            body: Box::pin(body),
            buffer: LineBuffer::new(),
            pending: VecDeque::new(),
            dialect,
            exhausted: false,
        }
    }

    /// Next text fragment, or `None` once the connection closes.
    ///
    /// Fragments arrive in generation order; the caller concatenates them
    /// with no added separators.
    pub async fn next_fragment(&mut self) -> Result<Option<String>> {
        loop {
            while let Some(line) = self.pending.pop_front() {
                match scan_line(self.dialect, &line) {
                    LineEvent::Text(text) => return Ok(Some(text)),
                    LineEvent::Done | LineEvent::Skip => continue,
                }
            }

            if self.exhausted {
                return Ok(None);
            }

            match self.body.next().await {
                Some(Ok(chunk)) => self.pending.extend(self.buffer.push(&chunk)),
                Some(Err(e)) => return Err(classify_transport(e)),
                None => {
                    self.exhausted = true;
                    if let Some(line) = self.buffer.flush() {
                        self.pending.push_back(line);
                    }
                }
            }
        }
    }
}

/// Trait for opening the provider stream of one analysis run.
///
/// A seam over [`TextStream::open`] so a run can be driven from a source
/// other than a live HTTP response.
#[async_trait]
pub trait StreamOpener: Send + Sync {
    async fn open(
        &self,
        descriptor: &ProviderDescriptor,
        secret: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<TextStream>;
}

/// Opener backed by a shared HTTP client.
#[derive(Default)]
pub struct HttpStreamOpener {
    client: reqwest::Client,
}

impl HttpStreamOpener {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StreamOpener for HttpStreamOpener {
    async fn open(
        &self,
        descriptor: &ProviderDescriptor,
        secret: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<TextStream> {
        TextStream::open(&self.client, descriptor, secret, prompt, max_tokens).await
    }
}

/// Map a transport-level failure onto the error taxonomy. A timed-out
/// connection must surface as `Timeout`, not a generic network error.
fn classify_transport(e: reqwest::Error) -> InnsiktError {
    if e.is_timeout() {
        InnsiktError::Timeout
    } else {
        InnsiktError::Network(e.to_string())
    }
}

/// Classify a non-2xx initial response, preferring the provider-supplied
/// error message over a generic status line.
async fn classify_status(
    descriptor: &ProviderDescriptor,
    response: reqwest::Response,
) -> InnsiktError {
    let status = response.status();
    let detail = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| body["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| {
            format!(
                "{} API request failed: {}",
                descriptor.display_name,
                status.as_u16()
            )
        });

    match status.as_u16() {
        401 | 403 => InnsiktError::Auth(detail),
        429 => InnsiktError::RateLimit(detail),
        _ => InnsiktError::Api(detail),
    }
}
