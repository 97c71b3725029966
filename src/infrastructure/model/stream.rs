//! Newline-delimited JSON stream decoding for Ollama's streamed `/api/chat`.

use super::types::{ChatBackendError, ChunkStream};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::collections::VecDeque;

/// Splits raw bytes into complete lines, buffering partial lines across
/// network chunks.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line).trim().to_string();
            if !text.is_empty() {
                lines.push(text);
            }
        }
        lines
    }

    /// Returns the trailing line when the stream ends without a newline.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        let text = String::from_utf8_lossy(&rest).trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Debug, Deserialize)]
struct StreamLine {
    #[serde(default)]
    message: Option<StreamMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamMessage {
    #[serde(default)]
    content: String,
}

enum LineEvent {
    Text(String),
    Skip,
    Done(Option<String>),
}

fn decode_line(provider: &str, line: &str) -> Result<LineEvent, ChatBackendError> {
    let parsed: StreamLine = serde_json::from_str(line).map_err(|err| {
        ChatBackendError::invalid_response(provider, format!("bad stream line: {err}"))
    })?;
    if let Some(message) = parsed.error {
        return Err(ChatBackendError::backend(provider, message));
    }
    let text = parsed
        .message
        .map(|message| message.content)
        .filter(|content| !content.is_empty());
    if parsed.done {
        return Ok(LineEvent::Done(text));
    }
    Ok(match text {
        Some(text) => LineEvent::Text(text),
        None => LineEvent::Skip,
    })
}

struct DecodeState<S> {
    bytes: S,
    provider: String,
    buffer: LineBuffer,
    lines: VecDeque<String>,
    finished: bool,
}

impl<S> DecodeState<S> {
    fn stop(&mut self) {
        self.finished = true;
        self.lines.clear();
    }
}

/// Turns a byte stream of NDJSON chat chunks into ordered text fragments.
///
/// The stream ends at the `done` line or at end of input, and yields at most
/// one error, after which it is exhausted.
pub fn decode_chunks<S, B>(bytes: S, provider: impl Into<String>) -> ChunkStream
where
    S: Stream<Item = Result<B, ChatBackendError>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = DecodeState {
        bytes,
        provider: provider.into(),
        buffer: LineBuffer::default(),
        lines: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.lines.pop_front() {
                match decode_line(&state.provider, &line) {
                    Ok(LineEvent::Text(text)) => return Some((Ok(text), state)),
                    Ok(LineEvent::Skip) => continue,
                    Ok(LineEvent::Done(tail)) => {
                        state.stop();
                        match tail {
                            Some(text) => return Some((Ok(text), state)),
                            None => return None,
                        }
                    }
                    Err(err) => {
                        state.stop();
                        return Some((Err(err), state));
                    }
                }
            }

            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let lines = state.buffer.push(chunk.as_ref());
                    state.lines.extend(lines);
                }
                Some(Err(err)) => {
                    state.stop();
                    return Some((Err(err), state));
                }
                None => {
                    state.finished = true;
                    if let Some(line) = state.buffer.finish() {
                        state.lines.push_back(line);
                    }
                }
            }
        }
    })
    .boxed()
}
