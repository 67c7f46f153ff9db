//! SSE reframing for the relay loop
//!
//! The upstream completion API delivers a line-oriented `data: <payload>`
//! event stream as raw byte chunks. Chunk boundaries are arbitrary: a chunk
//! may split a multi-byte character or pack several events together. This
//! module owns the incremental decode step, the line parsing, and the
//! downstream `event: <kind>\ndata: <payload>\n\n` framing.

use bytes::Bytes;
use serde::Serialize;

/// Literal payload the upstream emits to mark the logical end of output.
///
/// Distinct from HTTP end-of-stream: the read loop keeps going after seeing
/// it and only stops when the body itself ends.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Incremental UTF-8 decoder that carries partial sequences across chunks.
///
/// A multi-byte character split across two reads must decode to the correct
/// single character, so the trailing incomplete bytes of each chunk are held
/// back until the next feed. One instance per request; decode state is never
/// shared across streams.
///
/// Invalid (as opposed to incomplete) sequences are replaced with U+FFFD so
/// a corrupt upstream byte cannot wedge the decoder.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    /// Undecoded tail of the previous chunk, at most 3 bytes
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    /// Create a new empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, prepending any bytes held over from the last.
    ///
    /// Returns all text that is decodable so far; an incomplete trailing
    /// sequence is retained for the next call. Dangling bytes left when the
    /// stream ends are dropped, matching upstream decoder semantics.
    pub fn feed(&mut self, chunk: &[u8]) -> String {
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(chunk);

        let mut out = String::with_capacity(buf.len());
        let mut rest = buf.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(err) => {
                    let (valid, after_valid) = rest.split_at(err.valid_up_to());
                    // valid_up_to guarantees this slice is well-formed
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());

                    match err.error_len() {
                        // Invalid sequence: replace and keep decoding
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after_valid[len..];
                        }
                        // Incomplete sequence at the end: hold for next chunk
                        None => {
                            self.pending = after_valid.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Whether a partial sequence is being held for the next chunk.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// A parsed unit of upstream output, ready for downstream framing.
///
/// `Message` carries the raw payload line verbatim; the relay never
/// interprets the model's own JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// One upstream payload line
    Message(String),
    /// The `[DONE]` sentinel was seen
    Done,
}

/// Parser that turns raw upstream chunks into [`RelayEvent`]s.
///
/// Wraps a [`Utf8StreamDecoder`] and applies the upstream line protocol:
/// split decoded text on CR/LF, drop empty lines, strip a leading `data:`
/// label plus whitespace, and classify the sentinel. Line splitting is
/// per-chunk; only byte-level decode state survives a chunk boundary.
#[derive(Debug, Default)]
pub struct ChunkParser {
    decoder: Utf8StreamDecoder,
}

impl ChunkParser {
    /// Create a new parser with a fresh decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one upstream chunk and return the events it yields, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<RelayEvent> {
        let text = self.decoder.feed(chunk);

        text.split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.is_empty())
            .map(|line| {
                let payload = line
                    .strip_prefix("data:")
                    .map(str::trim_start)
                    .unwrap_or(line);

                if payload.trim() == DONE_SENTINEL {
                    RelayEvent::Done
                } else {
                    RelayEvent::Message(payload.to_string())
                }
            })
            .collect()
    }
}

/// Format a message event.
///
/// The payload is re-encoded as a JSON string literal, so the model's own
/// JSON arrives double-encoded and the client unwraps one layer.
pub fn format_message(payload: &str) -> Bytes {
    let data = serde_json::to_string(payload).expect("strings always serialize");
    Bytes::from(format!("event: message\ndata: {}\n\n", data))
}

/// Format the done event: `event: done\ndata: [DONE]\n\n`
pub fn format_done() -> Bytes {
    Bytes::from_static(b"event: done\ndata: [DONE]\n\n")
}

/// Error body for an upstream rejection (non-2xx from the completion API)
#[derive(Debug, Serialize)]
struct UpstreamErrorEvent<'a> {
    error: &'a str,
}

/// Error body for a relay failure (connect error, mid-stream read fault)
#[derive(Debug, Serialize)]
struct RelayFailureEvent<'a> {
    message: &'a str,
}

/// Format an error event carrying an upstream rejection body.
pub fn format_upstream_error(body: &str) -> Bytes {
    format_error(&UpstreamErrorEvent { error: body })
}

/// Format an error event for a failure inside the relay loop itself.
pub fn format_relay_failure(description: &str) -> Bytes {
    format_error(&RelayFailureEvent {
        message: description,
    })
}

fn format_error<T: Serialize>(event: &T) -> Bytes {
    let data = serde_json::to_string(event).expect("error events always serialize");
    Bytes::from(format!("event: error\ndata: {}\n\n", data))
}

/// Convert a [`RelayEvent`] to its downstream frame.
pub fn format_event(event: &RelayEvent) -> Bytes {
    match event {
        RelayEvent::Message(payload) => format_message(payload),
        RelayEvent::Done => format_done(),
    }
}
