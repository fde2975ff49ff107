//! Streaming wire framing
//!
//! Each frame is one or more `data: <json>` lines terminated by a blank line.
//! Lines beginning with `:` are comments (used for idle keep-alive) and carry
//! no payload. Two payload shapes travel on the generation stream:
//!
//! ```text
//! data: {"content":"Ty"}
//!
//! data: {"done":true,"result":"Ty Cobb led the league..."}
//!
//! ```
//!
//! `FrameDecoder` reassembles frames from arbitrarily split byte chunks. The
//! same decoder is used for the generation backend's event stream.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Prefix of a payload line
pub const DATA_PREFIX: &str = "data:";

/// Payload carried by one frame of the generation stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamFrame {
    /// One token fragment
    Token { content: String },
    /// Final frame; `result` is the canonical stored text
    Done {
        done: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<String>,
    },
}

impl StreamFrame {
    pub fn token(content: impl Into<String>) -> Self {
        StreamFrame::Token {
            content: content.into(),
        }
    }

    pub fn done(result: Option<String>) -> Self {
        StreamFrame::Done { done: true, result }
    }

    /// True only for a completion frame with `done: true`
    pub fn is_done(&self) -> bool {
        matches!(self, StreamFrame::Done { done: true, .. })
    }

    /// JSON payload (without the `data:` prefix)
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::Internal(format!("Failed to serialize frame: {}", e)))
    }

    /// Complete wire representation including prefix and blank-line terminator
    pub fn to_wire(&self) -> Result<String> {
        Ok(format!("{} {}\n\n", DATA_PREFIX, self.to_json()?))
    }

    /// Parse a decoded payload
    pub fn parse(payload: &str) -> Result<Self> {
        serde_json::from_str(payload)
            .map_err(|e| Error::Decode(format!("Invalid frame payload {:?}: {}", payload, e)))
    }
}

/// Upper bound on bytes buffered for one incomplete frame
pub const MAX_PENDING_BYTES: usize = 1024 * 1024;

/// Incremental frame decoder
///
/// Buffers raw bytes until a blank-line boundary arrives, so a frame (or a
/// multi-byte character) split across reads is never decoded early. Bytes
/// already searched are not searched again. A peer that never terminates a
/// frame fails with `Error::Decode` once `limit` bytes are pending.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    /// Offset where the next boundary search starts
    scanned: usize,
    limit: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::with_limit(MAX_PENDING_BYTES)
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            limit,
        }
    }

    /// Feed a chunk; returns the data payloads of every frame it completed
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some((block_end, frame_end)) = find_boundary(&self.buffer, self.scanned) {
            let frame: Vec<u8> = self.buffer.drain(..frame_end).collect();
            self.scanned = 0;
            if let Some(payload) = parse_block(&frame[..block_end]) {
                payloads.push(payload);
            }
        }
        // A delimiter may start in the last two bytes and finish in the next chunk
        self.scanned = self.buffer.len().saturating_sub(2);

        if self.buffer.len() > self.limit {
            let pending = self.buffer.len();
            self.buffer.clear();
            self.scanned = 0;
            return Err(Error::Decode(format!(
                "Unterminated frame exceeds {} bytes ({} pending)",
                self.limit, pending
            )));
        }

        Ok(payloads)
    }

    /// Bytes received but not yet part of a complete frame
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Locate the first blank line at or after `from`; returns (end of block, end of delimiter)
fn find_boundary(buf: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut i = from;
    while i < buf.len() {
        if buf[i] == b'\n' {
            match (buf.get(i + 1), buf.get(i + 2)) {
                (Some(b'\n'), _) => return Some((i, i + 2)),
                (Some(b'\r'), Some(b'\n')) => return Some((i, i + 3)),
                _ => {}
            }
        }
        i += 1;
    }
    None
}

fn parse_block(block: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(block);
    let mut data: Option<String> = None;

    for line in text.split('\n') {
        let line = line.trim_end_matches('\r');
        if line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix(DATA_PREFIX) {
            let value = rest.strip_prefix(' ').unwrap_or(rest);
            match data.as_mut() {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(value);
                }
                None => data = Some(value.to_string()),
            }
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_wire() -> String {
        let mut wire = String::new();
        for fragment in ["Ty ", "Cobb ", "hit ", "é", "🙂", "."] {
            wire.push_str(&StreamFrame::token(fragment).to_wire().unwrap());
        }
        wire.push_str(": heartbeat\n\n");
        wire.push_str(&StreamFrame::done(Some("Ty Cobb hit é🙂.".into())).to_wire().unwrap());
        wire
    }

    fn decode_all(chunks: &[&[u8]]) -> Vec<StreamFrame> {
        let mut decoder = FrameDecoder::new();
        chunks
            .iter()
            .flat_map(|chunk| decoder.push(chunk).unwrap())
            .map(|payload| StreamFrame::parse(&payload).unwrap())
            .collect()
    }

    #[test]
    fn frame_shapes_match_wire_protocol() {
        assert_eq!(
            StreamFrame::token("a").to_wire().unwrap(),
            "data: {\"content\":\"a\"}\n\n"
        );
        assert_eq!(
            StreamFrame::done(None).to_wire().unwrap(),
            "data: {\"done\":true}\n\n"
        );
        assert!(StreamFrame::parse(r#"{"done":true}"#).unwrap().is_done());
        assert!(!StreamFrame::parse(r#"{"done":false}"#).unwrap().is_done());
        assert_eq!(
            StreamFrame::parse(r#"{"content":"x"}"#).unwrap(),
            StreamFrame::token("x")
        );
    }

    #[test]
    fn decodes_whole_stream_in_one_chunk() {
        let wire = sample_wire();
        let frames = decode_all(&[wire.as_bytes()]);

        assert_eq!(frames.len(), 7);
        assert!(frames[6].is_done());
    }

    #[test]
    fn split_at_every_offset_yields_same_frames() {
        let wire = sample_wire();
        let bytes = wire.as_bytes();
        let expected = decode_all(&[bytes]);

        for split in 0..=bytes.len() {
            let (a, b) = bytes.split_at(split);
            assert_eq!(decode_all(&[a, b]), expected, "split at byte {}", split);
        }
    }

    #[test]
    fn byte_at_a_time_preserves_order_and_text() {
        let wire = sample_wire();
        let chunks: Vec<&[u8]> = wire.as_bytes().chunks(1).collect();
        let frames = decode_all(&chunks);

        let text: String = frames
            .iter()
            .filter_map(|f| match f {
                StreamFrame::Token { content } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Ty Cobb hit é🙂.");
    }

    #[test]
    fn comments_and_incomplete_frames_produce_nothing() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b": keep-alive\n\n").unwrap().is_empty());
        assert!(decoder.push(b"data: {\"content\":\"partial\"}\n").unwrap().is_empty());
        assert!(decoder.pending() > 0);
        assert_eq!(decoder.push(b"\n").unwrap(), vec![r#"{"content":"partial"}"#.to_string()]);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn handles_crlf_and_multiline_data() {
        let mut decoder = FrameDecoder::new();
        let payloads = decoder.push(b"event: message\r\ndata: line one\r\ndata: line two\r\n\r\ndata:[DONE]\n\n").unwrap();
        assert_eq!(payloads, vec!["line one\nline two".to_string(), "[DONE]".to_string()]);
    }

    #[test]
    fn crlf_delimiter_split_across_chunks() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: a\r\n").unwrap().is_empty());
        assert!(decoder.push(b"\r").unwrap().is_empty());
        assert_eq!(decoder.push(b"\ndata: b\n").unwrap(), vec!["a".to_string()]);
        assert_eq!(decoder.push(b"\n").unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn unterminated_frame_over_limit_is_decode_error() {
        let mut decoder = FrameDecoder::with_limit(16);
        assert!(decoder.push(b"data: 0123456").unwrap().is_empty());
        assert!(matches!(
            decoder.push(b"789abcdef"),
            Err(Error::Decode(_))
        ));
        assert_eq!(decoder.pending(), 0);

        // Completed frames never count against the limit
        let mut decoder = FrameDecoder::with_limit(16);
        for _ in 0..8 {
            assert_eq!(decoder.push(b"data: 0123456789\n\n").unwrap().len(), 1);
        }
    }
}
