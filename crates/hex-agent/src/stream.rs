//! Incremental decoding of the agent's line-delimited JSON output

use serde::Deserialize;

/// One decoded line of agent output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Complete message snapshot (text blocks only)
    AssistantMessage { blocks: Vec<String> },
    /// Incremental text fragment
    Delta { text: String },
    /// Final authoritative reply
    Result { text: String },
    /// Anything that is not one of the shapes above, kept verbatim
    Unparseable { raw: String },
}

/// Wire shapes accepted from the agent, keyed by the `type` field.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    Assistant { message: WireMessage },
    ContentBlockDelta { delta: WireDelta },
    Result { result: String },
}

#[derive(Deserialize)]
struct WireMessage {
    content: Vec<WireBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireDelta {
    TextDelta { text: String },
}

impl StreamEvent {
    /// Decode one line (terminator already stripped).
    ///
    /// `raw` is what an unrecognized line contributes to the reply; callers pass
    /// the line with its original terminator so raw text keeps its line breaks.
    pub fn decode(line: &str, raw: &str) -> Self {
        match serde_json::from_str::<WireEvent>(line) {
            Ok(WireEvent::Assistant { message }) => StreamEvent::AssistantMessage {
                blocks: message
                    .content
                    .into_iter()
                    .filter_map(|block| match block {
                        WireBlock::Text { text } => Some(text),
                        WireBlock::Other => None,
                    })
                    .collect(),
            },
            Ok(WireEvent::ContentBlockDelta {
                delta: WireDelta::TextDelta { text },
            }) => StreamEvent::Delta { text },
            Ok(WireEvent::Result { result }) => StreamEvent::Result { text: result },
            Err(_) => StreamEvent::Unparseable {
                raw: raw.to_string(),
            },
        }
    }
}

/// Combine an event into the running reply.
///
/// Snapshots and results replace, deltas and raw text append.
pub fn fold(mut reply: String, event: StreamEvent) -> String {
    match event {
        StreamEvent::AssistantMessage { blocks } => blocks.concat(),
        StreamEvent::Result { text } => text,
        StreamEvent::Delta { text } => {
            reply.push_str(&text);
            reply
        }
        StreamEvent::Unparseable { raw } => {
            reply.push_str(&raw);
            reply
        }
    }
}

/// Line-buffering decoder fed with arbitrary chunks of process output.
///
/// Buffers bytes rather than text so a UTF-8 sequence split across two reads
/// is reassembled before decoding.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: Vec<u8>,
    /// Leading bytes of `buffer` already known to hold no newline
    scanned: usize,
    reconstructed: String,
    /// Bumped every time a line is folded into the reply
    revision: u64,
}

impl StreamDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of text
    pub fn feed(&mut self, chunk: &str) {
        self.feed_bytes(chunk.as_bytes());
    }

    /// Feed a chunk of raw bytes as read from the pipe
    pub fn feed_bytes(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
        let buffer = std::mem::take(&mut self.buffer);
        let mut consumed = 0;
        let mut from = self.scanned;
        while let Some(offset) = buffer[from..].iter().position(|&b| b == b'\n') {
            let end = from + offset + 1;
            self.fold_line(&buffer[consumed..end]);
            consumed = end;
            from = end;
        }
        self.buffer = buffer;
        self.buffer.drain(..consumed);
        self.scanned = self.buffer.len();
    }

    /// The reply reconstructed so far (unsanitized)
    pub fn current(&self) -> &str {
        &self.reconstructed
    }

    /// Changes whenever `current` may have changed
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of bytes waiting for a line terminator
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Flush any unterminated tail and return the reconstructed reply
    pub fn finalize(mut self) -> String {
        if !self.buffer.is_empty() {
            let tail = std::mem::take(&mut self.buffer);
            self.fold_line(&tail);
        }
        self.reconstructed
    }

    fn fold_line(&mut self, bytes: &[u8]) {
        let raw = String::from_utf8_lossy(bytes);
        let line = raw.trim_end_matches('\n').trim_end_matches('\r');
        if line.trim().is_empty() {
            return;
        }
        let event = StreamEvent::decode(line, &raw);
        tracing::trace!(?event, "decoded agent output line");
        let reply = std::mem::take(&mut self.reconstructed);
        self.reconstructed = fold(reply, event);
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(text: &str) -> String {
        format!(
            r#"{{"type":"content_block_delta","delta":{{"type":"text_delta","text":{}}}}}"#,
            serde_json::to_string(text).unwrap()
        )
    }

    fn assistant(text: &str) -> String {
        format!(
            r#"{{"type":"assistant","message":{{"content":[{{"type":"text","text":{}}}]}}}}"#,
            serde_json::to_string(text).unwrap()
        )
    }

    fn result(text: &str) -> String {
        format!(
            r#"{{"type":"result","result":{}}}"#,
            serde_json::to_string(text).unwrap()
        )
    }

    fn decode_all(lines: &[String]) -> String {
        let mut decoder = StreamDecoder::new();
        for line in lines {
            decoder.feed(line);
            decoder.feed("\n");
        }
        decoder.finalize()
    }

    #[test]
    fn test_decode_recognized_shapes() {
        assert_eq!(
            StreamEvent::decode(&delta("hi"), ""),
            StreamEvent::Delta { text: "hi".into() }
        );
        assert_eq!(
            StreamEvent::decode(&assistant("snap"), ""),
            StreamEvent::AssistantMessage {
                blocks: vec!["snap".into()]
            }
        );
        assert_eq!(
            StreamEvent::decode(&result("done"), ""),
            StreamEvent::Result {
                text: "done".into()
            }
        );
    }

    #[test]
    fn test_decode_skips_non_text_blocks() {
        let line = r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"t1","name":"bash","input":{}},{"type":"text","text":"a"},{"type":"text","text":"b"}]}}"#;
        assert_eq!(
            StreamEvent::decode(line, ""),
            StreamEvent::AssistantMessage {
                blocks: vec!["a".into(), "b".into()]
            }
        );
    }

    #[test]
    fn test_decode_unknown_shapes_are_raw() {
        for line in [
            r#"{"type":"system","subtype":"init"}"#,
            r#"{"type":"content_block_delta","delta":{"type":"input_json_delta","partial_json":"{"}}"#,
            r#"{"type":"result","is_error":true}"#,
            "not json at all",
            "{\"type\":\"result\",",
        ] {
            assert_eq!(
                StreamEvent::decode(line, line),
                StreamEvent::Unparseable { raw: line.into() },
                "{line}"
            );
        }
    }

    #[test]
    fn test_fold_deltas_append() {
        assert_eq!(decode_all(&[delta("a"), delta("b")]), "ab");
    }

    #[test]
    fn test_fold_message_replaces() {
        assert_eq!(decode_all(&[delta("a"), assistant("z")]), "z");
    }

    #[test]
    fn test_fold_result_wins() {
        assert_eq!(
            decode_all(&[delta("a"), assistant("z"), delta("q"), result("done")]),
            "done"
        );
    }

    #[test]
    fn test_raw_lines_keep_their_breaks() {
        let mut decoder = StreamDecoder::new();
        decoder.feed("first line\nsecond line\n");
        assert_eq!(decoder.finalize(), "first line\nsecond line\n");
    }

    #[test]
    fn test_blank_lines_skipped() {
        let mut decoder = StreamDecoder::new();
        decoder.feed("\n   \n\r\n");
        decoder.feed(&delta("x"));
        decoder.feed("\n\n");
        assert_eq!(decoder.finalize(), "x");
    }

    #[test]
    fn test_crlf_terminated_json() {
        let mut decoder = StreamDecoder::new();
        decoder.feed(&format!("{}\r\n{}\r\n", delta("a"), delta("b")));
        assert_eq!(decoder.finalize(), "ab");
    }

    #[test]
    fn test_partial_line_held_until_terminator() {
        let line = result("held");
        let (head, tail) = line.split_at(10);
        let mut decoder = StreamDecoder::new();
        decoder.feed(head);
        assert_eq!(decoder.current(), "");
        assert_eq!(decoder.pending(), head.len());
        decoder.feed(tail);
        decoder.feed("\n");
        assert_eq!(decoder.current(), "held");
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_finalize_decodes_unterminated_json() {
        let mut decoder = StreamDecoder::new();
        decoder.feed(&delta("par"));
        decoder.feed("\n");
        decoder.feed(&result("final"));
        assert_eq!(decoder.finalize(), "final");
    }

    #[test]
    fn test_finalize_appends_unterminated_raw_tail() {
        let mut decoder = StreamDecoder::new();
        decoder.feed("legacy output without newline");
        assert_eq!(decoder.finalize(), "legacy output without newline");
    }

    #[test]
    fn test_chunk_invariance() {
        let stream = [
            r#"{"type":"system","subtype":"init","session_id":"abc"}"#.to_string(),
            delta("Hél"),
            delta("lo ✓"),
            "raw noise".to_string(),
            assistant("Héllo ✓"),
            delta(" again"),
        ]
        .join("\n")
            + "\n";
        let whole = {
            let mut decoder = StreamDecoder::new();
            decoder.feed(&stream);
            decoder.finalize()
        };

        let bytes = stream.as_bytes();
        for size in 1..=17 {
            let mut decoder = StreamDecoder::new();
            for chunk in bytes.chunks(size) {
                decoder.feed_bytes(chunk);
            }
            assert_eq!(decoder.finalize(), whole, "chunk size {size}");
        }

        // Uneven splits, including inside multi-byte characters.
        for split in 0..bytes.len() {
            let mut decoder = StreamDecoder::new();
            decoder.feed_bytes(&bytes[..split]);
            decoder.feed_bytes(&bytes[split..]);
            assert_eq!(decoder.finalize(), whole, "split at {split}");
        }
    }

    #[test]
    fn test_long_line_in_small_reads() {
        let text = "x".repeat(4 * 1024 * 1024);
        let line = result(&text) + "\n";
        let start = std::time::Instant::now();

        let mut decoder = StreamDecoder::new();
        let mut fed = 0;
        for chunk in line.as_bytes().chunks(8 * 1024) {
            decoder.feed_bytes(chunk);
            fed += chunk.len();
            if fed < line.len() {
                assert_eq!(decoder.pending(), fed);
                assert_eq!(decoder.revision(), 0);
            }
        }
        assert_eq!(decoder.pending(), 0);
        assert_eq!(decoder.revision(), 1);
        assert_eq!(decoder.current().len(), text.len());
        assert!(start.elapsed() < std::time::Duration::from_secs(5));
    }
}
