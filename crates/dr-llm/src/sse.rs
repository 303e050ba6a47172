//! Server-sent event decoding for streamed chat completions.

use serde::Deserialize;

/// Payload of an SSE `data:` line that ends the stream.
const DONE_SENTINEL: &str = "[DONE]";

/// A decoded event from a chat completion stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Content(String),
    Done,
    Error(String),
}

/// Incremental decoder for `text/event-stream` bodies.
///
/// Network chunks may split a line, or a multi-byte character, anywhere;
/// bytes are buffered until a full line is available.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds raw body bytes and returns the events completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            events.extend(decode_line(&line));
        }
        events
    }

    /// Decodes a final line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<Choice>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn decode_line(line: &[u8]) -> Option<SseEvent> {
    let line = String::from_utf8_lossy(line);
    let data = line.trim().strip_prefix("data:")?.trim_start();
    if data == DONE_SENTINEL {
        return Some(SseEvent::Done);
    }

    let chunk: CompletionChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(err) => {
            tracing::debug!(error = %err, "ignoring unparsable stream line");
            return None;
        }
    };
    if let Some(error) = chunk.error {
        return Some(SseEvent::Error(error.message));
    }
    chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty())
        .map(SseEvent::Content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    #[test]
    fn decodes_content_and_done() {
        let mut decoder = SseDecoder::new();
        let body = format!("{}{}data: [DONE]\n\n", delta("Hello"), delta(" world"));

        let events = decoder.push(body.as_bytes());

        assert_eq!(
            events,
            vec![
                SseEvent::Content("Hello".to_string()),
                SseEvent::Content(" world".to_string()),
                SseEvent::Done,
            ]
        );
    }

    #[test]
    fn lines_split_across_chunks_are_reassembled() {
        let mut decoder = SseDecoder::new();
        let body = delta("日本語");
        let bytes = body.as_bytes();
        // Split inside the multi-byte sequence.
        let split = body.find('本').unwrap() + 1;

        assert!(decoder.push(&bytes[..split]).is_empty());
        assert_eq!(
            decoder.push(&bytes[split..]),
            vec![SseEvent::Content("日本語".to_string())]
        );
    }

    #[test]
    fn ignores_comments_role_deltas_and_garbage() {
        let mut decoder = SseDecoder::new();
        let body = concat!(
            ": keep-alive\n",
            "event: message\n",
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n",
            "data: not json\n",
            "data: {\"choices\":[]}\n",
        );
        assert!(decoder.push(body.as_bytes()).is_empty());
    }

    #[test]
    fn in_band_error_objects_surface_as_errors() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: {\"error\":{\"message\":\"quota exceeded\",\"code\":429}}\n");
        assert_eq!(events, vec![SseEvent::Error("quota exceeded".to_string())]);
    }

    #[test]
    fn accepts_data_without_space_and_crlf() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data:[DONE]\r\n");
        assert_eq!(events, vec![SseEvent::Done]);
    }

    #[test]
    fn finish_flushes_an_unterminated_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: [DO").is_empty());
        assert!(decoder.push(b"NE]").is_empty());
        assert_eq!(decoder.finish(), Some(SseEvent::Done));
        assert_eq!(decoder.finish(), None);
    }
}
