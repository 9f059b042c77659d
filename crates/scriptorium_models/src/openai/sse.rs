//! Incremental Server-Sent Events framing.

/// Splits a byte stream of SSE text into `data:` payloads.
///
/// Network chunks do not align with event boundaries, so partial events are
/// buffered until their terminating blank line arrives.
///
/// # Examples
///
/// ```
/// use scriptorium_models::SseDecoder;
///
/// let mut decoder = SseDecoder::default();
/// assert!(decoder.push("data: {\"a\"").is_empty());
/// assert_eq!(decoder.push(":1}\n\n"), vec!["{\"a\":1}".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    /// Sentinel payload that ends an OpenAI-style stream.
    pub const DONE: &'static str = "[DONE]";

    /// Feeds more text and returns the payloads of every completed event.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.buffer.push_str(&text.replace("\r\n", "\n"));

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.find("\n\n") {
            let event: String = self.buffer.drain(..pos + 2).collect();
            if let Some(data) = Self::event_data(&event) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Flushes a trailing event the server did not terminate.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        Self::event_data(&rest)
    }

    fn event_data(event: &str) -> Option<String> {
        let lines: Vec<&str> = event
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|data| data.strip_prefix(' ').unwrap_or(data))
            .collect();
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_events_in_one_chunk() {
        let mut decoder = SseDecoder::default();
        let payloads = decoder.push("data: one\n\ndata: two\n\ndata: [DONE]\n\n");
        assert_eq!(payloads, vec!["one", "two", SseDecoder::DONE]);
    }

    #[test]
    fn test_comments_and_crlf() {
        let mut decoder = SseDecoder::default();
        let payloads = decoder.push(": keep-alive\r\n\r\ndata: x\r\n\r\n");
        assert_eq!(payloads, vec!["x"]);
    }

    #[test]
    fn test_unterminated_tail_is_flushed() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push("data: tail").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some("tail"));
        assert_eq!(decoder.finish(), None);
    }
}
