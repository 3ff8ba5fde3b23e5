use serde_json::Value;
use tracing::debug;

/// Event name used when a frame carries no `event:` line.
pub const DEFAULT_EVENT_NAME: &str = "message";

/// Raw event frame: the name in effect and one parsed `data:` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    pub name: String,
    pub payload: Value,
}

impl StreamEvent {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// Accumulates decoded fragments and yields complete lines only.
///
/// The tail after the last `\n` is retained until a later fragment completes it.
/// Byte input is decoded as UTF-8 incrementally, so a character split across two
/// fragments is held back instead of being replaced.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: String,
    cursor: usize,
    pending_bytes: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes and iterate the lines they complete.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> CompleteLines<'_> {
        self.compact();
        self.pending_bytes.extend_from_slice(bytes);
        self.decode_pending();
        CompleteLines { buffer: self }
    }

    /// Append decoded text and iterate the lines it completes.
    pub fn push_str(&mut self, fragment: &str) -> CompleteLines<'_> {
        self.compact();
        self.buffer.push_str(fragment);
        CompleteLines { buffer: self }
    }

    /// End of input: returns the unterminated tail, if any, and empties the buffer.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending_bytes.is_empty() {
            let tail = std::mem::take(&mut self.pending_bytes);
            self.buffer.push_str(&String::from_utf8_lossy(&tail));
        }
        self.compact();
        let tail = std::mem::take(&mut self.buffer);
        if tail.is_empty() {
            None
        } else {
            Some(strip_carriage_return(tail))
        }
    }

    /// Restart for a new session, discarding any retained tail.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
        self.pending_bytes.clear();
    }

    /// Length in bytes of the retained, not yet terminated tail.
    pub fn remainder_len(&self) -> usize {
        self.buffer.len() - self.cursor + self.pending_bytes.len()
    }

    fn compact(&mut self) {
        if self.cursor > 0 {
            self.buffer.drain(..self.cursor);
            self.cursor = 0;
        }
    }

    fn decode_pending(&mut self) {
        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.pending_bytes[start..]) {
                Ok(valid) => {
                    self.buffer.push_str(valid);
                    self.pending_bytes.clear();
                    return;
                }
                Err(error) => {
                    let valid_end = start + error.valid_up_to();
                    let valid = &self.pending_bytes[start..valid_end];
                    self.buffer
                        .push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match error.error_len() {
                        Some(invalid_len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + invalid_len;
                        }
                        None => {
                            // Incomplete sequence at the end; wait for more bytes.
                            self.pending_bytes.drain(..valid_end);
                            return;
                        }
                    }
                }
            }
        }
    }

    fn next_line(&mut self) -> Option<String> {
        let rest = &self.buffer[self.cursor..];
        let newline = rest.find('\n')?;
        let line = rest[..newline].to_string();
        self.cursor += newline + 1;
        Some(strip_carriage_return(line))
    }
}

/// Lazy iterator over the lines completed by the latest fragment.
///
/// Lines not consumed before the iterator is dropped stay in the buffer and are
/// yielded by the next push.
pub struct CompleteLines<'a> {
    buffer: &'a mut LineBuffer,
}

impl Iterator for CompleteLines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.buffer.next_line()
    }
}

fn strip_carriage_return(mut line: String) -> String {
    if line.ends_with('\r') {
        line.pop();
    }
    line
}

/// Groups lines into named events.
///
/// The current event name survives across fragments and is reset only by a blank
/// line. Each `data:` line is one JSON value; multi-line data is not accumulated.
#[derive(Debug)]
pub struct EventFrameParser {
    current_event: String,
    dropped_payloads: usize,
}

impl Default for EventFrameParser {
    fn default() -> Self {
        Self {
            current_event: DEFAULT_EVENT_NAME.to_string(),
            dropped_payloads: 0,
        }
    }
}

impl EventFrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_event(&self) -> &str {
        &self.current_event
    }

    /// Number of `data:` lines discarded because they were not valid JSON.
    pub fn dropped_payloads(&self) -> usize {
        self.dropped_payloads
    }

    pub fn push_line(&mut self, line: &str) -> Option<StreamEvent> {
        if let Some(name) = line.strip_prefix("event:") {
            self.current_event = name.trim().to_string();
            return None;
        }

        if let Some(data) = line.strip_prefix("data:") {
            return match serde_json::from_str::<Value>(data) {
                Ok(payload) => Some(StreamEvent::new(self.current_event.clone(), payload)),
                Err(error) => {
                    self.dropped_payloads += 1;
                    debug!(event = %self.current_event, %error, "dropping non-JSON data line");
                    None
                }
            };
        }

        if line.trim().is_empty() {
            self.current_event.clear();
            self.current_event.push_str(DEFAULT_EVENT_NAME);
        }

        None
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Incremental parser for event-stream bodies: [`LineBuffer`] feeding
/// [`EventFrameParser`].
#[derive(Debug, Default)]
pub struct SseStreamParser {
    lines: LineBuffer,
    frames: EventFrameParser,
}

impl SseStreamParser {
    /// Feed arbitrary bytes into the parser and drain complete events.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        let frames = &mut self.frames;
        self.lines
            .push_bytes(bytes)
            .filter_map(|line| frames.push_line(&line))
            .collect()
    }

    /// Flush the unterminated tail at end of input.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        self.lines
            .finish()
            .and_then(|line| self.frames.push_line(&line))
            .into_iter()
            .collect()
    }

    /// Parse a complete payload string in one shot.
    pub fn parse_frames(input: &str) -> Vec<StreamEvent> {
        let mut parser = Self::default();
        let mut events = parser.feed(input.as_bytes());
        events.extend(parser.finish());
        events
    }

    pub fn dropped_payloads(&self) -> usize {
        self.frames.dropped_payloads()
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.lines.remainder_len() == 0
    }

    pub fn reset(&mut self) {
        self.lines.reset();
        self.frames.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::{EventFrameParser, LineBuffer, SseStreamParser, DEFAULT_EVENT_NAME};
    use serde_json::json;

    #[test]
    fn line_buffer_retains_partial_tail() {
        let mut buffer = LineBuffer::new();
        let lines: Vec<String> = buffer.push_str("one\ntw").collect();
        assert_eq!(lines, vec!["one".to_string()]);
        assert_eq!(buffer.remainder_len(), 2);

        let lines: Vec<String> = buffer.push_str("o\n\nthree").collect();
        assert_eq!(lines, vec!["two".to_string(), String::new()]);
        assert_eq!(buffer.finish().as_deref(), Some("three"));
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn line_buffer_keeps_unconsumed_lines_for_next_push() {
        let mut buffer = LineBuffer::new();
        let first = buffer.push_str("a\nb\n").next();
        assert_eq!(first.as_deref(), Some("a"));

        let rest: Vec<String> = buffer.push_str("c\n").collect();
        assert_eq!(rest, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn line_buffer_strips_crlf() {
        let mut buffer = LineBuffer::new();
        let lines: Vec<String> = buffer.push_str("data: 1\r\n\r\n").collect();
        assert_eq!(lines, vec!["data: 1".to_string(), String::new()]);
    }

    #[test]
    fn line_buffer_holds_split_utf8_sequences() {
        let bytes = "é\n".as_bytes();
        let mut buffer = LineBuffer::new();
        assert_eq!(buffer.push_bytes(&bytes[..1]).count(), 0);
        let lines: Vec<String> = buffer.push_bytes(&bytes[1..]).collect();
        assert_eq!(lines, vec!["é".to_string()]);
    }

    #[test]
    fn line_buffer_replaces_invalid_bytes() {
        let mut buffer = LineBuffer::new();
        let lines: Vec<String> = buffer.push_bytes(b"a\xffb\n").collect();
        assert_eq!(lines, vec!["a\u{fffd}b".to_string()]);
    }

    #[test]
    fn frame_parser_resets_name_on_blank_line() {
        let mut parser = EventFrameParser::new();
        assert!(parser.push_line("event: delta").is_none());
        let event = parser.push_line("data: {\"text\":\"x\"}").expect("event");
        assert_eq!(event.name, "delta");
        assert_eq!(event.payload, json!({"text": "x"}));

        assert!(parser.push_line("").is_none());
        assert_eq!(parser.current_event(), DEFAULT_EVENT_NAME);
    }

    #[test]
    fn frame_parser_counts_dropped_payloads() {
        let mut parser = EventFrameParser::new();
        assert!(parser.push_line("data: {broken").is_none());
        assert!(parser.push_line(": keep-alive").is_none());
        assert_eq!(parser.dropped_payloads(), 1);
    }

    #[test]
    fn parse_sse_frames_incrementally() {
        let mut parser = SseStreamParser::default();
        let mut events = Vec::new();

        events.extend(parser.feed(b"event: delta\ndata: {\"text\":\"Hel"));
        assert!(events.is_empty());

        events.extend(parser.feed(b"lo\"}\n\n"));
        assert_eq!(events.len(), 1);
        assert!(parser.is_empty_buffer());
    }
}
