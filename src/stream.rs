//! Framing of the orchestrator's execute stream.
//!
//! The body is an unbounded run of `data: <payload>` lines. Chunks arrive at
//! arbitrary byte boundaries, so bytes are buffered until a full line is
//! available. Splitting on `\n` at the byte level is safe for UTF-8 because
//! the newline byte never occurs inside a multi-byte sequence.

use crate::types::RunStatus;

pub const EVENT_PREFIX: &str = "data: ";

pub const SUCCESS_MARKER: &str = "✅";
pub const FAILURE_GLYPH: &str = "❌";
pub const FATAL_MARKER: &str = "Fatal exception";
pub const HALTED_MARKER: &str = "Execution halted";

/// Incremental bytes-to-lines decoder.
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every line it completed, without the
    /// terminator (a trailing `\r` is dropped too).
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            lines.push(decode_line(&self.pending[start..end]));
            start = end + 1;
        }
        self.pending.drain(..start);
        lines
    }

    /// Flushes a final line that was never terminated.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = decode_line(&self.pending);
        self.pending.clear();
        Some(line)
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Payload of an event line, or `None` for anything that is not one.
pub fn event_payload(line: &str) -> Option<&str> {
    line.strip_prefix(EVENT_PREFIX)
}

/// Derives a terminal status from a log entry's text.
///
/// Only entries carrying the success, fatal or halted marker are terminal.
/// Among those, the failure glyph or any `Fatal` text means `Error`;
/// everything else is `Completed`.
pub fn classify(entry: &str) -> Option<RunStatus> {
    let terminal = entry.contains(SUCCESS_MARKER)
        || entry.contains(FATAL_MARKER)
        || entry.contains(HALTED_MARKER);
    if !terminal {
        return None;
    }

    if entry.contains(FAILURE_GLYPH) || entry.contains("Fatal") {
        Some(RunStatus::Error)
    } else {
        Some(RunStatus::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payloads(decoder: &mut LineDecoder, chunks: &[&[u8]]) -> Vec<String> {
        chunks
            .iter()
            .flat_map(|chunk| decoder.push(chunk))
            .filter_map(|line| event_payload(&line).map(str::to_string))
            .collect()
    }

    #[test]
    fn reassembles_lines_split_across_chunks() {
        let mut decoder = LineDecoder::new();
        let got = payloads(&mut decoder, &[b"data: hello\n", b"data: wor", b"ld\n"]);
        assert_eq!(got, vec!["hello", "world"]);
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn handles_sse_blank_separators_and_crlf() {
        let mut decoder = LineDecoder::new();
        let got = payloads(
            &mut decoder,
            &[b"data: [SYSTEM] one\r\n\r\ndata: [AGENT] two\n\n", b": keep-alive\n"],
        );
        assert_eq!(got, vec!["[SYSTEM] one", "[AGENT] two"]);
    }

    #[test]
    fn keeps_multibyte_glyph_split_mid_codepoint() {
        let line = "data: [SYSTEM] ✅ Blueprint Execution Completed\n".as_bytes();
        // The check mark is three bytes; cut inside it.
        let cut = line.iter().position(|b| *b == 0xE2).unwrap() + 1;
        let mut decoder = LineDecoder::new();
        let got = payloads(&mut decoder, &[&line[..cut], &line[cut..]]);
        assert_eq!(got, vec!["[SYSTEM] ✅ Blueprint Execution Completed"]);
    }

    #[test]
    fn finish_returns_unterminated_tail() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"data: last words").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some("data: last words"));
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn only_prefixed_lines_are_events() {
        assert_eq!(event_payload("data: x"), Some("x"));
        assert_eq!(event_payload("data:x"), None);
        assert_eq!(event_payload("event: log"), None);
        assert_eq!(event_payload(" data: x"), None);
    }

    #[test]
    fn success_marker_completes() {
        assert_eq!(
            classify("[SYSTEM] ✅ Blueprint Execution Completed"),
            Some(RunStatus::Completed)
        );
    }

    #[test]
    fn failure_glyph_wins_over_fatal_text() {
        assert_eq!(
            classify("[ERROR] ❌ Fatal exception: boom"),
            Some(RunStatus::Error)
        );
        assert_eq!(
            classify("[ERROR] ❌ Visual drift detected. Execution halted."),
            Some(RunStatus::Error)
        );
    }

    #[test]
    fn fatal_without_glyph_is_error() {
        assert_eq!(
            classify("[ERROR] Fatal exception: connection refused"),
            Some(RunStatus::Error)
        );
    }

    #[test]
    fn halted_without_glyph_completes() {
        assert_eq!(classify("Execution halted by agent"), Some(RunStatus::Completed));
    }

    #[test]
    fn progress_lines_are_not_terminal() {
        assert_eq!(classify("[AGENT] 🔍 Searching for visual anchor: 'Login'"), None);
        // The glyph alone does not end a run.
        assert_eq!(classify("[ERROR] ❌ Blueprint not found"), None);
        assert_eq!(classify(""), None);
    }
}
