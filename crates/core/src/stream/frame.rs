//! Splits a raw SSE byte stream into frames.
//!
//! Reads may end anywhere, including inside a multi-byte UTF-8 sequence, so
//! bytes are buffered until a blank-line delimiter closes the frame and only
//! complete frames are decoded to text.

/// Accumulates bytes across reads and yields complete frames.
#[derive(Debug, Default)]
pub struct FrameSplitter {
    buffer: Vec<u8>,
    /// Bytes already searched for a delimiter.
    scanned: usize,
}

impl FrameSplitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one read and return every frame it completed, in order.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut frames = Vec::new();

        // A delimiter may straddle the previous read, so back up a few bytes.
        let mut from = self.scanned.saturating_sub(3);
        while let Some((end, delimiter_len)) = find_delimiter(&self.buffer, from) {
            let frame: Vec<u8> = self.buffer.drain(..end + delimiter_len).take(end).collect();
            frames.push(String::from_utf8_lossy(&frame).into_owned());
            from = 0;
        }
        self.scanned = self.buffer.len();
        frames
    }

    /// Take whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        self.scanned = 0;
        if self.buffer.iter().all(u8::is_ascii_whitespace) {
            self.buffer.clear();
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }

    /// Bytes held back waiting for a delimiter.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Earliest `\n\n` or `\r\n\r\n` at or after `from`: (frame end, delimiter length).
fn find_delimiter(buffer: &[u8], from: usize) -> Option<(usize, usize)> {
    let tail = buffer.get(from..)?;
    tail.windows(2).enumerate().find_map(|(i, pair)| {
        if pair == b"\n\n" {
            return Some((from + i, 2));
        }
        if pair == b"\r\n" && tail.get(i + 2..i + 4) == Some(b"\r\n".as_slice()) {
            return Some((from + i, 4));
        }
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_on_blank_line() {
        let mut splitter = FrameSplitter::new();
        let frames = splitter.push(b"event: chunk\ndata: {}\n\nevent: meta\ndata: {}\n\n");
        assert_eq!(frames, vec!["event: chunk\ndata: {}", "event: meta\ndata: {}"]);
        assert_eq!(splitter.pending(), 0);
    }

    #[test]
    fn test_keeps_partial_frame_buffered() {
        let mut splitter = FrameSplitter::new();
        assert!(splitter.push(b"event: chunk\ndata: {\"te").is_empty());
        assert!(splitter.push(b"xt\":\"a\"}\n").is_empty());
        assert_eq!(
            splitter.push(b"\nevent"),
            vec!["event: chunk\ndata: {\"text\":\"a\"}"]
        );
        assert_eq!(splitter.finish().as_deref(), Some("event"));
    }

    #[test]
    fn test_multibyte_character_split_across_reads() {
        let frame = "event: chunk\ndata: {\"text\":\"안녕\"}\n\n".as_bytes();
        let split = frame.iter().position(|&b| b >= 0x80).unwrap() + 1;

        let mut splitter = FrameSplitter::new();
        assert!(splitter.push(&frame[..split]).is_empty());
        let frames = splitter.push(&frame[split..]);
        assert_eq!(frames, vec!["event: chunk\ndata: {\"text\":\"안녕\"}"]);
    }

    #[test]
    fn test_crlf_delimiter() {
        let mut splitter = FrameSplitter::new();
        let frames = splitter.push(b"event: chunk\r\ndata: {}\r\n\r\nevent: meta\r\n");
        assert_eq!(frames, vec!["event: chunk\r\ndata: {}"]);
        let frames = splitter.push(b"data: {}\r\n\r\n");
        assert_eq!(frames, vec!["event: meta\r\ndata: {}"]);
    }

    #[test]
    fn test_delimiter_split_across_reads() {
        let mut splitter = FrameSplitter::new();
        assert!(splitter.push(b"event: chunk\ndata: {}\n").is_empty());
        assert_eq!(splitter.push(b"\n"), vec!["event: chunk\ndata: {}"]);
    }

    #[test]
    fn test_finish_ignores_whitespace_residue() {
        let mut splitter = FrameSplitter::new();
        splitter.push(b"event: chunk\ndata: {}\n\n\n");
        assert_eq!(splitter.finish(), None);
    }
}
