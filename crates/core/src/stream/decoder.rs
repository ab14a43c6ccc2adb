use super::event::{StreamEvent, parse_frame};
use super::frame::FrameSplitter;

/// Byte stream in, ordered [`StreamEvent`]s out.
///
/// Frames that carry nothing are dropped quietly; frames with malformed JSON
/// are logged and skipped so later frames still apply.
#[derive(Debug, Default)]
pub struct SseDecoder {
    splitter: FrameSplitter,
}

impl SseDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode every frame completed by this read.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        self.splitter
            .push(bytes)
            .iter()
            .filter_map(|frame| decode(frame))
            .collect()
    }

    /// Decode the residual buffer once the stream has ended.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        self.splitter
            .finish()
            .iter()
            .filter_map(|frame| decode(frame))
            .collect()
    }
}

/// The single frame decoding path, shared by per-read parsing and the final
/// flush.
fn decode(frame: &str) -> Option<StreamEvent> {
    match parse_frame(frame) {
        Ok(event) => Some(event),
        Err(e) if e.is_silent() => {
            tracing::trace!(reason = %e, "ignoring stream frame");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "skipping malformed stream frame");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_parses_unterminated_final_frame() {
        let mut decoder = SseDecoder::new();
        assert_eq!(
            decoder.feed(b"event: chunk\ndata: {\"text\":\"a\"}\n\nevent: chunk\ndata: {\"text\":\"b\"}"),
            vec![StreamEvent::Chunk("a".into())]
        );
        assert_eq!(decoder.finish(), vec![StreamEvent::Chunk("b".into())]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_malformed_frame_does_not_stop_later_frames() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(
            b"event: chunk\ndata: {\"text\":\"a\"}\n\n\
              event: chunk\ndata: {oops}\n\n\
              event: chunk\ndata: {\"text\":\"c\"}\n\n",
        );
        assert_eq!(
            events,
            vec![StreamEvent::Chunk("a".into()), StreamEvent::Chunk("c".into())]
        );
    }
}
