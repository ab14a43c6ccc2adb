//! Decodes SSE frames into chat stream events.
//!
//! Wire format: `event: <type>\ndata: <json>`, with `<type>` one of `meta`,
//! `chunk` or `error`.

use serde::Deserialize;
use thiserror::Error;

use crate::types::Reference;

/// One decoded event from the chat stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Documents the answer is drawn from.
    Meta(Vec<Reference>),
    /// Next piece of answer text.
    Chunk(String),
    /// The backend gave up on this turn.
    Error(StreamFailure),
}

/// Category of a backend-reported stream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamErrorKind {
    /// The secret was rejected mid-stream.
    Unauthorized,
    /// Nothing in the manual matched the question.
    NoContext,
    /// The backend is shedding load.
    RateLimited,
    /// Answer generation failed upstream of the backend.
    Upstream,
    /// Anything the backend did not classify.
    Unknown,
}

impl StreamErrorKind {
    /// Map a backend error code onto a kind.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "unauthorized" | "forbidden" | "auth" | "invalid_password" => Self::Unauthorized,
            "no_context" | "not_found" | "no_results" => Self::NoContext,
            "rate_limited" | "too_many_requests" | "overloaded" => Self::RateLimited,
            "upstream" | "generation_failed" | "llm_error" | "internal" => Self::Upstream,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for StreamErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::NoContext => write!(f, "no_context"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::Upstream => write!(f, "upstream"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A terminal `error` event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct StreamFailure {
    pub kind: StreamErrorKind,
    pub message: String,
}

impl StreamFailure {
    #[must_use]
    pub fn new(kind: StreamErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Decode an `error` payload. Structured payloads carry a code; anything
    /// else becomes an unclassified failure with the raw text.
    #[must_use]
    pub fn from_payload(data: &str) -> Self {
        match serde_json::from_str::<ErrorPayload>(data) {
            Ok(ErrorPayload::Structured {
                code,
                kind,
                message,
                error,
                detail,
            }) => Self {
                kind: code
                    .or(kind)
                    .map_or(StreamErrorKind::Unknown, |c| StreamErrorKind::from_code(&c)),
                message: message
                    .or(error)
                    .or(detail)
                    .unwrap_or_else(|| data.to_string()),
            },
            Ok(ErrorPayload::Text(text)) => Self::new(StreamErrorKind::Unknown, text),
            Err(_) => Self::new(StreamErrorKind::Unknown, data),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorPayload {
    Structured {
        code: Option<String>,
        kind: Option<String>,
        message: Option<String>,
        error: Option<String>,
        detail: Option<String>,
    },
    Text(String),
}

#[derive(Deserialize)]
struct MetaPayload {
    #[serde(default)]
    references: Option<Vec<Reference>>,
}

#[derive(Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    text: Option<String>,
}

/// Why a frame produced no event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame does not start with an event line")]
    NotAnEvent,
    #[error("frame has no data")]
    EmptyData,
    #[error("unknown event type {0:?}")]
    UnknownType(String),
    #[error("malformed {event} payload: {reason}")]
    MalformedJson { event: String, reason: String },
}

impl FrameError {
    /// Whether the frame was well-formed SSE that simply carries nothing for us.
    #[must_use]
    pub const fn is_silent(&self) -> bool {
        !matches!(self, Self::MalformedJson { .. })
    }
}

/// Split a frame into its event type and data payload.
///
/// The data normally sits on the line after `event:`; when it does not, all
/// `data:` lines are joined, and failing that the frame is scanned for a
/// `data:` marker and the remainder taken.
pub fn split_frame(frame: &str) -> Result<(&str, String), FrameError> {
    let frame = frame.trim();
    let mut lines = frame.lines().map(|line| line.trim_end_matches('\r'));

    let event_type = lines
        .next()
        .and_then(|line| line.strip_prefix("event:"))
        .map(str::trim)
        .ok_or(FrameError::NotAnEvent)?;

    let data_lines: Vec<&str> = lines
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();

    let data = if data_lines.is_empty() {
        frame
            .find("data:")
            .and_then(|at| frame.get(at + "data:".len()..))
            .map(|rest| rest.trim().to_string())
            .unwrap_or_default()
    } else {
        data_lines.join("\n").trim().to_string()
    };

    if data.is_empty() {
        return Err(FrameError::EmptyData);
    }
    Ok((event_type, data))
}

/// Decode one complete frame.
///
/// # Errors
///
/// Returns a [`FrameError`] when the frame yields no event: not an event
/// frame, empty data, an unknown type, or a payload that is not valid JSON.
pub fn parse_frame(frame: &str) -> Result<StreamEvent, FrameError> {
    let (event_type, data) = split_frame(frame)?;
    let malformed = |e: serde_json::Error| FrameError::MalformedJson {
        event: event_type.to_string(),
        reason: e.to_string(),
    };

    match event_type {
        "meta" => {
            let payload: MetaPayload = serde_json::from_str(&data).map_err(malformed)?;
            Ok(StreamEvent::Meta(payload.references.unwrap_or_default()))
        }
        "chunk" => {
            let payload: ChunkPayload = serde_json::from_str(&data).map_err(malformed)?;
            Ok(StreamEvent::Chunk(payload.text.unwrap_or_default()))
        }
        "error" => Ok(StreamEvent::Error(StreamFailure::from_payload(&data))),
        other => Err(FrameError::UnknownType(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArticleId;

    #[test]
    fn test_chunk_frame() {
        assert_eq!(
            parse_frame("event: chunk\ndata: {\"text\":\"Hel\"}"),
            Ok(StreamEvent::Chunk("Hel".into()))
        );
    }

    #[test]
    fn test_chunk_without_text_is_empty() {
        assert_eq!(
            parse_frame("event: chunk\ndata: {}"),
            Ok(StreamEvent::Chunk(String::new()))
        );
    }

    #[test]
    fn test_meta_frame() {
        let event = parse_frame(
            "event: meta\ndata: {\"references\":[{\"article_id\":1,\"category_code\":\"OPS\",\"title\":\"Doc\"}]}",
        )
        .unwrap();
        assert_eq!(
            event,
            StreamEvent::Meta(vec![Reference {
                article_id: ArticleId::new(1),
                category_code: "OPS".into(),
                title: Some("Doc".into()),
            }])
        );
    }

    #[test]
    fn test_meta_with_null_or_missing_references() {
        assert_eq!(
            parse_frame("event: meta\ndata: {\"references\":null}"),
            Ok(StreamEvent::Meta(Vec::new()))
        );
        assert_eq!(
            parse_frame("event: meta\ndata: {}"),
            Ok(StreamEvent::Meta(Vec::new()))
        );
    }

    #[test]
    fn test_data_not_on_second_line() {
        let frame = "event: chunk\nid: 7\ndata: {\"text\":\"x\"}";
        assert_eq!(parse_frame(frame), Ok(StreamEvent::Chunk("x".into())));
    }

    #[test]
    fn test_data_marker_fallback() {
        let frame = "event: chunk\n  data: {\"text\":\"y\"}";
        assert_eq!(split_frame(frame).unwrap(), ("chunk", "{\"text\":\"y\"}".to_string()));
        assert_eq!(parse_frame(frame), Ok(StreamEvent::Chunk("y".into())));
    }

    #[test]
    fn test_frames_without_event_line_are_ignored() {
        assert_eq!(parse_frame(": keep-alive"), Err(FrameError::NotAnEvent));
        assert_eq!(
            parse_frame("data: {\"text\":\"x\"}"),
            Err(FrameError::NotAnEvent)
        );
    }

    #[test]
    fn test_empty_data_is_ignored() {
        assert_eq!(parse_frame("event: chunk\ndata: "), Err(FrameError::EmptyData));
        assert_eq!(parse_frame("event: chunk"), Err(FrameError::EmptyData));
    }

    #[test]
    fn test_unknown_type_is_silent() {
        let err = parse_frame("event: ping\ndata: {}").unwrap_err();
        assert_eq!(err, FrameError::UnknownType("ping".into()));
        assert!(err.is_silent());
    }

    #[test]
    fn test_malformed_json_is_reported() {
        let err = parse_frame("event: chunk\ndata: {not json").unwrap_err();
        assert!(matches!(err, FrameError::MalformedJson { ref event, .. } if event == "chunk"));
        assert!(!err.is_silent());
    }

    #[test]
    fn test_error_payload_with_code() {
        let event = parse_frame(
            "event: error\ndata: {\"code\":\"rate_limited\",\"message\":\"slow down\"}",
        )
        .unwrap();
        assert_eq!(
            event,
            StreamEvent::Error(StreamFailure::new(StreamErrorKind::RateLimited, "slow down"))
        );
    }

    #[test]
    fn test_error_payload_plain_text() {
        let event = parse_frame("event: error\ndata: generation exploded").unwrap();
        assert_eq!(
            event,
            StreamEvent::Error(StreamFailure::new(
                StreamErrorKind::Unknown,
                "generation exploded"
            ))
        );
    }

    #[test]
    fn test_error_payload_message_only() {
        let failure = StreamFailure::from_payload(r#"{"message":"no documents"}"#);
        assert_eq!(failure.kind, StreamErrorKind::Unknown);
        assert_eq!(failure.message, "no documents");
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(StreamErrorKind::from_code("NO_CONTEXT"), StreamErrorKind::NoContext);
        assert_eq!(StreamErrorKind::from_code("unauthorized"), StreamErrorKind::Unauthorized);
        assert_eq!(StreamErrorKind::from_code("llm_error"), StreamErrorKind::Upstream);
        assert_eq!(StreamErrorKind::from_code("???"), StreamErrorKind::Unknown);
    }
}
