//! Runs one streamed chat turn against the backend.
//!
//! The read loop is the only place a turn can wait indefinitely, so every
//! read races the turn's [`CancellationToken`]. Dropping the future cancels
//! the turn as well.

use std::fmt::Display;

use bon_manual_core::Credential;
use bon_manual_core::chat::{Message, MessageId, MessageList};
use bon_manual_core::stream::{ChatTurn, StreamEvent, TurnError, TurnState};
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::client::BackendClient;

/// Ask `question`, streaming the answer into a new assistant message.
///
/// `on_event` sees each event together with the assistant message it has
/// just been merged into, for live rendering. On failure the assistant
/// message stays in `messages` with the error notice appended.
///
/// # Errors
///
/// Returns the reason the turn did not complete.
#[instrument(skip_all)]
pub async fn stream_answer<F>(
    client: &BackendClient,
    credential: &Credential,
    question: &str,
    messages: &mut MessageList,
    cancel: &CancellationToken,
    on_event: F,
) -> Result<MessageId, TurnError>
where
    F: FnMut(&Message, &StreamEvent),
{
    let id = messages.begin_assistant();
    let mut turn = ChatTurn::new(id);
    turn.begin();

    let opened = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            turn.cancel();
            return Err(TurnError::Cancelled);
        }
        opened = client.chat_stream(credential, question) => opened,
    };

    let stream = match opened {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(error = %e, "chat stream could not be opened");
            turn.fail();
            messages.mark_failed(id);
            return Err(e.into());
        }
    };

    drive(&mut turn, stream, messages, cancel, on_event).await?;
    Ok(id)
}

/// Feed a byte stream through `turn` until it ends, fails or is cancelled.
///
/// # Errors
///
/// Returns [`TurnError::Backend`] for an `error` event,
/// [`TurnError::Transport`] when a read fails and [`TurnError::Cancelled`]
/// when `cancel` fires. The first two leave exactly one error notice on the
/// turn's message.
pub async fn drive<S, B, E, F>(
    turn: &mut ChatTurn,
    stream: S,
    messages: &mut MessageList,
    cancel: &CancellationToken,
    mut on_event: F,
) -> Result<(), TurnError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
    F: FnMut(&Message, &StreamEvent),
{
    let mut stream = std::pin::pin!(stream);

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                turn.cancel();
                tracing::debug!(message_id = %turn.message_id(), "chat turn cancelled");
                return Err(TurnError::Cancelled);
            }
            next = stream.next() => next,
        };

        match next {
            Some(Ok(bytes)) => {
                for event in turn.feed_into(bytes.as_ref(), messages) {
                    report(messages, turn.message_id(), &event, &mut on_event);
                }
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "chat stream read failed");
                turn.fail();
                messages.mark_failed(turn.message_id());
                return Err(TurnError::Transport(e.to_string()));
            }
            None => break,
        }

        if turn.state() == TurnState::Errored {
            break;
        }
    }

    for event in turn.finish_into(messages) {
        report(messages, turn.message_id(), &event, &mut on_event);
    }

    match turn.failure() {
        Some(failure) => {
            tracing::warn!(kind = %failure.kind, message = %failure.message, "backend ended chat turn with an error");
            Err(TurnError::Backend(failure.clone()))
        }
        None => Ok(()),
    }
}

fn report<F>(messages: &MessageList, id: MessageId, event: &StreamEvent, on_event: &mut F)
where
    F: FnMut(&Message, &StreamEvent),
{
    if let Some(message) = messages.get(id) {
        on_event(message, event);
    }
}

#[cfg(test)]
mod tests {
    use bon_manual_core::chat::ERROR_NOTICE;
    use bon_manual_core::stream::StreamErrorKind;

    use super::*;

    fn reads(parts: &[&'static str]) -> impl Stream<Item = Result<&'static [u8], std::io::Error>> {
        let items: Vec<Result<&'static [u8], std::io::Error>> =
            parts.iter().map(|p| Ok(p.as_bytes())).collect();
        futures::stream::iter(items)
    }

    fn new_turn(messages: &mut MessageList) -> ChatTurn {
        let mut turn = ChatTurn::new(messages.begin_assistant());
        turn.begin();
        turn
    }

    #[tokio::test]
    async fn test_drive_merges_reads_and_reports_events() {
        let mut messages = MessageList::with_greeting();
        let mut turn = new_turn(&mut messages);
        let mut seen = Vec::new();

        let result = drive(
            &mut turn,
            reads(&[
                "event: chunk\ndata: {\"text\":\"He",
                "l\"}\n\nevent: chunk\ndata: {\"text\":\"lo\"}\n\n",
                "event: meta\ndata: {\"references\":[]}",
            ]),
            &mut messages,
            &CancellationToken::new(),
            |message, event| seen.push((message.content.clone(), event.clone())),
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(turn.state(), TurnState::Completed);
        assert_eq!(messages.get(turn.message_id()).unwrap().content, "Hello");
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].0, "Hel");
        assert_eq!(seen[1].0, "Hello");
        assert_eq!(seen[2], ("Hello".to_string(), StreamEvent::Meta(Vec::new())));
    }

    #[tokio::test]
    async fn test_drive_stops_at_error_event() {
        let mut messages = MessageList::default();
        let mut turn = new_turn(&mut messages);

        let result = drive(
            &mut turn,
            reads(&[
                "event: chunk\ndata: {\"text\":\"Part\"}\n\n",
                "event: error\ndata: {\"code\":\"no_context\",\"message\":\"nothing found\"}\n\n",
                "event: chunk\ndata: {\"text\":\"never\"}\n\n",
            ]),
            &mut messages,
            &CancellationToken::new(),
            |_, _| {},
        )
        .await;

        match result {
            Err(TurnError::Backend(failure)) => assert_eq!(failure.kind, StreamErrorKind::NoContext),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(
            messages.get(turn.message_id()).unwrap().content,
            format!("Part{ERROR_NOTICE}")
        );
    }

    #[tokio::test]
    async fn test_drive_transport_failure_adds_one_notice() {
        let mut messages = MessageList::default();
        let mut turn = new_turn(&mut messages);
        let items: Vec<Result<&'static [u8], std::io::Error>> = vec![
            Ok(b"event: chunk\ndata: {\"text\":\"Part\"}\n\n".as_slice()),
            Err(std::io::Error::other("connection reset")),
        ];

        let result = drive(
            &mut turn,
            futures::stream::iter(items),
            &mut messages,
            &CancellationToken::new(),
            |_, _| {},
        )
        .await;

        assert!(matches!(result, Err(TurnError::Transport(ref m)) if m.contains("connection reset")));
        assert_eq!(turn.state(), TurnState::Errored);
        let content = &messages.get(turn.message_id()).unwrap().content;
        assert_eq!(content.matches(ERROR_NOTICE).count(), 1);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_a_silent_stream() {
        let mut messages = MessageList::default();
        let mut turn = new_turn(&mut messages);
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let result = drive(
            &mut turn,
            futures::stream::pending::<Result<&'static [u8], std::io::Error>>(),
            &mut messages,
            &cancel,
            |_, _| {},
        )
        .await;

        assert_eq!(result, Err(TurnError::Cancelled));
        assert_eq!(turn.state(), TurnState::Cancelled);
        assert!(!messages.get(turn.message_id()).unwrap().failed);
    }
}
