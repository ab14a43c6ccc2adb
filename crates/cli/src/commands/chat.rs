//! Streamed chat in the terminal.
//!
//! # Usage
//!
//! ```bash
//! # One question
//! BM_PASSWORD=1234 bm-cli ask "How do I close the register?"
//!
//! # Conversation; Ctrl+C stops the current answer, Ctrl+D exits
//! BM_PASSWORD=1234 bm-cli chat
//! ```

use std::io::{self, Write};

use bon_manual_core::chat::{ERROR_NOTICE, GREETING, MessageId, MessageList};
use bon_manual_core::stream::{StreamEvent, TurnError};
use bon_manual_core::{Credential, Role};
use bon_manual_web::backend::stream_answer;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{CliError, Context};

/// Ask one question and stream the answer.
///
/// # Errors
///
/// Returns an error if no password was given or the turn failed.
pub async fn ask(context: &Context, question: &str) -> Result<(), CliError> {
    let credential = context.credential(Role::User)?;
    let mut messages = MessageList::default();
    messages.push_user(question);

    let cancel = CancellationToken::new();
    let watcher = cancel_on_ctrl_c(&cancel);
    let result = turn(context, &credential, question, &mut messages, &cancel).await;
    watcher.abort();

    match result {
        Ok(()) | Err(TurnError::Cancelled) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Read questions from stdin until EOF, streaming each answer.
///
/// # Errors
///
/// Returns an error if no password was given or the terminal fails. Failed
/// turns are reported inline and the loop continues.
#[allow(clippy::print_stdout)]
pub async fn interactive(context: &Context) -> Result<(), CliError> {
    let credential = context.credential(Role::User)?;
    let mut messages = MessageList::with_greeting();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{GREETING}");
    loop {
        print!("\n> ");
        io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }

        messages.push_user(question);
        let cancel = CancellationToken::new();
        let watcher = cancel_on_ctrl_c(&cancel);
        let result = turn(context, &credential, question, &mut messages, &cancel).await;
        watcher.abort();

        if let Err(e) = result {
            tracing::debug!(error = %e, "turn ended early");
        }
    }

    Ok(())
}

/// Stream one answer to stdout, then list its references.
#[allow(clippy::print_stdout)]
async fn turn(
    context: &Context,
    credential: &Credential,
    question: &str,
    messages: &mut MessageList,
    cancel: &CancellationToken,
) -> Result<(), TurnError> {
    let mut stdout = io::stdout();
    let mut write_error: Option<io::Error> = None;

    let result = stream_answer(context.backend(), credential, question, messages, cancel, |_, event| {
        if let StreamEvent::Chunk(text) = event {
            if write_error.is_none() {
                write_error = stdout
                    .write_all(text.as_bytes())
                    .and_then(|()| stdout.flush())
                    .err();
            }
        }
    })
    .await;

    if let Some(e) = write_error {
        tracing::warn!(error = %e, "failed to write answer");
    }

    match &result {
        Ok(id) => print_references(messages, *id),
        Err(TurnError::Cancelled) => println!("\n[stopped]"),
        Err(e) => {
            println!("{ERROR_NOTICE}");
            tracing::warn!(error = %e, "answer failed");
        }
    }

    result.map(drop)
}

#[allow(clippy::print_stdout)]
fn print_references(messages: &MessageList, id: MessageId) {
    println!();
    let Some(references) = messages.get(id).and_then(|m| m.references.as_ref()) else {
        return;
    };
    if references.is_empty() {
        return;
    }
    println!("\nReference documents:");
    for reference in references {
        println!("  - {}", reference.label());
    }
}

/// Cancel `token` on the next Ctrl+C. Abort the handle once the turn is over.
fn cancel_on_ctrl_c(token: &CancellationToken) -> JoinHandle<()> {
    let token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    })
}
