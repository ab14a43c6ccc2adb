//! Store-owner chat screen.
//!
//! Submitting a question starts one streamed turn on the server and
//! redirects straight back. While it runs the page refreshes itself and
//! shows the answer received so far.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use bon_manual_core::chat::MessageList;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireUser;
use crate::models::Flash;
use crate::services::{ChatService, Submission};
use crate::state::AppState;

const BUSY_NOTICE: &str = "Please wait for the current answer to finish.";

/// Build the chat router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chat", get(index).post(ask))
        .route("/chat/cancel", post(cancel))
        .route("/chat/reset", post(reset))
}

/// Chat transcript page.
#[derive(Template, WebTemplate)]
#[template(path = "chat/index.html")]
pub struct ChatTemplate {
    pub flash: Option<Flash>,
    /// Left by a turn that ended in the background.
    pub notice: Option<Flash>,
    pub messages: MessageList,
    /// A turn is still running; the question form is locked.
    pub streaming: bool,
}

/// Question form.
#[derive(Debug, Deserialize)]
pub struct AskForm {
    pub question: String,
}

/// GET /chat
#[instrument(skip_all)]
async fn index(
    RequireUser(_credential): RequireUser,
    State(state): State<AppState>,
    session: Session,
) -> impl IntoResponse {
    let chat = ChatService::new(&state, &session);
    // The turn stores its notice before releasing the slot
    let streaming = chat.is_streaming();
    ChatTemplate {
        flash: Flash::take(&session).await,
        notice: if streaming { None } else { chat.take_notice() },
        messages: chat.transcript(),
        streaming,
    }
}

/// POST /chat
#[instrument(skip_all)]
async fn ask(
    RequireUser(credential): RequireUser,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AskForm>,
) -> Result<Response, AppError> {
    let question = form.question.trim();
    if question.is_empty() {
        return Ok(Redirect::to("/chat").into_response());
    }

    let chat = ChatService::new(&state, &session);
    if chat.submit(&credential, question)? == Submission::Busy {
        Flash::warning(BUSY_NOTICE).push(&session).await;
    }

    Ok(Redirect::to("/chat").into_response())
}

/// POST /chat/cancel
#[instrument(skip_all)]
async fn cancel(
    RequireUser(_credential): RequireUser,
    State(state): State<AppState>,
    session: Session,
) -> impl IntoResponse {
    if !ChatService::new(&state, &session).cancel() {
        Flash::warning("No answer is in progress.").push(&session).await;
    }
    Redirect::to("/chat")
}

/// POST /chat/reset
#[instrument(skip_all)]
async fn reset(
    RequireUser(_credential): RequireUser,
    State(state): State<AppState>,
    session: Session,
) -> impl IntoResponse {
    let chat = ChatService::new(&state, &session);
    if chat.is_streaming() {
        Flash::warning(BUSY_NOTICE).push(&session).await;
    } else {
        chat.reset();
    }
    Redirect::to("/chat")
}
