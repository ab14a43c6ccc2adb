//! Admin preview chat.
//!
//! Asks the backend as an administrator and shows each answer with the
//! chunks and references it was built from. Not streamed.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::State,
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{Flash, PreviewTranscript, session_keys};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/preview", get(index).post(ask))
        .route("/admin/preview/reset", post(reset))
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/preview.html")]
pub struct PreviewTemplate {
    pub flash: Option<Flash>,
    pub current_path: &'static str,
    pub transcript: PreviewTranscript,
}

#[derive(Debug, Deserialize)]
pub struct PreviewForm {
    pub question: String,
}

async fn load(session: &Session) -> Result<PreviewTranscript, AppError> {
    Ok(session
        .get::<PreviewTranscript>(session_keys::PREVIEW_MESSAGES)
        .await?
        .unwrap_or_default())
}

/// GET /admin/preview
#[instrument(skip_all)]
async fn index(RequireAdmin(_credential): RequireAdmin, session: Session) -> Result<impl IntoResponse, AppError> {
    Ok(PreviewTemplate {
        flash: Flash::take(&session).await,
        current_path: "/admin/preview",
        transcript: load(&session).await?,
    })
}

/// POST /admin/preview
///
/// A failed call appends the fixed error line instead of an answer.
#[instrument(skip_all)]
async fn ask(
    RequireAdmin(credential): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<PreviewForm>,
) -> Result<impl IntoResponse, AppError> {
    let question = form.question.trim();
    if question.is_empty() {
        return Ok(Redirect::to("/admin/preview"));
    }

    let mut transcript = load(&session).await?;
    transcript.push_question(question);

    match state.backend().preview_chat(&credential, question).await {
        Ok(answer) => transcript.push_answer(&answer),
        Err(e) => {
            tracing::warn!(error = %e, "preview chat failed");
            transcript.push_error();
        }
    }

    session
        .insert(session_keys::PREVIEW_MESSAGES, &transcript)
        .await?;
    Ok(Redirect::to("/admin/preview"))
}

/// POST /admin/preview/reset
#[instrument(skip_all)]
async fn reset(RequireAdmin(_credential): RequireAdmin, session: Session) -> Result<impl IntoResponse, AppError> {
    session
        .remove::<PreviewTranscript>(session_keys::PREVIEW_MESSAGES)
        .await?;
    Ok(Redirect::to("/admin/preview"))
}
