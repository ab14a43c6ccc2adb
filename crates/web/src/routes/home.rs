//! Entry screen, sign-in and sign-out.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use bon_manual_core::{Credential, Role};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::{OptionalCredential, clear_session, set_credential};
use crate::models::Flash;
use crate::state::AppState;

/// Build the entry router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// Entry screen: pick a role and enter its secret.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub flash: Option<Flash>,
    pub signed_in: Option<Role>,
}

impl HomeTemplate {
    /// Path of the signed-in role's landing page.
    fn continue_path(&self) -> Option<&'static str> {
        self.signed_in.map(Role::home_path)
    }
}

/// Sign-in form.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub role: Role,
    pub password: String,
}

/// GET /
async fn index(session: Session, OptionalCredential(credential): OptionalCredential) -> impl IntoResponse {
    HomeTemplate {
        flash: Flash::take(&session).await,
        signed_in: credential.map(|c| c.role()),
    }
}

/// POST /login
///
/// Sends `{mode, password}` to the backend. Only an `ok` verdict signs in.
#[instrument(skip(state, session, form), fields(role = %form.role))]
async fn login(State(state): State<AppState>, session: Session, Form(form): Form<LoginForm>) -> Response {
    if form.password.is_empty() {
        Flash::error("Please enter the password.").push(&session).await;
        return Redirect::to("/").into_response();
    }

    let verdict = match state.backend().verify(form.role, &form.password).await {
        Ok(verdict) => verdict,
        Err(e) => {
            tracing::warn!(error = %e, "verification failed");
            Flash::error(e.user_message()).push(&session).await;
            return Redirect::to("/").into_response();
        }
    };

    if !verdict.ok {
        tracing::info!("secret rejected");
        let message = verdict
            .message
            .unwrap_or_else(|| "Authentication failed.".to_string());
        Flash::error(message).push(&session).await;
        return Redirect::to("/").into_response();
    }

    let credential = Credential::new(form.role, SecretString::from(form.password));
    if let Err(e) = set_credential(&session, &credential).await {
        tracing::error!(error = %e, "failed to store credential");
        Flash::error("Could not start a session. Please try again.")
            .push(&session)
            .await;
        return Redirect::to("/").into_response();
    }

    tracing::info!("signed in");
    add_breadcrumb("auth", &format!("signed in as {}", form.role));
    Flash::success(format!("{} verified.", form.role.label()))
        .push(&session)
        .await;
    Redirect::to(form.role.home_path()).into_response()
}

/// POST /logout
async fn logout(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    if let Some(id) = session.id() {
        let key = id.to_string();
        state.turns().cancel(&key);
        state.transcripts().remove(&key);
    }
    add_breadcrumb("auth", "signed out");
    if let Err(e) = clear_session(&session).await {
        tracing::warn!(error = %e, "failed to clear session");
    }
    Redirect::to("/")
}
