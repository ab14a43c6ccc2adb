//! Role gate extractors.
//!
//! Protected handlers take the session credential as an explicit argument
//! through [`RequireUser`] or [`RequireAdmin`]; nothing else reads it.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use bon_manual_core::{Credential, Role};
use tower_sessions::Session;

use crate::models::{Flash, session_keys};

/// Extractor that requires a store-owner credential.
///
/// # Example
///
/// ```rust,ignore
/// async fn chat_page(RequireUser(credential): RequireUser) -> impl IntoResponse {
///     // credential.role() == Role::User
/// }
/// ```
pub struct RequireUser(pub Credential);

/// Extractor that requires an administrator credential.
pub struct RequireAdmin(pub Credential);

/// Extractor that reads the credential if there is one.
pub struct OptionalCredential(pub Option<Credential>);

/// Error returned when the session does not hold the required role.
#[derive(Debug)]
pub enum RoleRejection {
    /// Nobody signed in: back to the entry screen.
    SignIn,
    /// Signed in under the other role: back to the entry screen with a notice.
    WrongRole,
    /// Session layer missing.
    NoSession,
}

impl IntoResponse for RoleRejection {
    fn into_response(self) -> Response {
        match self {
            Self::SignIn | Self::WrongRole => Redirect::to("/").into_response(),
            Self::NoSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

/// Notice shown when a page is opened under the wrong role.
#[must_use]
pub const fn denied_message(required: Role) -> &'static str {
    match required {
        Role::Admin => "Only administrators can access this page.",
        Role::User => "You do not have access to this page.",
    }
}

async fn require_role(parts: &Parts, required: Role) -> Result<Credential, RoleRejection> {
    // Get the session from extensions (set by SessionManagerLayer)
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(RoleRejection::NoSession)?;

    let credential: Credential = session
        .get(session_keys::CREDENTIAL)
        .await
        .ok()
        .flatten()
        .ok_or(RoleRejection::SignIn)?;

    if credential.role() != required {
        tracing::info!(
            path = %parts.uri.path(),
            role = %credential.role(),
            required = %required,
            "role gate refused request"
        );
        Flash::warning(denied_message(required)).push(session).await;
        return Err(RoleRejection::WrongRole);
    }

    Ok(credential)
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = RoleRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, Role::User).await.map(Self)
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = RoleRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, Role::Admin).await.map(Self)
    }
}

impl<S> FromRequestParts<S> for OptionalCredential
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let credential = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<Credential>(session_keys::CREDENTIAL)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(credential))
    }
}

/// Store a freshly verified credential.
///
/// The session id is cycled first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_credential(
    session: &Session,
    credential: &Credential,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CREDENTIAL, credential).await
}

/// Sign out: drop the credential and every transcript.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
