//! Command implementations.

pub mod chat;
pub mod content;
pub mod verify;

use bon_manual_core::stream::TurnError;
use bon_manual_core::{Credential, Role};
use bon_manual_web::backend::{BackendClient, BackendError};
use bon_manual_web::config::{BackendConfig, ConfigError};
use secrecy::SecretString;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// No secret given on the command line or in `BM_PASSWORD`.
    #[error("A password is required: pass --password or set BM_PASSWORD")]
    MissingPassword,

    /// Backend URL or timeouts are invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Backend call failed.
    #[error("{}", .0.user_message())]
    Backend(#[from] BackendError),

    /// Streamed answer ended in an error.
    #[error("{0}")]
    Turn(#[from] TurnError),

    /// Backend refused the secret.
    #[error("Verification failed: {0}")]
    Rejected(String),

    /// Terminal I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output could not be encoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What every command needs: a backend client and the caller's secret.
pub struct Context {
    backend: BackendClient,
    password: Option<SecretString>,
    json: bool,
}

impl Context {
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(backend_url: &str, password: Option<String>, json: bool) -> Result<Self, CliError> {
        let config = BackendConfig::new(backend_url)?;
        Ok(Self {
            backend: BackendClient::new(&config)?,
            password: password.filter(|p| !p.is_empty()).map(SecretString::from),
            json,
        })
    }

    #[must_use]
    pub const fn backend(&self) -> &BackendClient {
        &self.backend
    }

    /// Print JSON instead of tables.
    #[must_use]
    pub const fn json(&self) -> bool {
        self.json
    }

    /// The secret as given, unverified.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::MissingPassword`] if none was given.
    pub fn password(&self) -> Result<&SecretString, CliError> {
        self.password.as_ref().ok_or(CliError::MissingPassword)
    }

    /// A credential for `role` built from the given secret.
    ///
    /// The backend checks it on every call, so no separate verification runs.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::MissingPassword`] if no secret was given.
    pub fn credential(&self, role: Role) -> Result<Credential, CliError> {
        Ok(Credential::new(role, self.password()?.clone()))
    }
}
