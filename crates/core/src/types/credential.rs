//! Roles and the session credential.
//!
//! A [`Credential`] is created once the backend has verified a role's shared
//! secret. It is read-only afterwards and travels with every protected request
//! as an explicit value; the secret is attached to outgoing backend calls under
//! the role's header.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Who is using the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Content administrator (category/article management, preview chat).
    Admin,
    /// Store owner using the chatbot.
    User,
}

impl Role {
    /// Header under which the backend expects this role's secret.
    #[must_use]
    pub const fn header_name(self) -> &'static str {
        match self {
            Self::Admin => "X-Admin-Password",
            Self::User => "X-User-Password",
        }
    }

    /// Human-readable label for notices.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "Administrator",
            Self::User => "Store owner",
        }
    }

    /// Landing page after a successful sign-in.
    #[must_use]
    pub const fn home_path(self) -> &'static str {
        match self {
            Self::Admin => "/admin",
            Self::User => "/chat",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::User => write!(f, "user"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// Verified role and shared secret held for the browser session.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    role: Role,
    #[serde(serialize_with = "expose_password", deserialize_with = "conceal_password")]
    password: SecretString,
}

impl Credential {
    #[must_use]
    pub const fn new(role: Role, password: SecretString) -> Self {
        Self { role, password }
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub const fn password(&self) -> &SecretString {
        &self.password
    }

    /// `(header name, header value)` to attach to backend requests.
    #[must_use]
    pub fn header(&self) -> (&'static str, &str) {
        (self.role.header_name(), self.password.expose_secret())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("role", &self.role)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

// Session records store the secret as a plain string.
fn expose_password<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn conceal_password<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}
