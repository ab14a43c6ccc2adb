//! Secret verification.

use bon_manual_core::Role;
use secrecy::ExposeSecret;

use super::{CliError, Context};

/// Check the given secret for `role` against the backend.
///
/// # Errors
///
/// Returns [`CliError::Rejected`] if the backend refuses the secret.
#[allow(clippy::print_stdout)]
pub async fn run(context: &Context, role: Role) -> Result<(), CliError> {
    let password = context.password()?;
    let verdict = context
        .backend()
        .verify(role, password.expose_secret())
        .await?;

    if !verdict.ok {
        return Err(CliError::Rejected(
            verdict
                .message
                .unwrap_or_else(|| "Authentication failed.".to_string()),
        ));
    }

    println!("{} verified.", role.label());
    Ok(())
}
