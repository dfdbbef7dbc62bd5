//! Sign-in state machine, shared by both principal kinds.
//!
//! ```text
//! lookup by email ── missing ──────────────────────────▶ "Email does not exist"
//!   │ unverified ── issue verification token + mail ───▶ "Confirmation email sent!"
//!   │ two-factor on, no code ── issue code + mail ─────▶ { twoFactor: true }
//!   │ two-factor on, code ── wrong ────────────────────▶ "Invalid code"
//!   │                    ── expired ──────────────────▶ "Code has expired"
//!   │                    ── ok: consume, confirm ─┐
//!   ▼                                             ▼
//! session sign-in ── bad password ────────────────────▶ "Invalid credentials"
//!                 ── ok ──────────────────────────────▶ "Successfully logged in!"
//! ```
//!
//! Token issuance happens before the password is checked.

use chrono::Utc;
use serde::Deserialize;
use tracing::debug;
use validator::Validate;

use super::{ActionError, ActionResult, settle};
use crate::{
    auth::{
        backend::{Credentials, PasswordCredentials, SignIn, SignInError},
        principal::{Principal, principals},
        tokens,
    },
    entities::sea_orm_active_enums::PrincipalKind,
    router::AppState,
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email(message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    pub code: Option<String>,
}

pub async fn login<S: SignIn>(
    state: &AppState,
    session: &mut S,
    kind: PrincipalKind,
    input: LoginInput,
) -> ActionResult {
    settle(attempt(state, session, kind, input).await)
}

async fn attempt<S: SignIn>(
    state: &AppState,
    session: &mut S,
    kind: PrincipalKind,
    input: LoginInput,
) -> Result<ActionResult, ActionError> {
    input.validate()?;

    let existing = principals(kind)
        .find_by_email(&state.db, &input.email)
        .await?
        .filter(|principal| principal.password.is_some())
        .ok_or(ActionError::NotFound("Email does not exist"))?;

    if existing.email_verified.is_none() {
        let token = tokens::issue_verification_token(&state.db, kind, &existing.email).await?;
        state
            .notifier
            .send_verification_email(&token.email, &token.token)
            .await?;
        debug!(email = %existing.email, "sign-in halted for email verification");
        return Ok(ActionResult::success("Confirmation email sent!"));
    }

    if existing.is_two_factor_enabled {
        match input.code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => confirm_code(state, &existing, code).await?,
            None => {
                let token = tokens::issue_two_factor_token(&state.db, kind, &existing.email).await?;
                state
                    .notifier
                    .send_two_factor_token_email(&token.email, &token.token)
                    .await?;
                debug!(email = %existing.email, "two-factor code sent");
                return Ok(ActionResult::two_factor());
            }
        }
    }

    let credentials = Credentials::Password(PasswordCredentials {
        kind,
        email: input.email,
        password: input.password,
    });
    match session.sign_in(credentials).await {
        Ok(_) => Ok(ActionResult::success("Successfully logged in!")),
        Err(SignInError::CredentialsSignin) => Err(ActionError::InvalidCredentials),
        Err(err) => Err(ActionError::Unexpected(err.into())),
    }
}

async fn confirm_code(
    state: &AppState,
    principal: &Principal,
    code: &str,
) -> Result<(), ActionError> {
    let token = tokens::find_two_factor_token(&state.db, principal.kind, &principal.email)
        .await?
        .filter(|token| token.token == code)
        .ok_or(ActionError::InvalidCode)?;

    if tokens::is_expired(token.expires, Utc::now().naive_utc()) {
        tokens::delete_two_factor_token(&state.db, token.id).await?;
        return Err(ActionError::Expired("Code has expired"));
    }

    tokens::delete_two_factor_token(&state.db, token.id).await?;
    tokens::confirm_two_factor(&state.db, principal.kind, principal.id).await?;
    Ok(())
}
