use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

use super::{ActionError, ActionResult, settle};
use crate::{
    auth::{
        password::hash_password,
        principal::{SettingsUpdate, principals},
        tokens,
    },
    entities::sea_orm_active_enums::PrincipalKind,
    router::AppState,
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetInput {
    #[validate(email(message = "Email is required"))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewPasswordInput {
    pub token: String,
    #[validate(length(min = 6, message = "Minimum 6 characters required"))]
    pub password: String,
}

/// Mails a password reset link.
pub async fn reset(state: &AppState, kind: PrincipalKind, input: ResetInput) -> ActionResult {
    settle(send_reset(state, kind, input).await)
}

async fn send_reset(
    state: &AppState,
    kind: PrincipalKind,
    input: ResetInput,
) -> Result<ActionResult, ActionError> {
    input.validate()?;

    let principal = principals(kind)
        .find_by_email(&state.db, &input.email)
        .await?
        .ok_or(ActionError::NotFound("Email not found"))?;

    let token = tokens::issue_password_reset_token(&state.db, kind, &principal.email).await?;
    state
        .notifier
        .send_password_reset_email(&token.email, &token.token)
        .await?;

    Ok(ActionResult::success("Reset email sent!"))
}

/// Reports whether a reset token can still be used. Nothing is consumed.
pub async fn check_reset_token(state: &AppState, token: &str) -> ActionResult {
    settle(usable_reset_token(state, token).await)
}

async fn usable_reset_token(state: &AppState, token: &str) -> Result<ActionResult, ActionError> {
    let existing = tokens::find_password_reset_token(&state.db, token)
        .await?
        .ok_or(ActionError::NotFound("Token does not exist"))?;

    if tokens::is_expired(existing.expires, Utc::now().naive_utc()) {
        return Err(ActionError::Expired("Token has expired"));
    }

    Ok(ActionResult::success("Token is valid"))
}

/// Stores a new password against a reset token.
pub async fn new_password(state: &AppState, input: NewPasswordInput) -> ActionResult {
    settle(change_password(state, input).await)
}

async fn change_password(
    state: &AppState,
    input: NewPasswordInput,
) -> Result<ActionResult, ActionError> {
    input.validate()?;

    let existing = tokens::find_password_reset_token(&state.db, &input.token)
        .await?
        .ok_or(ActionError::NotFound("Token does not exist"))?;

    if tokens::is_expired(existing.expires, Utc::now().naive_utc()) {
        tokens::delete_password_reset_token(&state.db, existing.id).await?;
        return Err(ActionError::Expired("Token has expired"));
    }

    let principals = principals(existing.principal_kind);
    let principal = principals
        .find_by_email(&state.db, &existing.email)
        .await?
        .ok_or(ActionError::NotFound("Email does not exist"))?;

    let hash = hash_password(&input.password)?;
    principals
        .update_settings(
            &state.db,
            principal.id,
            SettingsUpdate {
                password: Some(hash),
                ..Default::default()
            },
        )
        .await?;
    tokens::delete_password_reset_token(&state.db, existing.id).await?;

    Ok(ActionResult::success("Password updated!"))
}
