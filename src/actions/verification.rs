use chrono::Utc;

use super::{ActionError, ActionResult, settle};
use crate::{
    auth::{principal::principals, tokens},
    router::AppState,
};

/// Completes email verification from the link token. The token row names
/// the principal kind, so one endpoint serves users and organizations.
pub async fn new_verification(state: &AppState, token: &str) -> ActionResult {
    settle(verify(state, token).await)
}

async fn verify(state: &AppState, token: &str) -> Result<ActionResult, ActionError> {
    let existing = tokens::find_verification_token(&state.db, token)
        .await?
        .ok_or(ActionError::NotFound("Token does not exist"))?;

    if tokens::is_expired(existing.expires, Utc::now().naive_utc()) {
        tokens::delete_verification_token(&state.db, existing.id).await?;
        return Err(ActionError::Expired("Token has expired"));
    }

    let principals = principals(existing.principal_kind);
    let principal = principals
        .find_by_email(&state.db, &existing.email)
        .await?
        .ok_or(ActionError::NotFound("Email does not exist"))?;

    principals
        .mark_email_verified(&state.db, principal.id, &existing.email)
        .await?;
    tokens::delete_verification_token(&state.db, existing.id).await?;

    Ok(ActionResult::success("Email verified!"))
}
