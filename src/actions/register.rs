use serde::Deserialize;
use validator::Validate;

use super::{ActionError, ActionResult, settle};
use crate::{
    auth::{
        password::hash_password,
        principal::{NewPrincipal, principals},
        tokens,
    },
    entities::sea_orm_active_enums::PrincipalKind,
    router::AppState,
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(email(message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Minimum 6 characters required"))]
    pub password: String,
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
}

pub async fn register(state: &AppState, kind: PrincipalKind, input: RegisterInput) -> ActionResult {
    settle(create_account(state, kind, input).await)
}

async fn create_account(
    state: &AppState,
    kind: PrincipalKind,
    input: RegisterInput,
) -> Result<ActionResult, ActionError> {
    input.validate()?;

    let principals = principals(kind);
    if principals
        .find_by_email(&state.db, &input.email)
        .await?
        .is_some()
    {
        return Err(ActionError::Denied("Email already in use"));
    }

    let hash = hash_password(&input.password)?;
    let principal = principals
        .create(
            &state.db,
            NewPrincipal {
                name: Some(input.name),
                email: input.email,
                password: Some(hash),
                ..Default::default()
            },
        )
        .await?;

    let token = tokens::issue_verification_token(&state.db, kind, &principal.email).await?;
    state
        .notifier
        .send_verification_email(&token.email, &token.token)
        .await?;

    Ok(ActionResult::success("Confirmation email sent!"))
}
