use serde::Deserialize;
use validator::Validate;

use super::{ActionError, ActionResult, settle};
use crate::{
    auth::{
        password::{hash_password, verify_password},
        principal::{Principal, SettingsUpdate, principals},
    },
    router::AppState,
};

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SettingsInput {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: Option<String>,
    pub is_two_factor_enabled: Option<bool>,
    pub password: Option<String>,
    #[validate(length(min = 6, message = "Minimum 6 characters required"))]
    pub new_password: Option<String>,
}

pub async fn settings(
    state: &AppState,
    principal: &Principal,
    input: SettingsInput,
) -> ActionResult {
    settle(apply(state, principal, input).await)
}

async fn apply(
    state: &AppState,
    principal: &Principal,
    input: SettingsInput,
) -> Result<ActionResult, ActionError> {
    input.validate()?;

    let principals = principals(principal.kind);
    let current = principals
        .find_by_id(&state.db, principal.id)
        .await?
        .ok_or(ActionError::NotFound("Unauthorized"))?;

    let mut update = SettingsUpdate {
        name: input.name,
        ..Default::default()
    };

    // OAuth principals have no password, so neither password changes nor
    // two-factor apply to them.
    if let Some(hash) = current.password.as_deref() {
        update.is_two_factor_enabled = input.is_two_factor_enabled;

        match (input.password, input.new_password) {
            (Some(password), Some(new_password)) => {
                if verify_password(&password, hash).is_err() {
                    return Err(ActionError::Denied("Incorrect password"));
                }
                update.password = Some(hash_password(&new_password)?);
            }
            (None, None) => {}
            _ => {
                return Err(ActionError::Denied(
                    "Both current and new password are required",
                ));
            }
        }
    }

    principals
        .update_settings(&state.db, current.id, update)
        .await?;

    Ok(ActionResult::success("Settings updated!"))
}
