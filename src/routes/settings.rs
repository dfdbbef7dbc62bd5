use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    actions::settings::{SettingsInput, settings as update_settings},
    auth::{backend::AuthSession, role_gate::current},
    router::AppState,
};

pub async fn settings(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Json(input): Json<SettingsInput>,
) -> Result<impl IntoResponse, StatusCode> {
    let principal = current(&auth_session)?;
    Ok(update_settings(&state, &principal, input).await)
}
