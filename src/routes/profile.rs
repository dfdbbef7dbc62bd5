use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use super::internal;
use crate::{
    actions::profile::{ProfileInput, find_profile, save_profile},
    auth::{backend::AuthSession, role_gate::require_role},
    entities::sea_orm_active_enums::Role,
    router::AppState,
};

pub async fn get_profile(
    State(state): State<AppState>,
    auth_session: AuthSession,
) -> Result<impl IntoResponse, StatusCode> {
    let user = require_role(&auth_session, Role::User)?;
    let profile = find_profile(&state.db, user.id).await.map_err(internal)?;
    Ok(Json(profile))
}

pub async fn put_profile(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Json(input): Json<ProfileInput>,
) -> Result<impl IntoResponse, StatusCode> {
    let user = require_role(&auth_session, Role::User)?;
    Ok(save_profile(&state, &user, input).await)
}
