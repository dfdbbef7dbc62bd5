use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use super::internal;
use crate::{
    actions::enrollments::{
        EnrollInput, StatusInput, enroll as enroll_user, list_for_event, list_for_user,
        set_enrollment_status,
    },
    auth::{backend::AuthSession, role_gate::require_role},
    entities::sea_orm_active_enums::Role,
    router::AppState,
};

pub async fn enroll(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(event_id): Path<Uuid>,
    Json(input): Json<EnrollInput>,
) -> Result<impl IntoResponse, StatusCode> {
    let user = require_role(&auth_session, Role::User)?;
    Ok(enroll_user(&state, &user, event_id, input).await)
}

pub async fn my_enrollments(
    State(state): State<AppState>,
    auth_session: AuthSession,
) -> Result<impl IntoResponse, StatusCode> {
    let user = require_role(&auth_session, Role::User)?;
    let enrollments = list_for_user(&state.db, user.id).await.map_err(internal)?;
    Ok(Json(enrollments))
}

pub async fn event_enrollments(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let organization = require_role(&auth_session, Role::Organization)?;
    let applicants = list_for_event(&state.db, &organization, event_id)
        .await
        .map_err(internal)?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(applicants))
}

pub async fn set_status(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
    Json(input): Json<StatusInput>,
) -> Result<impl IntoResponse, StatusCode> {
    let organization = require_role(&auth_session, Role::Organization)?;
    Ok(set_enrollment_status(&state, &organization, id, input).await)
}
