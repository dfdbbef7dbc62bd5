use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use super::internal;
use crate::{
    actions::events::{
        EventInput, create_event, delete_event, find_event, list_for_organization,
        list_upcoming, update_event,
    },
    auth::{
        backend::AuthSession,
        role_gate::{allow, current, require_role},
    },
    entities::sea_orm_active_enums::Role,
    router::AppState,
};

/// Organizations see their own events; everyone else sees what is upcoming.
pub async fn index(
    State(state): State<AppState>,
    auth_session: AuthSession,
) -> Result<impl IntoResponse, StatusCode> {
    let principal = current(&auth_session)?;
    let events = if allow(principal.role, Role::Organization) {
        list_for_organization(&state.db, principal.id).await
    } else {
        list_upcoming(&state.db, Utc::now().naive_utc()).await
    }
    .map_err(internal)?;
    Ok(Json(events))
}

pub async fn show(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    current(&auth_session)?;
    let event = find_event(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(event))
}

pub async fn create(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Json(input): Json<EventInput>,
) -> Result<impl IntoResponse, StatusCode> {
    let organization = require_role(&auth_session, Role::Organization)?;
    Ok(create_event(&state, &organization, input).await)
}

pub async fn update(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
    Json(input): Json<EventInput>,
) -> Result<impl IntoResponse, StatusCode> {
    let organization = require_role(&auth_session, Role::Organization)?;
    Ok(update_event(&state, &organization, id, input).await)
}

pub async fn delete(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let organization = require_role(&auth_session, Role::Organization)?;
    Ok(delete_event(&state, &organization, id).await)
}
