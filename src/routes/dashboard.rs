use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;

use super::internal;
use crate::{
    actions::{
        enrollments::{EnrollmentView, list_for_user},
        events::{EventView, list_for_organization, list_upcoming},
        profile::find_profile,
    },
    auth::{backend::AuthSession, principal::Principal, role_gate::current},
    entities::{
        enrollment, event, organization, profile,
        sea_orm_active_enums::{EnrollmentStatus, Role},
        user,
    },
    router::AppState,
};

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Dashboard {
    #[serde(rename_all = "camelCase")]
    User {
        profile: Option<profile::Model>,
        enrollments: Vec<EnrollmentView>,
        upcoming_events: Vec<EventView>,
    },
    #[serde(rename_all = "camelCase")]
    Organization {
        events: Vec<EventView>,
        pending_enrollments: u64,
    },
    #[serde(rename_all = "camelCase")]
    Admin {
        users: u64,
        organizations: u64,
        events: u64,
        enrollments: u64,
    },
}

pub async fn dashboard(
    State(state): State<AppState>,
    auth_session: AuthSession,
) -> Result<impl IntoResponse, StatusCode> {
    let principal = current(&auth_session)?;
    let view = match principal.role {
        Role::User => user_dashboard(&state, &principal).await,
        Role::Organization => organization_dashboard(&state, &principal).await,
        Role::Admin => admin_dashboard(&state).await,
    }
    .map_err(internal)?;
    Ok(Json(view))
}

async fn user_dashboard(state: &AppState, user: &Principal) -> Result<Dashboard, sea_orm::DbErr> {
    Ok(Dashboard::User {
        profile: find_profile(&state.db, user.id).await?,
        enrollments: list_for_user(&state.db, user.id).await?,
        upcoming_events: list_upcoming(&state.db, Utc::now().naive_utc()).await?,
    })
}

async fn organization_dashboard(
    state: &AppState,
    organization: &Principal,
) -> Result<Dashboard, sea_orm::DbErr> {
    let events = list_for_organization(&state.db, organization.id).await?;
    let event_ids: Vec<_> = events.iter().map(|e| e.id).collect();
    let pending_enrollments = enrollment::Entity::find()
        .filter(enrollment::Column::EventId.is_in(event_ids))
        .filter(enrollment::Column::Status.eq(EnrollmentStatus::Pending))
        .count(&state.db)
        .await?;

    Ok(Dashboard::Organization {
        events,
        pending_enrollments,
    })
}

async fn admin_dashboard(state: &AppState) -> Result<Dashboard, sea_orm::DbErr> {
    Ok(Dashboard::Admin {
        users: user::Entity::find().count(&state.db).await?,
        organizations: organization::Entity::find().count(&state.db).await?,
        events: event::Entity::find().count(&state.db).await?,
        enrollments: enrollment::Entity::find().count(&state.db).await?,
    })
}
