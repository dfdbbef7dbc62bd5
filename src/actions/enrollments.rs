use chrono::NaiveDateTime;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{
    ActionError, ActionResult,
    events::{EventView, owned_event},
    profile::find_profile,
    settle,
};
use crate::{
    auth::{principal::Principal, role_gate::allow},
    entities::{
        enrollment, event, profile,
        sea_orm_active_enums::{EnrollmentStatus, Role},
        user,
    },
    router::AppState,
};

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EnrollInput {
    #[validate(length(max = 2000))]
    pub job_details: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusInput {
    pub status: EnrollmentStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentView {
    pub id: Uuid,
    pub status: EnrollmentStatus,
    pub job_details: Option<String>,
    pub created_at: NaiveDateTime,
    pub event: Option<EventView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantView {
    pub id: Uuid,
    pub status: EnrollmentStatus,
    pub job_details: Option<String>,
    pub email: Option<String>,
    pub profile: Option<profile::Model>,
}

/// Applies `user` to an event. A second call for the same event updates the
/// existing enrollment instead of adding a row.
pub async fn enroll(
    state: &AppState,
    user: &Principal,
    event_id: Uuid,
    input: EnrollInput,
) -> ActionResult {
    settle(upsert(state, user, event_id, input).await)
}

async fn upsert(
    state: &AppState,
    user: &Principal,
    event_id: Uuid,
    input: EnrollInput,
) -> Result<ActionResult, ActionError> {
    if !allow(user.role, Role::User) {
        return Err(ActionError::Denied("Unauthorized"));
    }
    input.validate()?;

    if event::Entity::find_by_id(event_id)
        .one(&state.db)
        .await?
        .is_none()
    {
        return Err(ActionError::NotFound("Event not found"));
    }
    if find_profile(&state.db, user.id).await?.is_none() {
        return Err(ActionError::Denied("Complete your profile first"));
    }

    let txn = state.db.begin().await?;

    let existing = enrollment::Entity::find()
        .filter(enrollment::Column::UserId.eq(user.id))
        .filter(enrollment::Column::EventId.eq(event_id))
        .one(&txn)
        .await?;

    let message = match existing {
        Some(existing) => {
            let mut model = existing.into_active_model();
            model.job_details = Set(input.job_details);
            model.update(&txn).await?;
            "Enrollment updated!"
        }
        None => {
            enrollment::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.id),
                event_id: Set(event_id),
                status: Set(EnrollmentStatus::Pending),
                job_details: Set(input.job_details),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            "Enrollment submitted!"
        }
    };

    txn.commit().await?;
    Ok(ActionResult::success(message))
}

/// Approves or rejects an enrollment on one of the organization's events.
pub async fn set_enrollment_status(
    state: &AppState,
    organization: &Principal,
    enrollment_id: Uuid,
    input: StatusInput,
) -> ActionResult {
    settle(decide(state, organization, enrollment_id, input).await)
}

async fn decide(
    state: &AppState,
    organization: &Principal,
    enrollment_id: Uuid,
    input: StatusInput,
) -> Result<ActionResult, ActionError> {
    let existing = enrollment::Entity::find_by_id(enrollment_id)
        .one(&state.db)
        .await?
        .ok_or(ActionError::NotFound("Enrollment not found"))?;

    // Someone else's event reads as a missing enrollment.
    owned_event(&state.db, organization, existing.event_id)
        .await
        .map_err(|err| match err {
            ActionError::NotFound(_) => ActionError::NotFound("Enrollment not found"),
            other => other,
        })?;

    let mut model = existing.into_active_model();
    model.status = Set(input.status);
    model.update(&state.db).await?;

    Ok(ActionResult::success(format!(
        "Enrollment {}!",
        input.status.label()
    )))
}

pub async fn list_for_user(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Vec<EnrollmentView>, DbErr> {
    let rows = enrollment::Entity::find()
        .filter(enrollment::Column::UserId.eq(user_id))
        .order_by_desc(enrollment::Column::CreatedAt)
        .find_also_related(event::Entity)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(enrollment, event)| EnrollmentView {
            id: enrollment.id,
            status: enrollment.status,
            job_details: enrollment.job_details,
            created_at: enrollment.created_at,
            event: event.map(EventView::from),
        })
        .collect())
}

/// Applicants for an event, or `None` if the organization does not own it.
pub async fn list_for_event(
    db: &DatabaseConnection,
    organization: &Principal,
    event_id: Uuid,
) -> Result<Option<Vec<ApplicantView>>, DbErr> {
    match owned_event(db, organization, event_id).await {
        Ok(_) => {}
        Err(ActionError::Database(err)) => return Err(err),
        Err(_) => return Ok(None),
    }

    let rows = enrollment::Entity::find()
        .filter(enrollment::Column::EventId.eq(event_id))
        .order_by_asc(enrollment::Column::CreatedAt)
        .find_also_related(user::Entity)
        .all(db)
        .await?;

    let user_ids: Vec<Uuid> = rows.iter().map(|(enrollment, _)| enrollment.user_id).collect();
    let profiles = profile::Entity::find()
        .filter(profile::Column::UserId.is_in(user_ids))
        .all(db)
        .await?;

    Ok(Some(
        rows.into_iter()
            .map(|(enrollment, user)| ApplicantView {
                id: enrollment.id,
                status: enrollment.status,
                job_details: enrollment.job_details,
                email: user.map(|u| u.email),
                profile: profiles
                    .iter()
                    .find(|p| p.user_id == enrollment.user_id)
                    .cloned(),
            })
            .collect(),
    ))
}
