use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, ModelTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{ActionError, ActionResult, settle};
use crate::{
    auth::{principal::Principal, role_gate::allow},
    entities::{event, sea_orm_active_enums::Role},
    router::AppState,
};

/// Where an event happens. Stored as three flat columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Location {
    pub address: Option<String>,
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude out of range"))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitude out of range"))]
    pub lng: f64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(url(message = "Image must be a URL"))]
    pub image_url: Option<String>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub location: Option<Location>,
}

impl EventInput {
    fn check(&self) -> Result<(), ActionError> {
        self.validate()?;
        if let Some(location) = &self.location {
            location.validate()?;
        }
        Ok(())
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        NaiveDateTime::new(self.date, self.time)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub starts_at: NaiveDateTime,
    pub location: Option<Location>,
}

impl From<event::Model> for EventView {
    fn from(model: event::Model) -> Self {
        let location = unfold_location(model.address, model.latitude, model.longitude);
        EventView {
            id: model.id,
            organization_id: model.organization_id,
            name: model.name,
            description: model.description,
            image_url: model.image_url,
            starts_at: model.starts_at,
            location,
        }
    }
}

pub fn fold_location(location: Option<Location>) -> (Option<String>, Option<f64>, Option<f64>) {
    match location {
        Some(Location { address, lat, lng }) => (address, Some(lat), Some(lng)),
        None => (None, None, None),
    }
}

/// Rebuilds the nested location. Coordinates are required; an address on
/// its own is not a location.
pub fn unfold_location(
    address: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Option<Location> {
    match (latitude, longitude) {
        (Some(lat), Some(lng)) => Some(Location { address, lat, lng }),
        _ => None,
    }
}

pub async fn find_event(db: &DatabaseConnection, id: Uuid) -> Result<Option<EventView>, DbErr> {
    Ok(event::Entity::find_by_id(id).one(db).await?.map(EventView::from))
}

pub async fn list_upcoming(
    db: &DatabaseConnection,
    now: NaiveDateTime,
) -> Result<Vec<EventView>, DbErr> {
    let events = event::Entity::find()
        .filter(event::Column::StartsAt.gte(now))
        .order_by_asc(event::Column::StartsAt)
        .all(db)
        .await?;
    Ok(events.into_iter().map(EventView::from).collect())
}

pub async fn list_for_organization(
    db: &DatabaseConnection,
    organization_id: Uuid,
) -> Result<Vec<EventView>, DbErr> {
    let events = event::Entity::find()
        .filter(event::Column::OrganizationId.eq(organization_id))
        .order_by_asc(event::Column::StartsAt)
        .all(db)
        .await?;
    Ok(events.into_iter().map(EventView::from).collect())
}

/// The event if `organization` owns it.
pub(crate) async fn owned_event(
    db: &DatabaseConnection,
    organization: &Principal,
    id: Uuid,
) -> Result<event::Model, ActionError> {
    if !allow(organization.role, Role::Organization) {
        return Err(ActionError::Denied("Unauthorized"));
    }
    event::Entity::find_by_id(id)
        .one(db)
        .await?
        .filter(|event| event.organization_id == organization.id)
        .ok_or(ActionError::NotFound("Event not found"))
}

pub async fn create_event(
    state: &AppState,
    organization: &Principal,
    input: EventInput,
) -> ActionResult {
    settle(create(state, organization, input).await)
}

async fn create(
    state: &AppState,
    organization: &Principal,
    input: EventInput,
) -> Result<ActionResult, ActionError> {
    if !allow(organization.role, Role::Organization) {
        return Err(ActionError::Denied("Unauthorized"));
    }
    input.check()?;

    let starts_at = input.starts_at();
    let (address, latitude, longitude) = fold_location(input.location);
    event::ActiveModel {
        id: Set(Uuid::new_v4()),
        organization_id: Set(organization.id),
        name: Set(input.name),
        description: Set(input.description),
        image_url: Set(input.image_url),
        starts_at: Set(starts_at),
        address: Set(address),
        latitude: Set(latitude),
        longitude: Set(longitude),
    }
    .insert(&state.db)
    .await?;

    Ok(ActionResult::success("Event created!"))
}

pub async fn update_event(
    state: &AppState,
    organization: &Principal,
    id: Uuid,
    input: EventInput,
) -> ActionResult {
    settle(update(state, organization, id, input).await)
}

async fn update(
    state: &AppState,
    organization: &Principal,
    id: Uuid,
    input: EventInput,
) -> Result<ActionResult, ActionError> {
    input.check()?;
    let existing = owned_event(&state.db, organization, id).await?;

    let starts_at = input.starts_at();
    let (address, latitude, longitude) = fold_location(input.location);
    let mut model = existing.into_active_model();
    model.name = Set(input.name);
    model.description = Set(input.description);
    model.image_url = Set(input.image_url);
    model.starts_at = Set(starts_at);
    model.address = Set(address);
    model.latitude = Set(latitude);
    model.longitude = Set(longitude);
    model.update(&state.db).await?;

    Ok(ActionResult::success("Event updated!"))
}

pub async fn delete_event(state: &AppState, organization: &Principal, id: Uuid) -> ActionResult {
    settle(delete(state, organization, id).await)
}

async fn delete(
    state: &AppState,
    organization: &Principal,
    id: Uuid,
) -> Result<ActionResult, ActionError> {
    let existing = owned_event(&state.db, organization, id).await?;
    existing.delete(&state.db).await?;
    Ok(ActionResult::success("Event deleted!"))
}
