use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{ActionError, ActionResult, settle};
use crate::{
    auth::{principal::Principal, role_gate::allow},
    entities::{profile, sea_orm_active_enums::Role},
    router::AppState,
};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInput {
    #[validate(length(min = 1, max = 120, message = "Full name is required"))]
    pub full_name: String,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub skills: Option<String>,
    #[validate(length(max = 2000))]
    pub bio: Option<String>,
}

pub async fn find_profile(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Option<profile::Model>, DbErr> {
    profile::Entity::find()
        .filter(profile::Column::UserId.eq(user_id))
        .one(db)
        .await
}

pub async fn save_profile(state: &AppState, user: &Principal, input: ProfileInput) -> ActionResult {
    settle(save(state, user, input).await)
}

async fn save(
    state: &AppState,
    user: &Principal,
    input: ProfileInput,
) -> Result<ActionResult, ActionError> {
    if !allow(user.role, Role::User) {
        return Err(ActionError::Denied("Unauthorized"));
    }
    input.validate()?;

    match find_profile(&state.db, user.id).await? {
        Some(existing) => {
            let mut model = existing.into_active_model();
            model.full_name = Set(input.full_name);
            model.phone = Set(input.phone);
            model.skills = Set(input.skills);
            model.bio = Set(input.bio);
            model.update(&state.db).await?;
        }
        None => {
            profile::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.id),
                full_name: Set(input.full_name),
                phone: Set(input.phone),
                skills: Set(input.skills),
                bio: Set(input.bio),
            }
            .insert(&state.db)
            .await?;
        }
    }

    Ok(ActionResult::success("Profile saved!"))
}
