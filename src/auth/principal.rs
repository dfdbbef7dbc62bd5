//! Users and organizations sign in through the same flows. Everything the
//! flows need from a principal table sits behind [`Principals`], with one
//! implementation per [`PrincipalKind`].

use std::fmt;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sea_orm::{ActiveValue::*, prelude::*};
use serde::{Deserialize, Serialize};

use crate::entities::{
    organization,
    sea_orm_active_enums::{PrincipalKind, Role},
    user,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrincipalId {
    pub kind: PrincipalKind,
    pub id: Uuid,
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.kind, self.id)
    }
}

/// Snapshot of a user or organization row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub kind: PrincipalKind,
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub email_verified: Option<NaiveDateTime>,
    pub image: Option<String>,
    pub role: Role,
    pub is_two_factor_enabled: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NewPrincipal {
    pub name: Option<String>,
    pub email: String,
    pub password: Option<String>,
    pub email_verified: Option<NaiveDateTime>,
    pub image: Option<String>,
}

/// Columns a settings change may touch. `None` leaves the column alone.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub name: Option<String>,
    pub is_two_factor_enabled: Option<bool>,
    pub password: Option<String>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.is_two_factor_enabled.is_none() && self.password.is_none()
    }
}

#[async_trait]
pub trait Principals: Send + Sync {
    fn kind(&self) -> PrincipalKind;

    async fn find_by_email(
        &self,
        db: &DatabaseConnection,
        email: &str,
    ) -> Result<Option<Principal>, DbErr>;

    async fn find_by_id(&self, db: &DatabaseConnection, id: Uuid)
    -> Result<Option<Principal>, DbErr>;

    async fn create(&self, db: &DatabaseConnection, new: NewPrincipal) -> Result<Principal, DbErr>;

    /// Stamps `email_verified` and rewrites the email the token was issued to.
    async fn mark_email_verified(
        &self,
        db: &DatabaseConnection,
        id: Uuid,
        email: &str,
    ) -> Result<(), DbErr>;

    async fn update_settings(
        &self,
        db: &DatabaseConnection,
        id: Uuid,
        update: SettingsUpdate,
    ) -> Result<(), DbErr>;
}

pub struct Users;

pub struct Organizations;

pub fn principals(kind: PrincipalKind) -> &'static dyn Principals {
    match kind {
        PrincipalKind::User => &Users,
        PrincipalKind::Organization => &Organizations,
    }
}

// Both tables share column names, so one body serves each entity module.
macro_rules! principal_table {
    ($strategy:ident, $entity:ident, $kind:expr) => {
        impl From<$entity::Model> for Principal {
            fn from(model: $entity::Model) -> Self {
                Principal {
                    kind: $kind,
                    id: model.id,
                    name: model.name,
                    email: model.email,
                    password: model.password,
                    email_verified: model.email_verified,
                    image: model.image,
                    role: model.role,
                    is_two_factor_enabled: model.is_two_factor_enabled,
                }
            }
        }

        #[async_trait]
        impl Principals for $strategy {
            fn kind(&self) -> PrincipalKind {
                $kind
            }

            async fn find_by_email(
                &self,
                db: &DatabaseConnection,
                email: &str,
            ) -> Result<Option<Principal>, DbErr> {
                let model = $entity::Entity::find()
                    .filter($entity::Column::Email.eq(email))
                    .one(db)
                    .await?;
                Ok(model.map(Principal::from))
            }

            async fn find_by_id(
                &self,
                db: &DatabaseConnection,
                id: Uuid,
            ) -> Result<Option<Principal>, DbErr> {
                let model = $entity::Entity::find_by_id(id).one(db).await?;
                Ok(model.map(Principal::from))
            }

            async fn create(
                &self,
                db: &DatabaseConnection,
                new: NewPrincipal,
            ) -> Result<Principal, DbErr> {
                let model = $entity::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    name: Set(new.name),
                    email: Set(new.email),
                    password: Set(new.password),
                    email_verified: Set(new.email_verified),
                    image: Set(new.image),
                    role: Set($kind.default_role()),
                    is_two_factor_enabled: Set(false),
                    ..Default::default()
                };
                Ok(model.insert(db).await?.into())
            }

            async fn mark_email_verified(
                &self,
                db: &DatabaseConnection,
                id: Uuid,
                email: &str,
            ) -> Result<(), DbErr> {
                let model = $entity::ActiveModel {
                    id: Unchanged(id),
                    email_verified: Set(Some(Utc::now().naive_utc())),
                    email: Set(email.to_owned()),
                    ..Default::default()
                };
                model.update(db).await?;
                Ok(())
            }

            async fn update_settings(
                &self,
                db: &DatabaseConnection,
                id: Uuid,
                update: SettingsUpdate,
            ) -> Result<(), DbErr> {
                if update.is_empty() {
                    return Ok(());
                }
                let mut model = $entity::ActiveModel {
                    id: Unchanged(id),
                    ..Default::default()
                };
                if let Some(name) = update.name {
                    model.name = Set(Some(name));
                }
                if let Some(enabled) = update.is_two_factor_enabled {
                    model.is_two_factor_enabled = Set(enabled);
                }
                if let Some(hash) = update.password {
                    model.password = Set(Some(hash));
                }
                model.update(db).await?;
                Ok(())
            }
        }
    };
}

principal_table!(Users, user, PrincipalKind::User);
principal_table!(Organizations, organization, PrincipalKind::Organization);
