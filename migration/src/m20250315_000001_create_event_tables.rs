use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create Profile Table
        let table = table_auto(Profile::Table)
            .col(pk_uuid(Profile::Id))
            .col(uuid_uniq(Profile::UserId))
            .col(string(Profile::FullName))
            .col(string_null(Profile::Phone))
            .col(string_null(Profile::Skills))
            .col(text_null(Profile::Bio))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_profile_user")
                    .from(Profile::Table, Profile::UserId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Create Event Table. Location is stored flat and rebuilt on read.
        let table = table_auto(Event::Table)
            .col(pk_uuid(Event::Id))
            .col(uuid(Event::OrganizationId))
            .col(string(Event::Name))
            .col(text_null(Event::Description))
            .col(string_null(Event::ImageUrl))
            .col(timestamp(Event::StartsAt))
            .col(string_null(Event::Address))
            .col(double_null(Event::Latitude))
            .col(double_null(Event::Longitude))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_event_organization")
                    .from(Event::Table, Event::OrganizationId)
                    .to(Organization::Table, Organization::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Create Enrollment Table. One row per (user, event) is kept by the
        // enrollment action, not by a constraint.
        let table = table_auto(Enrollment::Table)
            .col(pk_uuid(Enrollment::Id))
            .col(uuid(Enrollment::UserId))
            .col(uuid(Enrollment::EventId))
            .col(string_len(Enrollment::Status, 16))
            .col(text_null(Enrollment::JobDetails))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_enrollment_user")
                    .from(Enrollment::Table, Enrollment::UserId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_enrollment_event")
                    .from(Enrollment::Table, Enrollment::EventId)
                    .to(Event::Table, Event::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Enrollment::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Event::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Profile::Table).to_owned())
            .await?;

        Ok(())
    }
}
