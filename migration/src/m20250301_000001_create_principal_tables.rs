use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create User Table
        let table = table_auto(User::Table)
            .col(pk_uuid(User::Id))
            .col(string_null(User::Name))
            .col(string_uniq(User::Email))
            .col(string_null(User::Password))
            .col(timestamp_null(User::EmailVerified))
            .col(string_null(User::Image))
            .col(string_len(User::Role, 16))
            .col(boolean(User::IsTwoFactorEnabled).default(false))
            .to_owned();
        manager.create_table(table).await?;

        // Create Organization Table
        let table = table_auto(Organization::Table)
            .col(pk_uuid(Organization::Id))
            .col(string_null(Organization::Name))
            .col(string_uniq(Organization::Email))
            .col(string_null(Organization::Password))
            .col(timestamp_null(Organization::EmailVerified))
            .col(string_null(Organization::Image))
            .col(string_len(Organization::Role, 16))
            .col(boolean(Organization::IsTwoFactorEnabled).default(false))
            .to_owned();
        manager.create_table(table).await?;

        // Create Account Table (OAuth identities linked to users)
        let table = table_auto(Account::Table)
            .col(pk_uuid(Account::Id))
            .col(uuid(Account::UserId))
            .col(string(Account::Provider))
            .col(string(Account::ProviderAccountId))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_account_user")
                    .from(Account::Table, Account::UserId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_account_provider_identity")
                    .table(Account::Table)
                    .col(Account::Provider)
                    .col(Account::ProviderAccountId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Account::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Organization::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;

        Ok(())
    }
}
