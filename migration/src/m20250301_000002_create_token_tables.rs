use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Tokens are keyed by (principal_kind, email). The unique index is the
        // conflict target that makes issuance a single upsert.
        let table = table_auto(VerificationToken::Table)
            .col(pk_uuid(VerificationToken::Id))
            .col(string_len(VerificationToken::PrincipalKind, 16))
            .col(string(VerificationToken::Email))
            .col(string_uniq(VerificationToken::Token))
            .col(timestamp(VerificationToken::Expires))
            .to_owned();
        manager.create_table(table).await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_verification_token_kind_email")
                    .table(VerificationToken::Table)
                    .col(VerificationToken::PrincipalKind)
                    .col(VerificationToken::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        let table = table_auto(PasswordResetToken::Table)
            .col(pk_uuid(PasswordResetToken::Id))
            .col(string_len(PasswordResetToken::PrincipalKind, 16))
            .col(string(PasswordResetToken::Email))
            .col(string_uniq(PasswordResetToken::Token))
            .col(timestamp(PasswordResetToken::Expires))
            .to_owned();
        manager.create_table(table).await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_password_reset_token_kind_email")
                    .table(PasswordResetToken::Table)
                    .col(PasswordResetToken::PrincipalKind)
                    .col(PasswordResetToken::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Two-factor codes come from a small space, so only (kind, email) is unique.
        let table = table_auto(TwoFactorToken::Table)
            .col(pk_uuid(TwoFactorToken::Id))
            .col(string_len(TwoFactorToken::PrincipalKind, 16))
            .col(string(TwoFactorToken::Email))
            .col(string(TwoFactorToken::Token))
            .col(timestamp(TwoFactorToken::Expires))
            .to_owned();
        manager.create_table(table).await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_two_factor_token_kind_email")
                    .table(TwoFactorToken::Table)
                    .col(TwoFactorToken::PrincipalKind)
                    .col(TwoFactorToken::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        let table = table_auto(TwoFactorConfirmation::Table)
            .col(pk_uuid(TwoFactorConfirmation::Id))
            .col(string_len(TwoFactorConfirmation::PrincipalKind, 16))
            .col(uuid(TwoFactorConfirmation::PrincipalId))
            .to_owned();
        manager.create_table(table).await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_two_factor_confirmation_principal")
                    .table(TwoFactorConfirmation::Table)
                    .col(TwoFactorConfirmation::PrincipalKind)
                    .col(TwoFactorConfirmation::PrincipalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TwoFactorConfirmation::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TwoFactorToken::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PasswordResetToken::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(VerificationToken::Table).to_owned())
            .await?;

        Ok(())
    }
}
