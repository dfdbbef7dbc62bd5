//! Single-use, time-limited tokens bound to one email of one principal kind.
//!
//! Issuing a token replaces any live token of the same type for that email.
//! Replacement is one `INSERT .. ON CONFLICT (principal_kind, email) DO UPDATE`
//! so concurrent issuers cannot leave two rows behind.

use chrono::{NaiveDateTime, TimeDelta, Utc};
use rand::Rng;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    TransactionTrait, sea_query::OnConflict,
};
use tracing::debug;
use uuid::Uuid;

use crate::entities::{
    password_reset_token, prelude::*, sea_orm_active_enums::PrincipalKind,
    two_factor_confirmation, two_factor_token, verification_token,
};

pub const VERIFICATION_TOKEN_TTL_SECS: i64 = 60 * 60;
pub const PASSWORD_RESET_TOKEN_TTL_SECS: i64 = 60 * 60;
pub const TWO_FACTOR_TOKEN_TTL_SECS: i64 = 5 * 60;

/// A token is still good at exactly its expiry instant.
pub fn is_expired(expires: NaiveDateTime, now: NaiveDateTime) -> bool {
    now > expires
}

fn expiry_from_now(ttl_secs: i64) -> NaiveDateTime {
    Utc::now().naive_utc() + TimeDelta::seconds(ttl_secs)
}

/// Six decimal digits, never with a leading zero.
pub fn generate_two_factor_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

pub async fn issue_verification_token(
    db: &DatabaseConnection,
    kind: PrincipalKind,
    email: &str,
) -> Result<verification_token::Model, DbErr> {
    let token = Uuid::new_v4().to_string();
    let model = verification_token::ActiveModel {
        id: Set(Uuid::new_v4()),
        principal_kind: Set(kind),
        email: Set(email.to_owned()),
        token: Set(token.clone()),
        expires: Set(expiry_from_now(VERIFICATION_TOKEN_TTL_SECS)),
    };
    VerificationToken::insert(model)
        .on_conflict(
            OnConflict::columns([
                verification_token::Column::PrincipalKind,
                verification_token::Column::Email,
            ])
            .update_columns([
                verification_token::Column::Token,
                verification_token::Column::Expires,
            ])
            .to_owned(),
        )
        .exec(db)
        .await?;
    debug!(?kind, email, "issued verification token");

    find_verification_token(db, &token)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound("verification token after upsert".into()))
}

pub async fn issue_password_reset_token(
    db: &DatabaseConnection,
    kind: PrincipalKind,
    email: &str,
) -> Result<password_reset_token::Model, DbErr> {
    let token = Uuid::new_v4().to_string();
    let model = password_reset_token::ActiveModel {
        id: Set(Uuid::new_v4()),
        principal_kind: Set(kind),
        email: Set(email.to_owned()),
        token: Set(token.clone()),
        expires: Set(expiry_from_now(PASSWORD_RESET_TOKEN_TTL_SECS)),
    };
    PasswordResetToken::insert(model)
        .on_conflict(
            OnConflict::columns([
                password_reset_token::Column::PrincipalKind,
                password_reset_token::Column::Email,
            ])
            .update_columns([
                password_reset_token::Column::Token,
                password_reset_token::Column::Expires,
            ])
            .to_owned(),
        )
        .exec(db)
        .await?;
    debug!(?kind, email, "issued password reset token");

    find_password_reset_token(db, &token)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound("password reset token after upsert".into()))
}

pub async fn issue_two_factor_token(
    db: &DatabaseConnection,
    kind: PrincipalKind,
    email: &str,
) -> Result<two_factor_token::Model, DbErr> {
    let model = two_factor_token::ActiveModel {
        id: Set(Uuid::new_v4()),
        principal_kind: Set(kind),
        email: Set(email.to_owned()),
        token: Set(generate_two_factor_code()),
        expires: Set(expiry_from_now(TWO_FACTOR_TOKEN_TTL_SECS)),
    };
    TwoFactorToken::insert(model)
        .on_conflict(
            OnConflict::columns([
                two_factor_token::Column::PrincipalKind,
                two_factor_token::Column::Email,
            ])
            .update_columns([
                two_factor_token::Column::Token,
                two_factor_token::Column::Expires,
            ])
            .to_owned(),
        )
        .exec(db)
        .await?;
    debug!(?kind, email, "issued two-factor code");

    find_two_factor_token(db, kind, email)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound("two-factor token after upsert".into()))
}

pub async fn find_verification_token(
    db: &DatabaseConnection,
    token: &str,
) -> Result<Option<verification_token::Model>, DbErr> {
    VerificationToken::find()
        .filter(verification_token::Column::Token.eq(token))
        .one(db)
        .await
}

pub async fn find_password_reset_token(
    db: &DatabaseConnection,
    token: &str,
) -> Result<Option<password_reset_token::Model>, DbErr> {
    PasswordResetToken::find()
        .filter(password_reset_token::Column::Token.eq(token))
        .one(db)
        .await
}

pub async fn find_two_factor_token(
    db: &DatabaseConnection,
    kind: PrincipalKind,
    email: &str,
) -> Result<Option<two_factor_token::Model>, DbErr> {
    TwoFactorToken::find()
        .filter(two_factor_token::Column::PrincipalKind.eq(kind))
        .filter(two_factor_token::Column::Email.eq(email))
        .one(db)
        .await
}

pub async fn delete_verification_token(db: &DatabaseConnection, id: Uuid) -> Result<(), DbErr> {
    VerificationToken::delete_by_id(id).exec(db).await?;
    Ok(())
}

pub async fn delete_password_reset_token(db: &DatabaseConnection, id: Uuid) -> Result<(), DbErr> {
    PasswordResetToken::delete_by_id(id).exec(db).await?;
    Ok(())
}

pub async fn delete_two_factor_token(db: &DatabaseConnection, id: Uuid) -> Result<(), DbErr> {
    TwoFactorToken::delete_by_id(id).exec(db).await?;
    Ok(())
}

/// Records a passed two-factor check, dropping any older confirmation for
/// the same principal first.
pub async fn confirm_two_factor(
    db: &DatabaseConnection,
    kind: PrincipalKind,
    principal_id: Uuid,
) -> Result<two_factor_confirmation::Model, DbErr> {
    let txn = db.begin().await?;

    TwoFactorConfirmation::delete_many()
        .filter(two_factor_confirmation::Column::PrincipalKind.eq(kind))
        .filter(two_factor_confirmation::Column::PrincipalId.eq(principal_id))
        .exec(&txn)
        .await?;

    let confirmation = two_factor_confirmation::ActiveModel {
        id: Set(Uuid::new_v4()),
        principal_kind: Set(kind),
        principal_id: Set(principal_id),
    };
    TwoFactorConfirmation::insert(confirmation).exec(&txn).await?;

    let confirmation = TwoFactorConfirmation::find()
        .filter(two_factor_confirmation::Column::PrincipalKind.eq(kind))
        .filter(two_factor_confirmation::Column::PrincipalId.eq(principal_id))
        .one(&txn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound("two-factor confirmation".into()))?;

    txn.commit().await?;
    debug!(?kind, %principal_id, "two-factor confirmed");
    Ok(confirmation)
}

/// Consumes the confirmation for a principal. Returns whether one existed.
pub async fn take_two_factor_confirmation(
    db: &DatabaseConnection,
    kind: PrincipalKind,
    principal_id: Uuid,
) -> Result<bool, DbErr> {
    let res = TwoFactorConfirmation::delete_many()
        .filter(two_factor_confirmation::Column::PrincipalKind.eq(kind))
        .filter(two_factor_confirmation::Column::PrincipalId.eq(principal_id))
        .exec(db)
        .await?;
    Ok(res.rows_affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_valid_at_exact_expiry() {
        let expires = Utc::now().naive_utc();
        assert!(!is_expired(expires, expires));
        assert!(is_expired(expires, expires + TimeDelta::milliseconds(1)));
        assert!(!is_expired(expires, expires - TimeDelta::seconds(30)));
    }

    #[test]
    fn two_factor_code_is_six_digits() {
        for _ in 0..200 {
            let code = generate_two_factor_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert_ne!(code.chars().next(), Some('0'));
        }
    }
}
