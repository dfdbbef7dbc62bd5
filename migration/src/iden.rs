use sea_orm_migration::prelude::*;

// Define table names
#[derive(DeriveIden)]
pub enum User {
    Table,
    Id,
    Name,
    Email,
    Password,
    EmailVerified,
    Image,
    Role,
    IsTwoFactorEnabled,
}

#[derive(DeriveIden)]
pub enum Organization {
    Table,
    Id,
    Name,
    Email,
    Password,
    EmailVerified,
    Image,
    Role,
    IsTwoFactorEnabled,
}

#[derive(DeriveIden)]
pub enum Account {
    Table,
    Id,
    UserId,
    Provider,
    ProviderAccountId,
}

#[derive(DeriveIden)]
pub enum VerificationToken {
    Table,
    Id,
    PrincipalKind,
    Email,
    Token,
    Expires,
}

#[derive(DeriveIden)]
pub enum PasswordResetToken {
    Table,
    Id,
    PrincipalKind,
    Email,
    Token,
    Expires,
}

#[derive(DeriveIden)]
pub enum TwoFactorToken {
    Table,
    Id,
    PrincipalKind,
    Email,
    Token,
    Expires,
}

#[derive(DeriveIden)]
pub enum TwoFactorConfirmation {
    Table,
    Id,
    PrincipalKind,
    PrincipalId,
}

#[derive(DeriveIden)]
pub enum Profile {
    Table,
    Id,
    UserId,
    FullName,
    Phone,
    Skills,
    Bio,
}

#[derive(DeriveIden)]
pub enum Event {
    Table,
    Id,
    OrganizationId,
    Name,
    Description,
    ImageUrl,
    StartsAt,
    Address,
    Latitude,
    Longitude,
}

#[derive(DeriveIden)]
pub enum Enrollment {
    Table,
    Id,
    UserId,
    EventId,
    Status,
    JobDetails,
}
