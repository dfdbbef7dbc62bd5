pub mod prelude;

pub mod account;
pub mod enrollment;
pub mod event;
pub mod organization;
pub mod password_reset_token;
pub mod profile;
pub mod sea_orm_active_enums;
pub mod two_factor_confirmation;
pub mod two_factor_token;
pub mod user;
pub mod verification_token;
