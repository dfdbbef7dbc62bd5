pub use super::account::Entity as Account;
pub use super::enrollment::Entity as Enrollment;
pub use super::event::Entity as Event;
pub use super::organization::Entity as Organization;
pub use super::password_reset_token::Entity as PasswordResetToken;
pub use super::profile::Entity as Profile;
pub use super::two_factor_confirmation::Entity as TwoFactorConfirmation;
pub use super::two_factor_token::Entity as TwoFactorToken;
pub use super::user::Entity as User;
pub use super::verification_token::Entity as VerificationToken;
