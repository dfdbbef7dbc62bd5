pub mod analytics;
pub mod dashboard;
pub mod enrollments;
pub mod events;
pub mod me;
pub mod profile;
pub mod settings;

use axum::http::StatusCode;
use sea_orm::DbErr;
use tracing::error;

/// Logs a query failure and maps it to 500.
pub(crate) fn internal(err: DbErr) -> StatusCode {
    error!(error = %err, "query failed");
    StatusCode::INTERNAL_SERVER_ERROR
}
