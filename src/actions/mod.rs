//! Server actions. Every action answers with a tagged [`ActionResult`] that
//! the caller branches on; failures never escape as errors.

pub mod enrollments;
pub mod events;
pub mod login;
pub mod profile;
pub mod register;
pub mod reset;
pub mod settings;
pub mod verification;

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use tracing::error;
use validator::ValidationErrors;

use crate::mail::MailError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionResult {
    Success {
        success: String,
    },
    TwoFactor {
        #[serde(rename = "twoFactor")]
        two_factor: bool,
    },
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },
}

impl ActionResult {
    pub fn success(message: impl Into<String>) -> Self {
        ActionResult::Success {
            success: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ActionResult::Error {
            error: message.into(),
            details: None,
        }
    }

    pub fn two_factor() -> Self {
        ActionResult::TwoFactor { two_factor: true }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ActionResult::Success { .. })
    }
}

impl IntoResponse for ActionResult {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Expired(&'static str),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid code")]
    InvalidCode,

    /// The request is well-formed but not allowed in the current state.
    #[error("{0}")]
    Denied(&'static str),

    #[error("Invalid fields")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Database(#[from] DbErr),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<ActionError> for ActionResult {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::Validation(errors) => ActionResult::Error {
                error: "Invalid fields".to_string(),
                details: serde_json::to_value(&errors).ok(),
            },
            ActionError::Database(_) | ActionError::Mail(_) | ActionError::Unexpected(_) => {
                error!(error = %err, "action failed");
                ActionResult::error("Something went wrong")
            }
            other => ActionResult::error(other.to_string()),
        }
    }
}

/// Settles an action body into the tagged result.
pub(crate) fn settle(result: Result<ActionResult, ActionError>) -> ActionResult {
    result.unwrap_or_else(ActionResult::from)
}
