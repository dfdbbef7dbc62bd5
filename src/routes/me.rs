use axum::{Json, http::StatusCode, response::IntoResponse};

use crate::auth::{backend::AuthSession, role_gate::current};

pub async fn me(auth_session: AuthSession) -> Result<impl IntoResponse, StatusCode> {
    let principal = current(&auth_session)?;
    Ok(Json(principal))
}
