use axum::http::StatusCode;

use super::{backend::AuthSession, principal::Principal};
use crate::entities::sea_orm_active_enums::Role;

/// Exact role match. There is no hierarchy: an admin does not pass a USER gate.
pub fn allow(actual: Role, required: Role) -> bool {
    actual == required
}

/// The signed-in principal, or 401.
pub fn current(auth_session: &AuthSession) -> Result<Principal, StatusCode> {
    auth_session.user.clone().ok_or(StatusCode::UNAUTHORIZED)
}

/// The signed-in principal if its role passes the gate. 401 when signed
/// out, 403 when the role does not match.
pub fn require_role(auth_session: &AuthSession, required: Role) -> Result<Principal, StatusCode> {
    let principal = current(auth_session)?;
    if allow(principal.role, required) {
        Ok(principal)
    } else {
        Err(StatusCode::FORBIDDEN)
    }
}
