use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use axum_login::tower_sessions::Session;
use oauth2::CsrfToken;
use serde::Deserialize;
use tracing::{debug, error};

use super::backend::{AuthSession, Credentials, OAuthCredentials};
use crate::{
    actions::{
        self,
        login::LoginInput,
        register::RegisterInput,
        reset::{NewPasswordInput, ResetInput},
    },
    entities::sea_orm_active_enums::PrincipalKind,
    router::AppState,
};

pub const NEXT_URL_KEY: &str = "auth.next-url";
pub const CSRF_STATE_KEY: &str = "oauth.csrf-state";

#[derive(Debug, Clone, Deserialize)]
pub struct AuthzResp {
    code: String,
    state: CsrfToken,
}

// This allows us to extract the "next" field from the query string. We use this
// to redirect after log in.
#[derive(Debug, Deserialize)]
pub struct NextUrl {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenParam {
    token: String,
}

/// Only same-site paths are followed after sign-in. `//host` and `/\host`
/// are read as other origins by browsers.
fn local_path(next: Option<String>) -> Option<String> {
    next.filter(|url| {
        url.starts_with('/') && !url.starts_with("//") && !url.starts_with("/\\")
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/{kind}/register", post(self::post::register))
        .route("/auth/{kind}/login", post(self::post::login))
        .route("/auth/{kind}/reset", post(self::post::reset))
        .route(
            "/auth/new-verification",
            get(self::get::new_verification).post(self::post::new_verification),
        )
        .route(
            "/auth/new-password",
            get(self::get::new_password).post(self::post::new_password),
        )
        .route("/auth/oauth/login", get(self::get::oauth_login))
        .route("/auth/oauth/callback", get(self::get::callback))
        .route("/logout", get(self::get::logout))
}

mod post {
    use super::*;

    pub async fn register(
        State(state): State<AppState>,
        Path(kind): Path<PrincipalKind>,
        Json(input): Json<RegisterInput>,
    ) -> impl IntoResponse {
        actions::register::register(&state, kind, input).await
    }

    pub async fn login(
        State(state): State<AppState>,
        mut auth_session: AuthSession,
        Path(kind): Path<PrincipalKind>,
        Json(input): Json<LoginInput>,
    ) -> impl IntoResponse {
        actions::login::login(&state, &mut auth_session, kind, input).await
    }

    pub async fn reset(
        State(state): State<AppState>,
        Path(kind): Path<PrincipalKind>,
        Json(input): Json<ResetInput>,
    ) -> impl IntoResponse {
        actions::reset::reset(&state, kind, input).await
    }

    pub async fn new_verification(
        State(state): State<AppState>,
        Json(TokenParam { token }): Json<TokenParam>,
    ) -> impl IntoResponse {
        actions::verification::new_verification(&state, &token).await
    }

    pub async fn new_password(
        State(state): State<AppState>,
        Json(input): Json<NewPasswordInput>,
    ) -> impl IntoResponse {
        actions::reset::new_password(&state, input).await
    }
}

mod get {
    use super::*;

    /// Target of the link in the confirmation email.
    pub async fn new_verification(
        State(state): State<AppState>,
        Query(TokenParam { token }): Query<TokenParam>,
    ) -> impl IntoResponse {
        actions::verification::new_verification(&state, &token).await
    }

    /// Target of the link in the reset email. The password itself is set
    /// through the POST route.
    pub async fn new_password(
        State(state): State<AppState>,
        Query(TokenParam { token }): Query<TokenParam>,
    ) -> impl IntoResponse {
        actions::reset::check_reset_token(&state, &token).await
    }

    pub async fn oauth_login(
        auth_session: AuthSession,
        session: Session,
        Query(NextUrl { next }): Query<NextUrl>,
    ) -> impl IntoResponse {
        let Some((auth_url, csrf_state)) = auth_session.backend.authorize_url() else {
            return (StatusCode::NOT_FOUND, "OAuth sign-in is not configured").into_response();
        };

        if let Err(e) = session.insert(CSRF_STATE_KEY, csrf_state.secret()).await {
            error!(error = %e, "failed to store csrf state");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }

        if let Err(e) = session.insert(NEXT_URL_KEY, local_path(next)).await {
            error!(error = %e, "failed to store next url");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }

        Redirect::to(auth_url.as_str()).into_response()
    }

    pub async fn logout(mut auth_session: AuthSession) -> impl IntoResponse {
        match auth_session.logout().await {
            Ok(_) => Redirect::to("/").into_response(),
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }

    pub async fn callback(
        mut auth_session: AuthSession,
        session: Session,
        Query(AuthzResp {
            code,
            state: new_state,
        }): Query<AuthzResp>,
    ) -> impl IntoResponse {
        let Ok(Some(old_state)) = session.get(CSRF_STATE_KEY).await else {
            return StatusCode::BAD_REQUEST.into_response();
        };

        let creds = Credentials::OAuth(OAuthCredentials {
            code,
            old_state,
            new_state,
        });

        let user = match auth_session.authenticate(creds).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!("oauth sign-in refused");
                return (StatusCode::UNAUTHORIZED, "You are not allowed here.").into_response();
            }
            Err(e) => {
                error!(error = %e, "oauth sign-in failed");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

        if auth_session.login(&user).await.is_err() {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }

        let next = session.remove::<String>(NEXT_URL_KEY).await.ok().flatten();
        if let Some(next) = local_path(next) {
            Redirect::to(&next).into_response()
        } else {
            Redirect::to("/dashboard").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_same_site_paths_are_followed() {
        assert_eq!(local_path(Some("/events".into())), Some("/events".into()));
        assert_eq!(local_path(Some("/".into())), Some("/".into()));
        assert_eq!(local_path(Some("//evil.test/x".into())), None);
        assert_eq!(local_path(Some("/\\evil.test".into())), None);
        assert_eq!(local_path(Some("https://evil.test".into())), None);
        assert_eq!(local_path(Some("events".into())), None);
        assert_eq!(local_path(None), None);
    }
}
