use crate::{
    auth::{
        backend::{AuthSession, Backend},
        router as auth_router,
    },
    mail::Notifier,
    routes::{
        analytics::analytics,
        dashboard::dashboard,
        enrollments::{event_enrollments, my_enrollments, set_status},
        events::{create, delete, index as events_index, show, update},
        me::me,
        profile::{get_profile, put_profile},
        settings::settings,
    },
};
use axum::{
    Json, Router,
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use axum_login::{
    AuthManagerLayerBuilder,
    tower_sessions::{
        Expiry, SessionManagerLayer, SessionStore,
        cookie::{SameSite, time},
    },
};
use sea_orm::DatabaseConnection;
use serde_json::json;
use tokio::{
    signal,
    task::{AbortHandle, JoinHandle},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(db: DatabaseConnection, notifier: Notifier) -> Self {
        Self { db, notifier }
    }
}

/// Routes without the session layer. `create_router` wraps these.
pub fn app_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/me", get(me))
        .route("/settings", post(settings))
        .route("/dashboard", get(dashboard))
        .route("/analytics", get(analytics))
        .route("/profile", get(get_profile).put(put_profile))
        .route("/events", get(events_index).post(create))
        .route("/events/{id}", get(show).put(update).delete(delete))
        .route("/events/{id}/enroll", post(crate::routes::enrollments::enroll))
        .route("/events/{id}/enrollments", get(event_enrollments))
        .route("/enrollments", get(my_enrollments))
        .route("/enrollments/{id}/status", post(set_status))
        .merge(auth_router::router())
}

/// Production passes a `PostgresStore`; any session store works.
pub fn create_router<Store>(state: AppState, backend: Backend, session_store: Store) -> Router
where
    Store: SessionStore + Clone,
{
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax) // Ensure we send the cookie from the OAuth redirect.
        .with_expiry(Expiry::OnInactivity(time::Duration::days(1)));

    // Auth service.
    //
    // This combines the session layer with our backend to establish the auth
    // service which will provide the auth session as a request extension.
    let auth_layer = AuthManagerLayerBuilder::new(backend, session_layer).build();

    app_routes()
        .with_state(state)
        .layer(auth_layer)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn index(auth_session: AuthSession) -> impl IntoResponse {
    if auth_session.user.is_some() {
        Redirect::to("/dashboard").into_response()
    } else {
        Json(json!({ "name": "aura-assign", "signedIn": false })).into_response()
    }
}

pub async fn shutdown_signal(deletion_task_abort_handle: AbortHandle) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { deletion_task_abort_handle.abort() },
        _ = terminate => { deletion_task_abort_handle.abort() },
    }
}

/// Waits for the expired-session sweeper. `shutdown_signal` aborts it, so a
/// cancelled task is a clean stop.
pub async fn join_deletion_task<E>(task: JoinHandle<Result<(), E>>) -> anyhow::Result<()>
where
    E: std::error::Error + Send + Sync + 'static,
{
    match task.await {
        Ok(result) => Ok(result?),
        Err(e) if e.is_cancelled() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[tokio::test]
    async fn aborted_deletion_task_is_a_clean_stop() {
        let task = tokio::spawn(std::future::pending::<Result<(), io::Error>>());
        task.abort();
        assert!(join_deletion_task(task).await.is_ok());
    }

    #[tokio::test]
    async fn failed_deletion_task_is_reported() {
        let task = tokio::spawn(async { Err::<(), _>(io::Error::other("store unreachable")) });
        let err = join_deletion_task(task).await.unwrap_err();
        assert!(err.to_string().contains("store unreachable"));
    }
}
