use std::sync::Arc;

use aura_assign::{
    auth::backend::{Backend, oauth_client},
    config::Config,
    database::setup_database,
    mail::{LogMailer, Mailer, Notifier, ResendMailer},
    router::{AppState, create_router, join_deletion_task, shutdown_signal},
};
use axum_login::tower_sessions::ExpiredDeletion;
use tokio::net::TcpListener;
use tower_sessions_sqlx_store::PostgresStore;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (db, pool) = setup_database(&config.database_url).await?;

    let session_store = PostgresStore::new(pool);
    session_store.migrate().await?;

    let deletion_task = tokio::task::spawn(
        session_store
            .clone()
            .continuously_delete_expired(tokio::time::Duration::from_secs(60)),
    );

    let mailer: Arc<dyn Mailer> = match &config.resend_api_key {
        Some(key) => Arc::new(ResendMailer::new(key.clone(), config.mail_from.clone())),
        None => {
            warn!("RESEND_API_KEY not set; emails will be logged, not sent");
            Arc::new(LogMailer)
        }
    };
    let notifier = Notifier::new(mailer, config.app_url.clone())?;

    let client = config.google.as_ref().map(oauth_client).transpose()?;
    if client.is_none() {
        info!("Google OAuth not configured; password sign-in only");
    }

    let state = AppState::new(db.clone(), notifier);
    let backend = Backend::new(db, client);
    let app = create_router(state, backend, session_store);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(deletion_task.abort_handle()))
        .await?;

    join_deletion_task(deletion_task).await?;

    Ok(())
}
