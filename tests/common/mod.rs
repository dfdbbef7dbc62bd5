//! Shared setup for integration tests: an in-memory SQLite database with the
//! real migrations applied, and a mail transport that records what was sent.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use aura_assign::{
    auth::{
        backend::{Backend, Credentials, SignIn, SignInError},
        password::hash_password,
        principal::{NewPrincipal, Principal, SettingsUpdate, principals},
    },
    entities::sea_orm_active_enums::PrincipalKind,
    mail::{MailError, Mailer, Notifier},
    router::{AppState, create_router},
};
use axum::Router;
use axum_login::{AuthnBackend, tower_sessions::MemoryStore};
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

pub const PASSWORD: &str = "hunter22";

#[derive(Debug, Clone, PartialEq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<SentMail> {
        self.sent.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

/// Transport that always refuses delivery.
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _to: &str, _subject: &str, _html: &str) -> Result<(), MailError> {
        Err(MailError::Rejected {
            status: 503,
            body: "unavailable".to_string(),
        })
    }
}

/// Signs in straight through the backend, without a cookie session.
pub struct DirectSession {
    backend: Backend,
    pub user: Option<Principal>,
}

#[async_trait]
impl SignIn for DirectSession {
    async fn sign_in(&mut self, credentials: Credentials) -> Result<Principal, SignInError> {
        match self.backend.authenticate(credentials).await? {
            Some(principal) => {
                self.user = Some(principal.clone());
                Ok(principal)
            }
            None => Err(SignInError::CredentialsSignin),
        }
    }
}

pub struct TestApp {
    pub db: DatabaseConnection,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        let db = connect().await;
        let notifier = Notifier::new(mailer.clone(), "http://localhost:3000").unwrap();
        Self {
            state: AppState::new(db.clone(), notifier),
            db,
            mailer,
        }
    }

    /// Same database, but every email send fails.
    pub fn with_failing_mailer(&self) -> AppState {
        let notifier = Notifier::new(Arc::new(FailingMailer), "http://localhost:3000").unwrap();
        AppState::new(self.db.clone(), notifier)
    }

    /// The full HTTP stack over an in-memory session store. Clones of the
    /// returned router share sessions.
    pub fn router(&self) -> Router {
        create_router(
            self.state.clone(),
            Backend::new(self.db.clone(), None),
            MemoryStore::default(),
        )
    }

    pub fn session(&self) -> DirectSession {
        DirectSession {
            backend: Backend::new(self.db.clone(), None),
            user: None,
        }
    }

    pub async fn create_principal(
        &self,
        kind: PrincipalKind,
        email: &str,
        verified: bool,
        two_factor: bool,
    ) -> Principal {
        let store = principals(kind);
        let principal = store
            .create(
                &self.db,
                NewPrincipal {
                    name: Some("Test".to_string()),
                    email: email.to_string(),
                    password: Some(hash_password(PASSWORD).unwrap()),
                    email_verified: verified.then(|| Utc::now().naive_utc()),
                    image: None,
                },
            )
            .await
            .unwrap();

        if two_factor {
            store
                .update_settings(
                    &self.db,
                    principal.id,
                    SettingsUpdate {
                        is_two_factor_enabled: Some(true),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }

        store.find_by_id(&self.db, principal.id).await.unwrap().unwrap()
    }

    pub async fn reload(&self, principal: &Principal) -> Principal {
        principals(principal.kind)
            .find_by_id(&self.db, principal.id)
            .await
            .unwrap()
            .unwrap()
    }
}

async fn connect() -> DatabaseConnection {
    // One connection, so every query sees the same in-memory database.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}
