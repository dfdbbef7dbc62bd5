use async_trait::async_trait;
use axum_login::{AuthUser, AuthnBackend, UserId};
use chrono::Utc;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    HttpClientError, RedirectUrl, Scope, TokenResponse, TokenUrl,
    basic::{BasicClient, BasicRequestTokenError},
};
use reqwest::Url;
use sea_orm::{ActiveValue::Set, IntoActiveModel, prelude::*};
use tracing::debug;

use super::google;
use super::password::verify_password;
use super::principal::{Principal, PrincipalId, principals};
use super::tokens;
use crate::config::GoogleOAuthConfig;
use crate::entities::{
    account,
    sea_orm_active_enums::{PrincipalKind, Role},
    user,
};

pub type OauthClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

impl AuthUser for Principal {
    type Id = PrincipalId;

    fn id(&self) -> Self::Id {
        PrincipalId {
            kind: self.kind,
            id: self.id,
        }
    }

    // Changing the password invalidates existing sessions.
    fn session_auth_hash(&self) -> &[u8] {
        self.password.as_deref().unwrap_or(&self.email).as_bytes()
    }
}

#[derive(Debug, Clone)]
pub struct PasswordCredentials {
    pub kind: PrincipalKind,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub code: String,
    pub old_state: CsrfToken,
    pub new_state: CsrfToken,
}

#[derive(Debug, Clone)]
pub enum Credentials {
    Password(PasswordCredentials),
    OAuth(OAuthCredentials),
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error(transparent)]
    Seaorm(sea_orm::DbErr),

    #[error("User not found")]
    UnknownUser,

    #[error("OAuth sign-in is not configured")]
    OAuthDisabled,

    #[error(transparent)]
    Reqwest(reqwest::Error),

    #[error(transparent)]
    OAuth2(BasicRequestTokenError<HttpClientError<reqwest::Error>>),
}

pub fn oauth_client(config: &GoogleOAuthConfig) -> anyhow::Result<OauthClient> {
    let auth_url = AuthUrl::new(google::AUTH_URL.to_string())?;
    let token_url = TokenUrl::new(google::TOKEN_URL.to_string())?;
    Ok(BasicClient::new(ClientId::new(config.client_id.clone()))
        .set_client_secret(ClientSecret::new(config.client_secret.clone()))
        .set_auth_uri(auth_url)
        .set_token_uri(token_url)
        .set_redirect_uri(RedirectUrl::new(config.redirect_url.clone())?))
}

#[derive(Debug, Clone)]
pub struct Backend {
    db: DatabaseConnection,
    client: Option<OauthClient>,
}

impl Backend {
    pub fn new(db: DatabaseConnection, client: Option<OauthClient>) -> Self {
        Self { db, client }
    }

    /// `None` when OAuth sign-in is not configured.
    pub fn authorize_url(&self) -> Option<(Url, CsrfToken)> {
        self.client.as_ref().map(|client| {
            client
                .authorize_url(CsrfToken::new_random)
                .add_scope(Scope::new("openid".to_string()))
                .add_scope(Scope::new("email".to_string()))
                .add_scope(Scope::new("profile".to_string()))
                .url()
        })
    }

    async fn authenticate_password(
        &self,
        creds: PasswordCredentials,
    ) -> Result<Option<Principal>, BackendError> {
        let Some(principal) = principals(creds.kind)
            .find_by_email(&self.db, &creds.email)
            .await
            .map_err(BackendError::Seaorm)?
        else {
            return Ok(None);
        };

        let Some(hash) = principal.password.as_deref() else {
            return Ok(None);
        };
        if verify_password(&creds.password, hash).is_err() {
            return Ok(None);
        }

        if principal.email_verified.is_none() {
            debug!(email = %principal.email, "refusing session for unverified email");
            return Ok(None);
        }

        // The confirmation is single-use: the session consumes it.
        if principal.is_two_factor_enabled {
            let confirmed =
                tokens::take_two_factor_confirmation(&self.db, principal.kind, principal.id)
                    .await
                    .map_err(BackendError::Seaorm)?;
            if !confirmed {
                debug!(email = %principal.email, "missing two-factor confirmation");
                return Ok(None);
            }
        }

        Ok(Some(principal))
    }

    async fn authenticate_oauth(
        &self,
        creds: OAuthCredentials,
    ) -> Result<Option<Principal>, BackendError> {
        // Ensure the CSRF state has not been tampered with.
        if creds.old_state.secret() != creds.new_state.secret() {
            return Ok(None);
        };

        let client = self.client.as_ref().ok_or(BackendError::OAuthDisabled)?;

        let http_client = reqwest::ClientBuilder::new()
            // Following redirects opens the client up to SSRF vulnerabilities.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(BackendError::Reqwest)?;

        // Process authorization code, expecting a token response back.
        let token_res = client
            .exchange_code(AuthorizationCode::new(creds.code))
            .request_async(&http_client)
            .await
            .map_err(BackendError::OAuth2)?;

        let info = google::get_user_info(&http_client, token_res.access_token().secret())
            .await
            .map_err(BackendError::Reqwest)?;
        let email = info.email.clone().ok_or(BackendError::UnknownUser)?;

        let linked = account::Entity::find()
            .filter(account::Column::Provider.eq(google::PROVIDER))
            .filter(account::Column::ProviderAccountId.eq(info.sub.clone()))
            .one(&self.db)
            .await
            .map_err(BackendError::Seaorm)?;

        debug!("Handling oauth user");
        let user = match linked {
            Some(account) => user::Entity::find_by_id(account.user_id)
                .one(&self.db)
                .await
                .map_err(BackendError::Seaorm)?
                .ok_or(BackendError::UnknownUser)?,
            None => {
                let existing = user::Entity::find()
                    .filter(user::Column::Email.eq(email.clone()))
                    .one(&self.db)
                    .await
                    .map_err(BackendError::Seaorm)?;
                // A password account with this email must not be taken over
                // by an unlinked provider identity.
                if existing.is_some() {
                    debug!(%email, "oauth identity not linked to existing user");
                    return Ok(None);
                }

                let user_model = user::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    name: Set(info.name),
                    email: Set(email),
                    password: Set(None),
                    email_verified: Set(None),
                    image: Set(info.picture),
                    role: Set(Role::User),
                    is_two_factor_enabled: Set(false),
                    ..Default::default()
                };
                debug!("Creating new user: {:?}", user_model);
                let user = user_model
                    .insert(&self.db)
                    .await
                    .map_err(BackendError::Seaorm)?;

                let account_model = account::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user.id),
                    provider: Set(google::PROVIDER.to_string()),
                    provider_account_id: Set(info.sub),
                };
                account_model
                    .insert(&self.db)
                    .await
                    .map_err(BackendError::Seaorm)?;
                user
            }
        };

        // The provider vouches for the address.
        let user = match user.email_verified {
            Some(_) => user,
            None => {
                let mut user_model = user.into_active_model();
                user_model.email_verified = Set(Some(Utc::now().naive_utc()));
                user_model
                    .update(&self.db)
                    .await
                    .map_err(BackendError::Seaorm)?
            }
        };

        Ok(Some(user.into()))
    }
}

#[async_trait]
impl AuthnBackend for Backend {
    type User = Principal;
    type Credentials = Credentials;
    type Error = BackendError;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        match creds {
            Credentials::Password(creds) => self.authenticate_password(creds).await,
            Credentials::OAuth(creds) => self.authenticate_oauth(creds).await,
        }
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        principals(user_id.kind)
            .find_by_id(&self.db, user_id.id)
            .await
            .map_err(BackendError::Seaorm)
    }
}

// We use a type alias for convenience.
//
// Note that we've supplied our concrete backend here.
pub type AuthSession = axum_login::AuthSession<Backend>;

#[derive(Debug, thiserror::Error)]
pub enum SignInError {
    #[error("invalid credentials")]
    CredentialsSignin,

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("session error: {0}")]
    Session(String),
}

/// Establishes a session for credentials. The login flow depends on this
/// rather than on `AuthSession` so it can run without a cookie store.
#[async_trait]
pub trait SignIn: Send {
    async fn sign_in(&mut self, credentials: Credentials) -> Result<Principal, SignInError>;
}

#[async_trait]
impl SignIn for AuthSession {
    async fn sign_in(&mut self, credentials: Credentials) -> Result<Principal, SignInError> {
        let principal = match self.authenticate(credentials).await {
            Ok(Some(principal)) => principal,
            Ok(None) => return Err(SignInError::CredentialsSignin),
            Err(axum_login::Error::Backend(e)) => return Err(SignInError::Backend(e)),
            Err(axum_login::Error::Session(e)) => return Err(SignInError::Session(e.to_string())),
        };

        self.login(&principal)
            .await
            .map_err(|e| SignInError::Session(e.to_string()))?;
        Ok(principal)
    }
}
