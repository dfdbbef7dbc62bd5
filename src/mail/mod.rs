//! Outgoing email. [`Notifier`] renders the message for each token type and
//! hands it to a [`Mailer`] transport.

mod resend;

use std::sync::Arc;

use async_trait::async_trait;
use minijinja::{Environment, Value};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::info;

use crate::auth::tokens::TWO_FACTOR_TOKEN_TTL_SECS;

pub use resend::ResendMailer;

// Everything but RFC 3986 unreserved characters.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("mail provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error(transparent)]
    Template(#[from] minijinja::Error),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError>;
}

/// Writes messages to the log instead of delivering them. Used when no
/// provider key is configured.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        info!(to, subject, body = html, "email delivery disabled; logging message");
        Ok(())
    }
}

#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    templates: Arc<Environment<'static>>,
    app_url: String,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, app_url: impl Into<String>) -> Result<Self, MailError> {
        let mut env = Environment::new();
        env.add_template(
            "verification.html",
            include_str!("../../templates/email/verification.html"),
        )?;
        env.add_template(
            "password_reset.html",
            include_str!("../../templates/email/password_reset.html"),
        )?;
        env.add_template(
            "two_factor.html",
            include_str!("../../templates/email/two_factor.html"),
        )?;

        Ok(Self {
            mailer,
            templates: Arc::new(env),
            app_url: app_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Marked safe so auto-escaping leaves the slashes alone. The token part
    /// is already percent-encoded.
    fn link(&self, path: &str, token: &str) -> Value {
        Value::from_safe_string(format!(
            "{}{}?token={}",
            self.app_url,
            path,
            utf8_percent_encode(token, QUERY_VALUE)
        ))
    }

    pub async fn send_verification_email(&self, email: &str, token: &str) -> Result<(), MailError> {
        let link = self.link("/auth/new-verification", token);
        let html = self
            .templates
            .get_template("verification.html")?
            .render(minijinja::context! { link => link })?;
        self.mailer.send(email, "Confirm your email", &html).await
    }

    pub async fn send_password_reset_email(
        &self,
        email: &str,
        token: &str,
    ) -> Result<(), MailError> {
        let link = self.link("/auth/new-password", token);
        let html = self
            .templates
            .get_template("password_reset.html")?
            .render(minijinja::context! { link => link })?;
        self.mailer.send(email, "Reset your password", &html).await
    }

    pub async fn send_two_factor_token_email(
        &self,
        email: &str,
        code: &str,
    ) -> Result<(), MailError> {
        let html = self
            .templates
            .get_template("two_factor.html")?
            .render(minijinja::context! {
                code => code,
                minutes => TWO_FACTOR_TOKEN_TTL_SECS / 60,
            })?;
        self.mailer.send(email, "2FA Code", &html).await
    }
}
