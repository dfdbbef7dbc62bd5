use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info};

use super::{MailError, Mailer};

const RESEND_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Delivers mail through the Resend HTTP API.
#[derive(Debug, Clone)]
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        let request = SendEmailRequest {
            from: &self.from,
            to: [to],
            subject,
            html,
        };
        let response = self
            .client
            .post(RESEND_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!(to, subject, "Email sent successfully");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        error!(to, status = status.as_u16(), %body, "Failed to send email");
        Err(MailError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
