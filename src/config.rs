use anyhow::Context;
use std::env;

#[derive(Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub bind_addr: String,
    pub app_url: String,
    pub mail_from: String,
    pub resend_api_key: Option<String>,
    pub google: Option<GoogleOAuthConfig>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // A missing .env is fine; the environment may already be populated.
        dotenvy::dotenv().ok();
        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL is not set in .env file")?;
        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "debug".into());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
        let app_url = env::var("APP_URL").unwrap_or_else(|_| "http://localhost:3000".into());
        let mail_from = env::var("MAIL_FROM").unwrap_or_else(|_| "onboarding@resend.dev".into());
        let resend_api_key = env::var("RESEND_API_KEY").ok().filter(|k| !k.is_empty());

        // OAuth sign-in is enabled only when all three are present.
        let google = match (
            env::var("GOOGLE_CLIENT_ID"),
            env::var("GOOGLE_CLIENT_SECRET"),
            env::var("GOOGLE_REDIRECT_URI"),
        ) {
            (Ok(client_id), Ok(client_secret), Ok(redirect_url)) => Some(GoogleOAuthConfig {
                client_id,
                client_secret,
                redirect_url,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            rust_log,
            bind_addr,
            app_url,
            mail_from,
            resend_api_key,
            google,
        })
    }
}
