use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub poll_interval_secs: u64,
    pub smtp_host: String,
    pub smtp_user: String,
    pub smtp_password: String,
    pub email_from: String,
    pub email_to: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let smtp_user = env::var("SMTP_USER").context("SMTP_USER must be set")?;

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            poll_interval_secs: env::var("POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .context("POLL_INTERVAL_SECS must be a valid number")?,
            smtp_host: env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
            smtp_password: env::var("SMTP_PASSWORD").context("SMTP_PASSWORD must be set")?,
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| format!("Depto Bot <{}>", smtp_user)),
            email_to: env::var("EMAIL_TO").context("EMAIL_TO must be set")?,
            smtp_user,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
