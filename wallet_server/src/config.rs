use std::time::Duration;

use anyhow::Context;

use crate::state::AppState;

pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub port: u16,
    pub db_acquire_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = match std::env::var("PORT") {
            Ok(port) => port
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got `{}`", port))?,
            Err(_) => 8080,
        };

        let db_acquire_timeout = match std::env::var("DB_ACQUIRE_TIMEOUT_SECS") {
            Ok(secs) => Duration::from_secs(secs.parse().with_context(|| {
                format!("DB_ACQUIRE_TIMEOUT_SECS must be a number of seconds, got `{}`", secs)
            })?),
            Err(_) => Duration::from_secs(5),
        };

        Ok(Self {
            database_url,
            bind_addr,
            port,
            db_acquire_timeout,
        })
    }

    pub async fn create_app_state(&self) -> anyhow::Result<AppState> {
        AppState::new(&self.database_url, self.db_acquire_timeout)
            .await
            .context("Failed to initialize AppState")
    }
}
