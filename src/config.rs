//! Environment-driven configuration, `.env` friendly.

use std::time::Duration;

use anyhow::Context;

use crate::gateway::GatewayConfig;
use crate::store::DEFAULT_HISTORY_LIMIT;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub history_limit: u32,
    pub storage_timeout: Duration,
    pub persist_system_messages: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = dotenv::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let bind_addr =
            dotenv::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned());
        let history_limit = match dotenv::var("HISTORY_LIMIT") {
            Ok(raw) => raw.parse().context("HISTORY_LIMIT must be an integer")?,
            Err(_) => DEFAULT_HISTORY_LIMIT,
        };
        let storage_timeout = match dotenv::var("STORAGE_TIMEOUT_MS") {
            Ok(raw) => Duration::from_millis(
                raw.parse().context("STORAGE_TIMEOUT_MS must be an integer")?,
            ),
            Err(_) => Duration::from_secs(5),
        };
        let persist_system_messages = match dotenv::var("PERSIST_SYSTEM_MESSAGES") {
            Ok(raw) => raw
                .parse()
                .context("PERSIST_SYSTEM_MESSAGES must be true or false")?,
            Err(_) => true,
        };

        Ok(Self {
            database_url,
            bind_addr,
            history_limit,
            storage_timeout,
            persist_system_messages,
        })
    }

    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig {
            history_limit: self.history_limit,
            storage_timeout: self.storage_timeout,
            persist_system_messages: self.persist_system_messages,
        }
    }
}
