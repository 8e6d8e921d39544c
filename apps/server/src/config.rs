//! Environment-driven configuration.

use anyhow::Context;

/// Everything the server needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub redis_url: String,
    pub durable_url: String,
    pub durable_service_key: String,
    pub bot_token: String,
    pub miniapp_url: String,
}

fn required(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("missing required env var {name}"))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            listen_addr: std::env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            durable_url: required("DURABLE_URL")?,
            durable_service_key: required("DURABLE_SERVICE_KEY")?,
            bot_token: required("BOT_TOKEN")?,
            miniapp_url: required("PUBLIC_MINIAPP_URL")?,
        })
    }
}
