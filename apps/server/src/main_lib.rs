//! Server bootstrap: shared state construction and the axum application.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use clickrace_core::cache::RedisCacheStore;
use clickrace_core::store::RestStore;
use clickrace_core::{
    CounterService, CounterServiceTrait, DispatchConfig, DispatchService, MessengerTrait,
    SessionRegistry,
};

use crate::config::Config;
use crate::telegram::TelegramMessenger;

/// Shared handler state. Everything in here is cheaply cloneable or
/// behind an Arc.
pub struct AppState {
    pub counter_service: Arc<dyn CounterServiceTrait>,
    pub registry: Arc<SessionRegistry>,
    pub telegram: Arc<TelegramMessenger>,
    pub miniapp_url: String,
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Wires the adapters, warms the caches, and starts the broadcast loop.
pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let cache = Arc::new(
        RedisCacheStore::connect(&config.redis_url)
            .await
            .context("connecting to redis")?,
    );
    let store = Arc::new(RestStore::new(
        &config.durable_url,
        &config.durable_service_key,
    ));

    let counter_service: Arc<dyn CounterServiceTrait> =
        Arc::new(CounterService::new(cache, store));

    // Pre-seed the global counter; a cold cache still serves, just slower.
    match counter_service.warm_up().await {
        Ok(total) => info!("warmed global counter to {total}"),
        Err(e) => warn!("cache warm-up failed, continuing cold: {e}"),
    }

    let registry = Arc::new(SessionRegistry::new());
    let telegram = Arc::new(TelegramMessenger::new(&config.bot_token));

    let dispatcher = Arc::new(DispatchService::new(
        Arc::clone(&counter_service),
        Arc::clone(&registry),
        Arc::clone(&telegram) as Arc<dyn MessengerTrait>,
        DispatchConfig::new(&config.miniapp_url),
    ));
    dispatcher.start();

    Ok(Arc::new(AppState {
        counter_service,
        registry,
        telegram,
        miniapp_url: config.miniapp_url.clone(),
    }))
}
