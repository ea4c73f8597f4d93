use std::{net::SocketAddr, sync::Arc};

use {sqlx::SqlitePool, tracing::info};

use {
    chatrelay_automation::WebhookAutomationClient,
    chatrelay_channels::OperatorChannel,
    chatrelay_config::ChatrelayConfig,
    chatrelay_messages::{SqliteMessageStore, schema},
    chatrelay_routing::{EngineConfig, RateLimiter, RoutingEngine},
    chatrelay_sessions::SessionRegistry,
    chatrelay_telegram::{ReplyCorrelator, TelegramNotifier},
};

use crate::{csrf::CsrfKeys, routes, state::AppState};

/// Wire everything up and serve until shutdown.
pub async fn start_gateway(config: ChatrelayConfig, pool: SqlitePool) -> anyhow::Result<()> {
    schema::run_migrations(&pool).await?;

    let state = build_state(config, pool)?;
    let bind = format!(
        "{}:{}",
        state.config.server.bind, state.config.server.port
    );

    let router = routes::router(state);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(%bind, "gateway listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Assemble the application state from config and an open pool.
pub fn build_state(config: ChatrelayConfig, pool: SqlitePool) -> anyhow::Result<AppState> {
    let config = Arc::new(config);

    let store = Arc::new(SqliteMessageStore::new(pool, config.site.url.clone()));

    let limiter = RateLimiter::new(
        config.limits.max_messages_per_window,
        config.limits.window(),
    );

    let automation = Arc::new(WebhookAutomationClient::from_config(&config.automation)?);

    let operator: Option<Arc<dyn OperatorChannel>> =
        match TelegramNotifier::from_config(&config.telegram)? {
            Some(notifier) => {
                info!(chat_id = %config.telegram.chat_id, "telegram operator channel enabled");
                Some(Arc::new(notifier))
            },
            None => {
                info!("telegram operator channel not configured");
                None
            },
        };

    let engine = Arc::new(RoutingEngine::new(
        EngineConfig::from_config(&config),
        store.clone(),
        limiter,
        automation,
        operator,
    ));

    let correlator = Arc::new(ReplyCorrelator::new(store.clone()));

    Ok(AppState {
        config,
        engine,
        store,
        sessions: Arc::new(SessionRegistry::new()),
        correlator,
        csrf: CsrfKeys::new(),
    })
}
