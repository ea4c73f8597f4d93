use std::sync::Arc;

use {
    chatrelay_config::ChatrelayConfig,
    chatrelay_messages::MessageStore,
    chatrelay_routing::RoutingEngine,
    chatrelay_sessions::SessionRegistry,
    chatrelay_telegram::ReplyCorrelator,
};

use crate::csrf::CsrfKeys;

/// Everything the handlers need, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ChatrelayConfig>,
    pub engine: Arc<RoutingEngine>,
    pub store: Arc<dyn MessageStore>,
    pub sessions: Arc<SessionRegistry>,
    pub correlator: Arc<ReplyCorrelator>,
    pub csrf: CsrfKeys,
}
