use {
    axum::{
        Router,
        routing::{get, post},
    },
    tower_http::cors::{Any, CorsLayer},
};

use crate::{handlers, state::AppState};

/// Build the gateway router.
///
/// The visitor API is wide open on CORS — the widget lives on the website
/// origin, not ours — with forgery protection handled by the per-session
/// token instead.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat/bootstrap", get(handlers::bootstrap))
        .route("/api/chat/message", post(handlers::send_message))
        .route("/api/chat/poll", post(handlers::poll_messages))
        .route("/api/chat/name", post(handlers::set_name))
        .route("/hooks/telegram", post(handlers::telegram_webhook))
        .layer(cors)
        .with_state(state)
}
