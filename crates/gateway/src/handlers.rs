use std::net::SocketAddr;

use {
    axum::{
        Json,
        extract::{ConnectInfo, State},
        http::{HeaderMap, StatusCode, header},
        response::{IntoResponse, Response},
    },
    serde::Deserialize,
    serde_json::json,
    tracing::{info, warn},
};

use {
    chatrelay_messages::{Message, MessageKind, NewMessage, NewSender},
    chatrelay_routing::Error as RouteError,
    chatrelay_telegram::{Error as TelegramError, Processed},
};

use crate::{net::resolve_client_ip, state::AppState};

/// Generic user-facing strings; internal detail stays in the logs.
const ERR_INVALID_TOKEN: &str = "Invalid request token. Reload the page and try again.";
const ERR_RATE_LIMITED: &str = "Too many messages. Please wait a moment and try again.";
const ERR_CHANNEL: &str = "Message could not be delivered right now. Please try again later.";
const ERR_INTERNAL: &str = "Something went wrong. Please try again.";

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "error": message }))).into_response()
}

// ── Bootstrap ────────────────────────────────────────────────────────────────

/// Hand the widget a fresh anonymous session, its anti-forgery token, and
/// the display settings.
pub async fn bootstrap(State(state): State<AppState>) -> impl IntoResponse {
    let session_id = state.sessions.start_session();
    let token = state.csrf.token_for(&session_id);
    let widget = &state.config.widget;
    Json(json!({
        "session_id": session_id,
        "token": token,
        "settings": {
            "title": widget.title,
            "welcome_message": widget.welcome_message,
            "error_message": widget.error_message,
            "poll_interval_ms": widget.poll_interval_ms,
        },
    }))
}

// ── Send message ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SendMessageBody {
    pub session_id: String,
    pub message: String,
    pub token: String,
}

pub async fn send_message(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<SendMessageBody>,
) -> Response {
    if !state.csrf.verify(&body.session_id, &body.token) {
        return error_response(StatusCode::FORBIDDEN, ERR_INVALID_TOKEN);
    }

    let ctx = state.sessions.context_for(&body.session_id);
    let sender = sender_from_request(&state, &headers, addr, ctx.declared_name.clone());

    match state.engine.handle_visitor_message(&ctx, &body.message, sender).await {
        Ok(outcome) => Json(json!({
            "success": true,
            "automated": outcome.automated,
        }))
        .into_response(),
        Err(RouteError::Validation { reason }) => {
            error_response(StatusCode::BAD_REQUEST, &reason)
        },
        Err(RouteError::RateLimited { .. }) => {
            error_response(StatusCode::TOO_MANY_REQUESTS, ERR_RATE_LIMITED)
        },
        Err(RouteError::Channel { message }) => {
            warn!(session_id = %body.session_id, error = %message, "delivery failed");
            error_response(StatusCode::BAD_GATEWAY, ERR_CHANNEL)
        },
        Err(RouteError::Storage(e)) => {
            warn!(session_id = %body.session_id, error = %e, "log write failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, ERR_INTERNAL)
        },
    }
}

fn sender_from_request(
    state: &AppState,
    headers: &HeaderMap,
    addr: SocketAddr,
    name: Option<String>,
) -> NewSender {
    let ip = resolve_client_ip(headers, addr, state.config.server.behind_proxy);
    NewSender {
        ip: Some(ip.to_string()),
        user_agent: header_string(headers, header::USER_AGENT),
        page: header_string(headers, header::REFERER),
        name,
    }
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

// ── Poll ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PollBody {
    pub session_id: String,
    #[serde(default)]
    pub after_message_id: i64,
    pub token: String,
}

const POLL_LIMIT: u32 = 50;

pub async fn poll_messages(
    State(state): State<AppState>,
    Json(body): Json<PollBody>,
) -> Response {
    if !state.csrf.verify(&body.session_id, &body.token) {
        return error_response(StatusCode::FORBIDDEN, ERR_INVALID_TOKEN);
    }
    if !chatrelay_sessions::is_valid_session_id(&body.session_id) {
        return error_response(StatusCode::BAD_REQUEST, "invalid session id");
    }

    match state
        .store
        .read_since(&body.session_id, body.after_message_id, POLL_LIMIT)
        .await
    {
        Ok(messages) => {
            let rendered: Vec<serde_json::Value> = messages.iter().map(render_message).collect();
            Json(json!({ "success": true, "messages": rendered })).into_response()
        },
        Err(e) => {
            warn!(session_id = %body.session_id, error = %e, "poll read failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, ERR_INTERNAL)
        },
    }
}

fn render_message(message: &Message) -> serde_json::Value {
    json!({
        "id": message.id,
        "text": message.body,
        "kind": message.kind.as_str(),
        "time": format_clock_time(message.created_at),
    })
}

fn format_clock_time(unix_secs: i64) -> String {
    chrono::DateTime::from_timestamp(unix_secs, 0)
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_default()
}

// ── Declare name ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SetNameBody {
    pub name: String,
    pub session_id: String,
    pub token: String,
}

pub async fn set_name(State(state): State<AppState>, Json(body): Json<SetNameBody>) -> Response {
    if !state.csrf.verify(&body.session_id, &body.token) {
        return error_response(StatusCode::FORBIDDEN, ERR_INVALID_TOKEN);
    }

    let new_session_id = match state.sessions.set_name(&body.name) {
        Ok(id) => id,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    let ctx = state.sessions.context_for(&new_session_id);
    let joined = NewMessage {
        session_id: new_session_id.clone(),
        body: format!("{} joined the chat", ctx.display_name()),
        kind: MessageKind::SystemNotice,
        correlation_id: None,
        sender: None,
    };
    if let Err(e) = state.store.append(joined).await {
        warn!(session_id = %new_session_id, error = %e, "failed to log name declaration");
    }

    info!(session_id = %new_session_id, "visitor declared a name");
    Json(json!({
        "success": true,
        "session_id": new_session_id,
        "token": state.csrf.token_for(&new_session_id),
    }))
    .into_response()
}

// ── Telegram webhook ─────────────────────────────────────────────────────────

/// Inbound operator-channel events. The transport gets an answer about
/// payload handling only; whether correlation succeeded is internal —
/// malformed or uncorrelatable events are logged and dropped.
pub async fn telegram_webhook(
    State(state): State<AppState>,
    Json(update): Json<teloxide::types::Update>,
) -> Response {
    match state.correlator.process_update(&update).await {
        Ok(Processed::ReplyAppended { session_id }) => {
            info!(%session_id, "operator reply appended");
            (StatusCode::OK, "OK").into_response()
        },
        Ok(Processed::Ignored) => (StatusCode::OK, "OK").into_response(),
        Err(TelegramError::Storage(e)) => {
            warn!(error = %e, "webhook storage failure");
            (StatusCode::INTERNAL_SERVER_ERROR, "error").into_response()
        },
        Err(e) => {
            // MalformedCommand / CorrelationNotFound: discard by design.
            info!(error = %e, "dropping uncorrelatable operator event");
            (StatusCode::OK, "OK").into_response()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_time_formats_as_hours_minutes() {
        // 2024-05-01 09:30:00 UTC
        assert_eq!(format_clock_time(1714555800), "09:30");
        assert_eq!(format_clock_time(0), "00:00");
    }

    #[test]
    fn render_message_exposes_the_wire_shape() {
        let message = Message {
            id: 7,
            session_id: "chat-juan_a1b2c3".into(),
            body: "hello".into(),
            kind: MessageKind::ChannelReply,
            sender: None,
            correlation_id: None,
            created_at: 1714555800,
        };
        let value = render_message(&message);
        assert_eq!(value["id"], 7);
        assert_eq!(value["text"], "hello");
        assert_eq!(value["kind"], "channel-reply");
        assert_eq!(value["time"], "09:30");
    }
}
