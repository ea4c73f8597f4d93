//! Reply correlation.
//!
//! Operators answer visitors from Telegram in two shapes: a `/reply
//! <session-id> <text>` command, or a native reply to an outbound notice.
//! Both resolve to a session — the command carries the identifier
//! explicitly, the reply form recovers it from the stored correlation id
//! or the `Session: ` marker in the quoted notice — and append the text to
//! the conversation log. Events that cannot be correlated are logged and
//! dropped; nothing is retried.

use std::sync::{Arc, LazyLock};

use {
    regex::Regex,
    teloxide::types::{Message, Update, UpdateKind},
    tracing::{debug, warn},
};

use chatrelay_messages::{MessageKind, MessageStore, NewMessage};

use crate::{
    REPLY_COMMAND, SESSION_MARKER,
    error::{Error, Result},
};

#[allow(clippy::expect_used)]
static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("{SESSION_MARKER}(chat-[a-z0-9-]+_[a-f0-9]{{6}})"))
        .expect("session marker regex")
});

/// What an inbound update amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Processed {
    /// A reply was appended to the given session's log.
    ReplyAppended { session_id: String },
    /// Not a reply; nothing to do.
    Ignored,
}

/// Parse a `/reply <session-id> <text>` command into its parts.
///
/// The reply body may itself contain spaces; only the first two separators
/// split.
pub fn parse_reply_command(text: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = text.splitn(3, ' ').collect();
    if parts.len() < 3 {
        return Err(Error::malformed(format!(
            "expected {REPLY_COMMAND} <session-id> <text>"
        )));
    }

    let session_id = parts[1];
    let body = parts[2].trim();
    if !chatrelay_sessions::is_valid_session_id(session_id) {
        return Err(Error::malformed("session id does not match the grammar"));
    }
    if body.is_empty() {
        return Err(Error::malformed("reply text is empty"));
    }

    Ok((session_id.to_string(), body.to_string()))
}

/// Pull the session identifier out of a quoted notice via the fixed marker.
pub fn extract_session_from_notice(notice_text: &str) -> Result<String> {
    MARKER_RE
        .captures(notice_text)
        .map(|c| c[1].to_string())
        .ok_or(Error::CorrelationNotFound)
}

/// Correlates inbound operator-channel events back to visitor sessions.
pub struct ReplyCorrelator {
    store: Arc<dyn MessageStore>,
}

impl ReplyCorrelator {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    /// Handle one webhook update.
    ///
    /// Returns `Ok(Ignored)` for updates that are not replies at all;
    /// malformed commands and uncorrelatable replies are errors the caller
    /// is expected to log and discard.
    pub async fn process_update(&self, update: &Update) -> Result<Processed> {
        let UpdateKind::Message(message) = &update.kind else {
            debug!("ignoring non-message update");
            return Ok(Processed::Ignored);
        };
        let Some(text) = message.text() else {
            debug!("ignoring non-text message");
            return Ok(Processed::Ignored);
        };

        if text == REPLY_COMMAND || text.starts_with(&format!("{REPLY_COMMAND} ")) {
            let (session_id, body) = parse_reply_command(text)?;
            self.append_reply(&session_id, &body).await?;
            return Ok(Processed::ReplyAppended { session_id });
        }

        if let Some(replied) = message.reply_to_message() {
            let session_id = self.resolve_replied_session(replied).await?;
            self.append_reply(&session_id, text).await?;
            return Ok(Processed::ReplyAppended { session_id });
        }

        debug!("no reply shape detected in update");
        Ok(Processed::Ignored)
    }

    /// Resolve the session a quoted notice belongs to: the stored
    /// correlation id takes precedence, the embedded marker is the
    /// fallback for notices sent before correlation ids were recorded.
    async fn resolve_replied_session(&self, replied: &Message) -> Result<String> {
        let correlation_id = i64::from(replied.id.0);
        if let Some(original) = self.store.find_by_correlation(correlation_id).await? {
            debug!(
                correlation_id,
                session_id = %original.session_id,
                "resolved reply via stored correlation id"
            );
            return Ok(original.session_id);
        }

        let quoted = replied.text().unwrap_or_default();
        let session_id = extract_session_from_notice(quoted)?;
        if !chatrelay_sessions::is_valid_session_id(&session_id) {
            warn!(session_id, "marker produced an invalid session id");
            return Err(Error::CorrelationNotFound);
        }
        Ok(session_id)
    }

    async fn append_reply(&self, session_id: &str, body: &str) -> Result<()> {
        self.store
            .append(NewMessage {
                session_id: session_id.to_string(),
                body: body.to_string(),
                kind: MessageKind::ChannelReply,
                correlation_id: None,
                sender: None,
            })
            .await?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use {
        chatrelay_messages::{SqliteMessageStore, schema},
        sqlx::SqlitePool,
    };

    use super::*;

    #[test]
    fn parses_a_well_formed_command() {
        let (session_id, body) = parse_reply_command("/reply chat-juan_a1b2c3 Hello there").unwrap();
        assert_eq!(session_id, "chat-juan_a1b2c3");
        assert_eq!(body, "Hello there");
    }

    #[test]
    fn reply_body_keeps_further_spaces() {
        let (_, body) =
            parse_reply_command("/reply chat-juan_a1b2c3 one two three four").unwrap();
        assert_eq!(body, "one two three four");
    }

    #[test]
    fn too_few_parts_is_malformed() {
        assert!(matches!(
            parse_reply_command("/reply onlyonearg"),
            Err(Error::MalformedCommand { .. })
        ));
        assert!(matches!(
            parse_reply_command("/reply"),
            Err(Error::MalformedCommand { .. })
        ));
    }

    #[test]
    fn bad_session_id_is_malformed() {
        assert!(matches!(
            parse_reply_command("/reply not-a-session Hello"),
            Err(Error::MalformedCommand { .. })
        ));
    }

    #[test]
    fn marker_extraction_finds_the_id() {
        let text = "New message from Acme Web\n\nName: Juan\nSession: chat-juan_a1b2c3\nPage: /";
        assert_eq!(
            extract_session_from_notice(text).unwrap(),
            "chat-juan_a1b2c3"
        );
    }

    #[test]
    fn marker_extraction_fails_without_marker_or_valid_id() {
        assert!(matches!(
            extract_session_from_notice("no marker here"),
            Err(Error::CorrelationNotFound)
        ));
        assert!(matches!(
            extract_session_from_notice("Session: NOT_VALID"),
            Err(Error::CorrelationNotFound)
        ));
    }

    // ── process_update against a real store ─────────────────────────────

    async fn test_store() -> Arc<SqliteMessageStore> {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        schema::run_migrations(&pool).await.unwrap();
        Arc::new(SqliteMessageStore::new(pool, "https://acme.test"))
    }

    fn message_update(text: &str, reply_to: Option<serde_json::Value>) -> Update {
        let mut message = serde_json::json!({
            "message_id": 500,
            "date": 1714561200,
            "chat": {"id": 42, "type": "private", "first_name": "Op"},
            "from": {"id": 7, "is_bot": false, "first_name": "Op"},
            "text": text,
        });
        if let Some(replied) = reply_to {
            message["reply_to_message"] = replied;
        }
        serde_json::from_value(serde_json::json!({
            "update_id": 1,
            "message": message,
        }))
        .unwrap()
    }

    fn notice_message(message_id: i64, text: &str) -> serde_json::Value {
        serde_json::json!({
            "message_id": message_id,
            "date": 1714561100,
            "chat": {"id": 42, "type": "private", "first_name": "Op"},
            "from": {"id": 99, "is_bot": true, "first_name": "relay-bot"},
            "text": text,
        })
    }

    #[tokio::test]
    async fn reply_command_appends_to_the_session() {
        let store = test_store().await;
        let correlator = ReplyCorrelator::new(store.clone());

        let update = message_update("/reply chat-juan_a1b2c3 Hello there", None);
        let processed = correlator.process_update(&update).await.unwrap();
        assert_eq!(
            processed,
            Processed::ReplyAppended {
                session_id: "chat-juan_a1b2c3".into()
            }
        );

        let messages = store.read_since("chat-juan_a1b2c3", 0, 50).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body, "Hello there");
        assert_eq!(messages[0].kind, MessageKind::ChannelReply);
    }

    #[tokio::test]
    async fn malformed_command_appends_nothing() {
        let store = test_store().await;
        let correlator = ReplyCorrelator::new(store.clone());

        let update = message_update("/reply onlyonearg", None);
        let err = correlator.process_update(&update).await.unwrap_err();
        assert!(matches!(err, Error::MalformedCommand { .. }));
        assert_eq!(store.count("chat-juan_a1b2c3").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn reply_to_notice_resolves_via_the_marker() {
        let store = test_store().await;
        let correlator = ReplyCorrelator::new(store.clone());

        let notice =
            notice_message(600, "New message from Acme Web\n\nSession: chat-ana_0fff00\n…");
        let update = message_update("We are on it!", Some(notice));

        let processed = correlator.process_update(&update).await.unwrap();
        assert_eq!(
            processed,
            Processed::ReplyAppended {
                session_id: "chat-ana_0fff00".into()
            }
        );

        let messages = store.read_since("chat-ana_0fff00", 0, 50).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body, "We are on it!");
    }

    #[tokio::test]
    async fn reply_to_notice_prefers_the_stored_correlation_id() {
        let store = test_store().await;
        let visitor_id = store
            .append(NewMessage {
                session_id: "chat-juan_a1b2c3".into(),
                body: "original question".into(),
                kind: MessageKind::Visitor,
                correlation_id: None,
                sender: None,
            })
            .await
            .unwrap();
        store.attach_correlation(visitor_id, 700).await.unwrap();

        let correlator = ReplyCorrelator::new(store.clone());
        // The quoted notice has no marker text at all; only the stored
        // correlation id can resolve it.
        let notice = notice_message(700, "notice text without any token");
        let update = message_update("Answer via correlation", Some(notice));

        let processed = correlator.process_update(&update).await.unwrap();
        assert_eq!(
            processed,
            Processed::ReplyAppended {
                session_id: "chat-juan_a1b2c3".into()
            }
        );
    }

    #[tokio::test]
    async fn uncorrelatable_reply_is_an_error() {
        let store = test_store().await;
        let correlator = ReplyCorrelator::new(store.clone());

        let notice = notice_message(800, "free-form operator chatter");
        let update = message_update("who is this for?", Some(notice));

        let err = correlator.process_update(&update).await.unwrap_err();
        assert!(matches!(err, Error::CorrelationNotFound));
    }

    #[tokio::test]
    async fn plain_chat_message_is_ignored() {
        let store = test_store().await;
        let correlator = ReplyCorrelator::new(store.clone());

        let update = message_update("just chatting in the operator channel", None);
        let processed = correlator.process_update(&update).await.unwrap();
        assert_eq!(processed, Processed::Ignored);
    }
}
