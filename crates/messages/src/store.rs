use std::time::{SystemTime, UNIX_EPOCH};

use {
    async_trait::async_trait,
    sha2::Digest,
    sqlx::SqlitePool,
};

use crate::{
    error::{Error, Result},
    model::{Message, MessageKind, NewMessage, SenderMeta},
};

/// Persistent conversation log.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append a message; returns its monotonic id.
    async fn append(&self, new: NewMessage) -> Result<i64>;

    /// Messages with `id > after_id` for a session, ascending, capped at
    /// `limit`. Empty is a valid result.
    async fn read_since(&self, session_id: &str, after_id: i64, limit: u32)
        -> Result<Vec<Message>>;

    /// Look a message up by the operator channel's correlation id.
    async fn find_by_correlation(&self, correlation_id: i64) -> Result<Option<Message>>;

    /// Record the channel-assigned notice id on an already-logged message.
    async fn attach_correlation(&self, message_id: i64, correlation_id: i64) -> Result<()>;

    /// Number of messages logged for a session.
    async fn count(&self, session_id: &str) -> Result<i64>;
}

/// SQLite-backed message store.
pub struct SqliteMessageStore {
    pool: SqlitePool,
    /// Salt mixed into the origin-address hash, so the same address hashes
    /// differently across deployments.
    privacy_salt: String,
}

impl SqliteMessageStore {
    pub fn new(pool: SqlitePool, privacy_salt: impl Into<String>) -> Self {
        Self {
            pool,
            privacy_salt: privacy_salt.into(),
        }
    }

    fn now_secs() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    /// SHA-256 of the origin address plus the deployment salt. Raw
    /// addresses never reach the database.
    fn hash_origin(&self, ip: &str) -> String {
        let mut hasher = sha2::Sha256::new();
        hasher.update(ip.as_bytes());
        hasher.update(self.privacy_salt.as_bytes());
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

type MessageRow = (i64, String, String, String, Option<String>, Option<i64>, i64);

fn row_to_message(row: MessageRow) -> Result<Message> {
    let (id, session_id, body, kind, sender, correlation_id, created_at) = row;
    let kind = MessageKind::parse(&kind)
        .ok_or_else(|| Error::validation(format!("unknown message kind: {kind}")))?;
    let sender = match sender {
        Some(json) => Some(serde_json::from_str::<SenderMeta>(&json)?),
        None => None,
    };
    Ok(Message {
        id,
        session_id,
        body,
        kind,
        sender,
        correlation_id,
        created_at,
    })
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn append(&self, new: NewMessage) -> Result<i64> {
        if new.session_id.trim().is_empty() {
            return Err(Error::validation("session id is required"));
        }
        if new.body.trim().is_empty() {
            return Err(Error::validation("message body is required"));
        }

        let sender_json = match new.sender {
            Some(raw) => {
                let meta = SenderMeta {
                    ip_hash: raw.ip.as_deref().map(|ip| self.hash_origin(ip)),
                    user_agent: raw.user_agent,
                    page: raw.page,
                    name: raw.name,
                };
                Some(serde_json::to_string(&meta)?)
            },
            None => None,
        };

        let result = sqlx::query(
            "INSERT INTO messages (session_id, body, kind, sender, correlation_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&new.session_id)
        .bind(&new.body)
        .bind(new.kind.as_str())
        .bind(&sender_json)
        .bind(new.correlation_id)
        .bind(Self::now_secs())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn read_since(
        &self,
        session_id: &str,
        after_id: i64,
        limit: u32,
    ) -> Result<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT id, session_id, body, kind, sender, correlation_id, created_at
             FROM messages
             WHERE session_id = ? AND id > ?
             ORDER BY id ASC
             LIMIT ?",
        )
        .bind(session_id)
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_message).collect()
    }

    async fn find_by_correlation(&self, correlation_id: i64) -> Result<Option<Message>> {
        let row = sqlx::query_as::<_, MessageRow>(
            "SELECT id, session_id, body, kind, sender, correlation_id, created_at
             FROM messages
             WHERE correlation_id = ?
             LIMIT 1",
        )
        .bind(correlation_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_message).transpose()
    }

    async fn attach_correlation(&self, message_id: i64, correlation_id: i64) -> Result<()> {
        sqlx::query("UPDATE messages SET correlation_id = ? WHERE id = ?")
            .bind(correlation_id)
            .bind(message_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count(&self, session_id: &str) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT count(*) FROM messages WHERE session_id = ?")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}
