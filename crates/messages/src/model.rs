use serde::{Deserialize, Serialize};

/// Who produced a logged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    /// Typed by the website visitor.
    Visitor,
    /// A reply relayed from the operator channel, automated or human.
    ChannelReply,
    /// Generated by the system itself (e.g. a name declaration).
    SystemNotice,
}

impl MessageKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visitor => "visitor",
            Self::ChannelReply => "channel-reply",
            Self::SystemNotice => "system-notice",
        }
    }

    /// Parse the stored column value. Returns `None` for anything outside
    /// the closed set, so old rows with unknown kinds surface as errors at
    /// the read site instead of leaking through.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "visitor" => Some(Self::Visitor),
            "channel-reply" => Some(Self::ChannelReply),
            "system-notice" => Some(Self::SystemNotice),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Privacy-safe sender metadata stored alongside a visitor message.
///
/// The origin address is hashed before it gets here; the raw address is
/// never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SenderMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Sender metadata as collected at the HTTP edge, raw address included.
#[derive(Debug, Clone, Default)]
pub struct NewSender {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub page: Option<String>,
    pub name: Option<String>,
}

/// A message to append to the log.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub session_id: String,
    pub body: String,
    pub kind: MessageKind,
    pub correlation_id: Option<i64>,
    pub sender: Option<NewSender>,
}

/// A logged message.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: i64,
    pub session_id: String,
    pub body: String,
    pub kind: MessageKind,
    pub sender: Option<SenderMeta>,
    pub correlation_id: Option<i64>,
    /// Unix seconds.
    pub created_at: i64,
}
