use {async_trait::async_trait, serde::Serialize};

/// Payload posted to the automation endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AutomationRequest {
    pub message: String,
    pub session_id: String,
    /// Visitor display name.
    pub visitor: String,
    /// Site the message came from.
    pub site: String,
    /// Human-readable timestamp (`YYYY-MM-DD HH:MM:SS`).
    pub timestamp: String,
}

/// Notice relayed to the human operator channel.
#[derive(Debug, Clone)]
pub struct VisitorNotice {
    pub session_id: String,
    pub visitor: String,
    pub site: String,
    pub page: Option<String>,
    pub message: String,
    pub timestamp: String,
}

/// An endpoint that may produce an automated answer to a visitor message.
#[async_trait]
pub trait AutomationChannel: Send + Sync {
    /// Ask for an automated answer. `Ok(None)` means the endpoint had
    /// nothing to say; errors and empty answers alike trigger the
    /// operator fallback upstream.
    async fn answer(&self, request: &AutomationRequest) -> anyhow::Result<Option<String>>;
}

/// A messaging channel that relays notices to a human operator.
#[async_trait]
pub trait OperatorChannel: Send + Sync {
    /// Deliver a formatted notice; returns the channel-assigned message id
    /// used later to correlate replies.
    async fn notify(&self, notice: &VisitorNotice) -> anyhow::Result<i64>;
}
