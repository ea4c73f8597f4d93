use std::{sync::Arc, time::Duration};

use tracing::{info, warn};

use {
    chatrelay_channels::{AutomationChannel, AutomationRequest, OperatorChannel, VisitorNotice},
    chatrelay_config::ChatrelayConfig,
    chatrelay_messages::{MessageKind, MessageStore, NewMessage, NewSender},
    chatrelay_sessions::SessionContext,
};

use crate::{
    classify,
    error::{Error, Result},
    rate_limit::RateLimiter,
    sanitize,
};

/// Which channel ended up handling a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveredVia {
    Automation,
    Operator,
}

/// Transient routing result; only the appended messages persist.
#[derive(Debug, Clone, Copy)]
pub struct RoutingOutcome {
    pub delivered_via: DeliveredVia,
    pub automated: bool,
}

/// Typed routing settings, assembled once at startup.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub site_name: String,
    pub automation_enabled: bool,
    pub keywords: Vec<String>,
    pub automation_timeout: Duration,
    pub operator_timeout: Duration,
    pub max_message_len: usize,
}

impl EngineConfig {
    #[must_use]
    pub fn from_config(config: &ChatrelayConfig) -> Self {
        Self {
            site_name: config.site.name.clone(),
            automation_enabled: config.automation.enabled,
            keywords: config.automation.keywords.clone(),
            automation_timeout: config.automation.timeout(),
            operator_timeout: config.telegram.timeout(),
            max_message_len: config.limits.max_message_len,
        }
    }
}

/// Decides, per inbound visitor message, between the automation endpoint
/// and the human operator channel, and owns the fallback between them.
pub struct RoutingEngine {
    config: EngineConfig,
    store: Arc<dyn MessageStore>,
    limiter: RateLimiter,
    automation: Arc<dyn AutomationChannel>,
    operator: Option<Arc<dyn OperatorChannel>>,
}

impl RoutingEngine {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn MessageStore>,
        limiter: RateLimiter,
        automation: Arc<dyn AutomationChannel>,
        operator: Option<Arc<dyn OperatorChannel>>,
    ) -> Self {
        Self {
            config,
            store,
            limiter,
            automation,
            operator,
        }
    }

    /// Route one inbound visitor message.
    ///
    /// Exactly one of automation-success or operator-notification happens
    /// per message; automation failures degrade silently to the operator
    /// path.
    pub async fn handle_visitor_message(
        &self,
        ctx: &SessionContext,
        raw_text: &str,
        sender: NewSender,
    ) -> Result<RoutingOutcome> {
        let text = sanitize::clean_message(raw_text, self.config.max_message_len)
            .map_err(Error::validation)?;

        if !chatrelay_sessions::is_valid_session_id(&ctx.session_id) {
            return Err(Error::validation("invalid session id"));
        }

        let decision = self.limiter.check(&ctx.session_id);
        if !decision.allowed {
            info!(
                session_id = %ctx.session_id,
                reset_in_secs = decision.reset_in_secs,
                "message rejected by rate limit"
            );
            return Err(Error::RateLimited {
                retry_after_secs: decision.reset_in_secs,
            });
        }

        let page = sender.page.clone();
        let visitor_msg_id = self
            .store
            .append(NewMessage {
                session_id: ctx.session_id.clone(),
                body: text.clone(),
                kind: MessageKind::Visitor,
                correlation_id: None,
                sender: Some(sender),
            })
            .await?;

        if let Some(keyword) = self.eligible_keyword(&text) {
            info!(
                session_id = %ctx.session_id,
                keyword,
                "message qualifies for automation"
            );
            if let Some(reply) = self.try_automation(ctx, &text).await {
                self.store
                    .append(NewMessage {
                        session_id: ctx.session_id.clone(),
                        body: reply,
                        kind: MessageKind::ChannelReply,
                        correlation_id: None,
                        sender: None,
                    })
                    .await?;
                return Ok(RoutingOutcome {
                    delivered_via: DeliveredVia::Automation,
                    automated: true,
                });
            }
        }

        self.notify_operator(ctx, &text, page, visitor_msg_id).await?;
        Ok(RoutingOutcome {
            delivered_via: DeliveredVia::Operator,
            automated: false,
        })
    }

    fn eligible_keyword(&self, text: &str) -> Option<&str> {
        if !self.config.automation_enabled {
            return None;
        }
        classify::matching_keyword(&self.config.keywords, text)
    }

    /// Call the automation endpoint with a bounded timeout. Any failure —
    /// timeout, transport error, empty answer — is logged and reported as
    /// "no answer"; a late response from a timed-out call is dropped with
    /// its future.
    async fn try_automation(&self, ctx: &SessionContext, text: &str) -> Option<String> {
        let request = AutomationRequest {
            message: text.to_string(),
            session_id: ctx.session_id.clone(),
            visitor: ctx.display_name(),
            site: self.config.site_name.clone(),
            timestamp: now_timestamp(),
        };

        let call = self.automation.answer(&request);
        match tokio::time::timeout(self.config.automation_timeout, call).await {
            Ok(Ok(Some(reply))) if !reply.trim().is_empty() => Some(reply),
            Ok(Ok(_)) => {
                info!(session_id = %ctx.session_id, "automation had no answer, falling back");
                None
            },
            Ok(Err(e)) => {
                warn!(session_id = %ctx.session_id, error = %e, "automation failed, falling back");
                None
            },
            Err(_) => {
                warn!(
                    session_id = %ctx.session_id,
                    timeout_secs = self.config.automation_timeout.as_secs(),
                    "automation timed out, falling back"
                );
                None
            },
        }
    }

    async fn notify_operator(
        &self,
        ctx: &SessionContext,
        text: &str,
        page: Option<String>,
        visitor_msg_id: i64,
    ) -> Result<()> {
        let Some(operator) = self.operator.as_ref() else {
            return Err(Error::channel("operator channel not configured"));
        };

        let notice = VisitorNotice {
            session_id: ctx.session_id.clone(),
            visitor: ctx.display_name(),
            site: self.config.site_name.clone(),
            page,
            message: text.to_string(),
            timestamp: now_timestamp(),
        };

        let call = operator.notify(&notice);
        match tokio::time::timeout(self.config.operator_timeout, call).await {
            Ok(Ok(correlation_id)) => {
                if let Err(e) = self
                    .store
                    .attach_correlation(visitor_msg_id, correlation_id)
                    .await
                {
                    warn!(
                        session_id = %ctx.session_id,
                        correlation_id,
                        error = %e,
                        "failed to record correlation id"
                    );
                }
                info!(
                    session_id = %ctx.session_id,
                    correlation_id,
                    "visitor message relayed to operator"
                );
                Ok(())
            },
            Ok(Err(e)) => {
                warn!(session_id = %ctx.session_id, error = %e, "operator notification failed");
                Err(Error::channel(e.to_string()))
            },
            Err(_) => {
                warn!(
                    session_id = %ctx.session_id,
                    timeout_secs = self.config.operator_timeout.as_secs(),
                    "operator notification timed out"
                );
                Err(Error::channel("operator channel timed out"))
            },
        }
    }
}

fn now_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
