use {
    async_trait::async_trait,
    secrecy::ExposeSecret,
    teloxide::{prelude::*, types::ChatId},
    tracing::info,
};

use {
    chatrelay_channels::{OperatorChannel, VisitorNotice},
    chatrelay_config::TelegramConfig,
};

use crate::{REPLY_COMMAND, SESSION_MARKER};

/// Sends visitor notices to the configured operator chat.
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramNotifier {
    /// Build from config; `None` when no bot token / chat id is set.
    pub fn from_config(config: &TelegramConfig) -> anyhow::Result<Option<Self>> {
        if !config.is_configured() {
            return Ok(None);
        }
        let chat_id = ChatId(
            config
                .chat_id
                .parse::<i64>()
                .map_err(|_| anyhow::anyhow!("telegram chat_id must be numeric"))?,
        );
        let client = teloxide::net::default_reqwest_settings()
            .timeout(config.timeout())
            .build()?;
        let bot = Bot::with_client(config.bot_token.expose_secret(), client);
        Ok(Some(Self { bot, chat_id }))
    }
}

/// Render the operator-facing notice. The `Session: ` line is load-bearing:
/// the reply correlator parses the identifier back out of quoted notices.
pub fn format_notice(notice: &VisitorNotice) -> String {
    let page = notice.page.as_deref().unwrap_or("unknown page");
    format!(
        "New message from {site}\n\n\
         Name: {visitor}\n\
         {SESSION_MARKER}{session_id}\n\
         Page: {page}\n\n\
         Message: {message}\n\
         Time: {timestamp}\n\n\
         Reply to this message, or use {REPLY_COMMAND} {session_id} <text>",
        site = notice.site,
        visitor = notice.visitor,
        session_id = notice.session_id,
        message = notice.message,
        timestamp = notice.timestamp,
    )
}

#[async_trait]
impl OperatorChannel for TelegramNotifier {
    async fn notify(&self, notice: &VisitorNotice) -> anyhow::Result<i64> {
        let text = format_notice(notice);
        let message = self.bot.send_message(self.chat_id, text).await?;
        info!(
            session_id = %notice.session_id,
            telegram_message_id = message.id.0,
            "operator notice sent"
        );
        Ok(i64::from(message.id.0))
    }
}
