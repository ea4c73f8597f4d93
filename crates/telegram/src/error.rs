use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),

    #[error(transparent)]
    Storage(#[from] chatrelay_messages::Error),

    #[error("malformed reply command: {reason}")]
    MalformedCommand { reason: String },

    #[error("no session could be correlated from the inbound event")]
    CorrelationNotFound,

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedCommand {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
