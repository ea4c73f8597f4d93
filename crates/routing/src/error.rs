use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad input shape or content; the visitor can correct and retry.
    #[error("{reason}")]
    Validation { reason: String },

    /// Too many messages in the current window.
    #[error("rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The operator channel is unreachable, misconfigured, or errored.
    #[error("operator channel failed: {message}")]
    Channel { message: String },

    /// The conversation log could not be read or written.
    #[error(transparent)]
    Storage(#[from] chatrelay_messages::Error),
}

impl Error {
    #[must_use]
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
