use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("a non-empty name is required")]
    InvalidName,
}

pub type Result<T> = std::result::Result<T, Error>;
