use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid model: {0}")]
    InvalidModel(String),
    #[error("unknown state: {0}")]
    UnknownState(String),
    #[error("label path length {found} does not match sequence length {expected}")]
    LengthMismatch { expected: usize, found: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
