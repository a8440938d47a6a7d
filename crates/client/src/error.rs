use convoq_core::ViewError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Service returned {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Malformed service response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    View(#[from] ViewError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Rejections of the deep-scan trigger are expected UI noise rather than
    /// failures worth a banner.
    pub fn is_not_eligible(&self) -> bool {
        matches!(self, Self::View(err) if err.is_not_eligible())
    }
}
