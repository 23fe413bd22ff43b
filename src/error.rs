use thiserror::Error;

pub type Result<T> = std::result::Result<T, SubmissionError>;

/// The two kinds of failure a caller has to tell apart.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// Rejected before any request was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Anything that went wrong while talking to the master.
    #[error("submission request failed: {0}")]
    RequestFailed(#[from] RequestFailure),
}

impl SubmissionError {
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    pub fn is_request_failed(&self) -> bool {
        matches!(self, Self::RequestFailed(_))
    }
}

#[derive(Debug, Error)]
pub enum RequestFailure {
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("received empty response body")]
    EmptyBody,

    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The master answered but reported failure, or broke its own contract.
    #[error("{0}")]
    Rejected(String),
}

impl From<reqwest::Error> for RequestFailure {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}
