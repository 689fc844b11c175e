use shared::error::ApiError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },
    #[error("session expired: {0}")]
    AuthExpired(String),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("page {requested} is outside 1..={last}")]
    PageOutOfRange { requested: u32, last: u32 },
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("credential store failure: {0}")]
    Credentials(String),
    #[error("invalid settings: {0}")]
    Settings(String),
}

impl ClientError {
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<ApiError> for ClientError {
    fn from(value: ApiError) -> Self {
        Self::Api {
            status: value.status,
            message: value.message,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode(value.to_string())
        } else {
            Self::Network(value.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
