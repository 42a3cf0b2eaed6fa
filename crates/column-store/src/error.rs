use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("transport error: {}", .message.as_deref().unwrap_or("request failed"))]
    Transport {
        status: Option<u16>,
        message: Option<String>,
    },

    #[error("{0}")]
    Validation(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Transport {
            status: e.status().map(|s| s.as_u16()),
            message: Some(e.to_string()),
        }
    }
}

impl AppError {
    pub fn transport(message: impl Into<String>) -> Self {
        AppError::Transport {
            status: None,
            message: Some(message.into()),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Transport { .. } => "TRANSPORT",
            AppError::Validation(_) => "VALIDATION",
            AppError::InvalidRequest(_) => "INVALID_REQUEST",
            AppError::Io(_) => "IO_ERROR",
            AppError::Json(_) => "JSON_ERROR",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    /// Message shown in an `Error` snapshot. A transport failure without a
    /// readable reason yields `None`.
    pub fn message(&self) -> Option<String> {
        match self {
            AppError::Transport { message, .. } => message.clone(),
            other => Some(other.to_string()),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
