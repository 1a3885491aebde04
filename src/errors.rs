use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    /// Credential missing or rejected. Fatal for the session: the caller
    /// wipes local credentials and sends the user back to log in.
    #[error("unauthorized")]
    Unauthorized,

    #[error("transport error: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("push channel error: {0}")]
    Channel(String),

    #[error("credential store error: {0}")]
    Credentials(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl NotifyError {
    pub fn transport(message: impl Into<String>) -> Self {
        NotifyError::Transport {
            status: None,
            message: message.into(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, NotifyError::Unauthorized)
    }

    /// Alert text shown to the user. Channel failures are never surfaced
    /// this way; they degrade to fetch-only mode and are logged.
    pub fn user_message(&self) -> String {
        match self {
            NotifyError::Unauthorized => "Your session has expired. Please log in again.".to_string(),
            NotifyError::Transport { status: Some(status), message } => {
                format!("Request failed ({}): {}", status, message)
            }
            NotifyError::Transport { status: None, .. } => {
                "Network error. Please try again.".to_string()
            }
            NotifyError::Channel(_) => "Live updates are unavailable.".to_string(),
            NotifyError::Credentials(e) => format!("Could not access saved credentials: {}", e),
            NotifyError::InvalidInput(e) => e.clone(),
            NotifyError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                "Something went wrong.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        if e.status() == Some(reqwest::StatusCode::UNAUTHORIZED) {
            return NotifyError::Unauthorized;
        }
        NotifyError::Transport {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for NotifyError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        NotifyError::Channel(e.to_string())
    }
}

pub type Result<T, E = NotifyError> = std::result::Result<T, E>;
