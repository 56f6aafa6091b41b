use thiserror::Error;

/// Failure of a single facade call. Never retried.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid backend configuration: {0}")]
    Configuration(String),
    #[error("backend transport failure: {0}")]
    Transport(String),
    #[error("backend returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("failed to decode backend response: {0}")]
    Decode(String),
    #[error("failed to encode request body: {0}")]
    Encode(String),
    #[error("backend rejected {operation} on {table}: {reason}")]
    Rejected {
        operation: &'static str,
        table: String,
        reason: String,
    },
}

impl From<reqwest::Error> for BackendError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode(value.to_string())
        } else {
            Self::Transport(value.to_string())
        }
    }
}

/// Outcomes surfaced to the administrator. `Display` is the short message
/// shown to the user; backend detail stays in `source` and in the logs.
#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("Please fill in all fields and select at least one recipient")]
    IncompleteDraft,
    #[error("Please fill in all template fields")]
    IncompleteTemplate,
    #[error("Template not found")]
    TemplateNotFound,
    #[error("Failed to send message")]
    SendFailed(#[source] BackendError),
    #[error("Failed to save template")]
    SaveTemplateFailed(#[source] BackendError),
    #[error("Failed to delete template")]
    DeleteTemplateFailed(#[source] BackendError),
    #[error("Failed to load templates")]
    LoadTemplatesFailed(#[source] BackendError),
    #[error("Failed to load owners")]
    LoadRecipientsFailed(#[source] BackendError),
}

impl MessagingError {
    /// Local validation failures never reach the backend.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::IncompleteDraft | Self::IncompleteTemplate)
    }

    pub fn backend_cause(&self) -> Option<&BackendError> {
        match self {
            Self::SendFailed(cause)
            | Self::SaveTemplateFailed(cause)
            | Self::DeleteTemplateFailed(cause)
            | Self::LoadTemplatesFailed(cause)
            | Self::LoadRecipientsFailed(cause) => Some(cause),
            Self::IncompleteDraft | Self::IncompleteTemplate | Self::TemplateNotFound => None,
        }
    }
}
