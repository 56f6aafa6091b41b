use serde::{Deserialize, Serialize};

/// Error body returned by a PostgREST-style backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// One-line summary suitable for logs.
    pub fn summary(&self) -> String {
        match (&self.code, &self.details) {
            (Some(code), Some(details)) => format!("{code}: {} ({details})", self.message),
            (Some(code), None) => format!("{code}: {}", self.message),
            (None, Some(details)) => format!("{} ({details})", self.message),
            (None, None) => self.message.clone(),
        }
    }
}
