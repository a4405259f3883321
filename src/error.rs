//! Error types for the client.

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GenAiError {
    /// Raised while building a request, before anything touches the network.
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    #[error("Transport error (status {status}): {message}")]
    Transport { status: u16, message: String },

    #[error("Stream decode error: {message}")]
    StreamDecode { message: String },

    #[error("Stream already closed")]
    StreamClosed,

    #[error("Replay error: {message}")]
    Replay { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl GenAiError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
            field: None,
        }
    }

    /// A field that the selected backend cannot carry.
    pub fn unsupported_field(field: &str, backend: impl std::fmt::Display) -> Self {
        Self::Configuration {
            message: format!("{field} parameter is not supported in {backend}"),
            field: Some(field.to_string()),
        }
    }

    pub fn transport(status: u16, msg: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: msg.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::StreamDecode {
            message: msg.into(),
        }
    }

    pub fn replay(msg: impl Into<String>) -> Self {
        Self::Replay {
            message: msg.into(),
        }
    }

    /// The offending field, for configuration errors that name one.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Configuration { field, .. } => field.as_deref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

pub type Result<T> = std::result::Result<T, GenAiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_field_names_field() {
        let err = GenAiError::unsupported_field("routingConfig", "Gemini Developer API");
        assert!(err.is_configuration());
        assert_eq!(err.field(), Some("routingConfig"));
        assert_eq!(
            err.to_string(),
            "Configuration error: routingConfig parameter is not supported in Gemini Developer API"
        );
    }

    #[test]
    fn test_transport_display() {
        let err = GenAiError::transport(404, "model not found");
        assert_eq!(err.to_string(), "Transport error (status 404): model not found");
        assert_eq!(err.field(), None);
    }
}
