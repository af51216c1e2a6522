/// Result alias that carries the custom [`EngineError`] type.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Free-form error raised by collaborators such as the command line driver.
    #[error("{0}")]
    Message(String),
    /// A parameter was constructed with configuration that breaks its invariants.
    #[error("invalid parameter `{id}`: {reason}")]
    InvalidParameter { id: String, reason: String },
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Persisted state could not be encoded or decoded.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub(crate) fn invalid(id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}
