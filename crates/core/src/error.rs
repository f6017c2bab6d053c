/// Result alias that carries the custom [`DanceError`] type.
pub type Result<T> = std::result::Result<T, DanceError>;

/// Common error type for the core crate.
///
/// Unknown style ids, malformed client messages and mismatched keypoint sets are
/// not errors: they degrade to a default, a no-op or a zero score. Only the
/// variants below ever reach a caller.
#[derive(Debug, thiserror::Error)]
pub enum DanceError {
    /// Free-form failure, also used for poisoned locks.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON in a config file or a request body.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// A referenced model or music file does not exist. Surfaced to HTTP
    /// callers as a 404.
    #[error("{kind} `{id}` not found")]
    AssetMissing { kind: &'static str, id: String },
    /// A loaded configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The remote end of a viewer connection went away.
    #[error("peer disconnected")]
    Disconnected,
}

impl DanceError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn asset_missing(kind: &'static str, id: impl Into<String>) -> Self {
        Self::AssetMissing {
            kind,
            id: id.into(),
        }
    }

    /// True for the variant HTTP handlers should map to "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::AssetMissing { .. })
    }
}

impl From<&str> for DanceError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for DanceError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
