/// Result alias that carries the custom [`HostError`] type.
pub type Result<T> = std::result::Result<T, HostError>;

/// Common error type for the core crate.
///
/// Tick values below the floor are not represented here: the tick setters
/// reject them silently and only report acceptance as a `bool`.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Required process configuration is missing or malformed. Fatal at
    /// startup.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The plugin loader could not resolve the requested name.
    #[error("plugin `{0}` could not be resolved")]
    PluginNotFound(String),
    /// The plugin's own initializer failed.
    #[error("plugin `{id}` failed to initialise: {reason}")]
    PluginInit { id: String, reason: String },
    /// Transport or addressing failure reported by the display driver.
    #[error("display error: {0}")]
    Display(String),
    /// The outward broadcast sink could not deliver an announcement.
    #[error("broadcast error: {0}")]
    Broadcast(String),
    /// Free-form message, mostly raised by plugins.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON encoding and decoding errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl HostError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Configuration(msg.into())
    }
}

impl From<&str> for HostError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for HostError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
