/// Convenience result type used across livecanvas.
pub type LiveCanvasResult<T> = Result<T, LiveCanvasError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum LiveCanvasError {
    /// Invalid user-provided data (duplicate registrations, bad parameters).
    #[error("validation error: {0}")]
    Validation(String),

    /// A data source's fetch implementation failed or panicked.
    #[error("fetch failure in source '{source_name}': {message}")]
    FetchFailure {
        /// Name of the failing data source.
        source_name: String,
        /// Rendered error chain.
        message: String,
    },

    /// A renderer's data-changed or render step failed.
    #[error("recompute failure in renderer '{renderer}': {message}")]
    RecomputeFailure {
        /// Name of the failing renderer.
        renderer: String,
        /// Rendered error chain.
        message: String,
    },

    /// The trajectory type does not define the requested operation.
    #[error("unsupported trajectory operation: {0}")]
    UnsupportedTrajectoryOperation(String),

    /// A renderer subscribes to a source that is not registered.
    #[error("renderer '{renderer}' subscribes to unknown source '{source_name}'")]
    MalformedSubscription {
        /// Subscribing renderer.
        renderer: String,
        /// Missing source name.
        source_name: String,
    },

    /// A style key outside the recognized drawing-state attributes.
    #[error("malformed style key: {0}")]
    MalformedStyleKey(String),

    /// A node handle that is stale or was never issued by this scene.
    #[error("unknown scene node: {0}")]
    UnknownNode(String),

    /// The drawing-surface transport rejected a call.
    #[error("transport error: {0}")]
    Transport(String),

    /// Invalid engine configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LiveCanvasError {
    /// Build a [`LiveCanvasError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`LiveCanvasError::FetchFailure`] value.
    pub fn fetch(source: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::FetchFailure {
            source_name: source.into(),
            message: msg.into(),
        }
    }

    /// Build a [`LiveCanvasError::RecomputeFailure`] value.
    pub fn recompute(renderer: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::RecomputeFailure {
            renderer: renderer.into(),
            message: msg.into(),
        }
    }

    /// Build a [`LiveCanvasError::UnsupportedTrajectoryOperation`] value.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedTrajectoryOperation(msg.into())
    }

    /// Build a [`LiveCanvasError::MalformedStyleKey`] value.
    pub fn style_key(key: impl Into<String>) -> Self {
        Self::MalformedStyleKey(key.into())
    }

    /// Build a [`LiveCanvasError::Transport`] value.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Build a [`LiveCanvasError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn poisoned(what: &str) -> Self {
        Self::Other(anyhow::anyhow!("{what} lock poisoned"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
