/// Convenience result type used across the dispatcher.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Top-level error taxonomy for dispatch and its collaborators.
///
/// Every variant is reported before any kernel invocation happens; once workers start there is no
/// error path left.
#[derive(thiserror::Error, Debug)]
pub enum DispatchError {
    /// Neither an input nor an output buffer was bound to the launch.
    #[error("missing buffer: a forEach launch needs an input or an output buffer")]
    MissingBuffer,

    /// The kernel's declared signature does not match the bound buffers.
    #[error("signature mismatch: {0}")]
    SignatureMismatch(String),

    /// A script slot lookup failed.
    #[error("unknown {kind} slot {slot}")]
    UnknownSlot {
        /// Slot table that was searched ("kernel" or "invokable").
        kind: &'static str,
        /// Requested slot index.
        slot: usize,
    },

    /// Invalid caller-provided layout, view or option data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Worker pool construction failed.
    #[error("worker pool error: {0}")]
    Pool(String),

    /// Errors when serializing or deserializing configuration.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DispatchError {
    /// Build a [`DispatchError::SignatureMismatch`] value.
    pub fn signature(msg: impl Into<String>) -> Self {
        Self::SignatureMismatch(msg.into())
    }

    /// Build a [`DispatchError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`DispatchError::Pool`] value.
    pub fn pool(msg: impl Into<String>) -> Self {
        Self::Pool(msg.into())
    }

    /// Build a [`DispatchError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
