/// Convenience result type used across animpace.
pub type AnimpaceResult<T> = Result<T, AnimpaceError>;

/// Top-level error taxonomy used by the coordination and rendering APIs.
#[derive(thiserror::Error, Debug)]
pub enum AnimpaceError {
    /// The animation source could not be read.
    #[error("source access error: {0}")]
    SourceAccess(String),

    /// The decoding library returned no usable animation.
    #[error("decode error: {0}")]
    Decode(String),

    /// A zero-area target size was requested for rendering.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A single frame render did not produce pixels.
    #[error("render error: {0}")]
    Render(String),

    /// Invalid user-provided options or values.
    #[error("validation error: {0}")]
    Validation(String),

    /// Construction/teardown ordering was violated.
    #[error("lifecycle error: {0}")]
    Lifecycle(String),

    /// Pixel memory could not be reserved.
    #[error("allocation failed: {0}")]
    Allocation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AnimpaceError {
    /// Build a [`AnimpaceError::SourceAccess`] value.
    pub fn source_access(msg: impl Into<String>) -> Self {
        Self::SourceAccess(msg.into())
    }

    /// Build a [`AnimpaceError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`AnimpaceError::InvalidGeometry`] value.
    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    /// Build a [`AnimpaceError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`AnimpaceError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`AnimpaceError::Lifecycle`] value.
    pub fn lifecycle(msg: impl Into<String>) -> Self {
        Self::Lifecycle(msg.into())
    }

    /// Build a [`AnimpaceError::Allocation`] value.
    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation(msg.into())
    }

    /// Errors that surface to an item owner as an error notification.
    pub fn is_load_failure(&self) -> bool {
        matches!(self, Self::SourceAccess(_) | Self::Decode(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
