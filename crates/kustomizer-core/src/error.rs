//! Error taxonomy shared by every component.
//!
//! Each class maps to one failure mode a host has to handle differently:
//! configuration problems are fatal to a viewer instance, asset load failures
//! are recoverable and leave the previous visual state in place, validation
//! failures are rejected before any scene mutation, and capture failures never
//! produce a partial snapshot.

use thiserror::Error;

/// Problems detected while constructing a viewer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("container element `{0}` not found")]
    MissingContainer(String),
    #[error("container `{0}` already hosts a viewer")]
    ContainerInUse(String),
    #[error("missing capability: {0}")]
    MissingCapability(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A mesh, texture, vector or font source could not be fetched or decoded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssetLoadError {
    #[error("failed to fetch `{uri}`: {reason}")]
    Fetch { uri: String, reason: String },
    #[error("malformed data URI: {0}")]
    DataUri(String),
    #[error("malformed mesh: {0}")]
    Mesh(String),
    #[error("image decode failed: {0}")]
    Image(String),
    #[error("vector graphic rejected: {0}")]
    Vector(String),
    #[error("font unavailable: {0}")]
    Font(String),
    #[error("render backend rejected asset: {0}")]
    Backend(String),
}

/// Which optional capability a validation failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Text,
    Graphics,
    TextureUpload,
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Feature::Text => f.write_str("text"),
            Feature::Graphics => f.write_str("graphics"),
            Feature::TextureUpload => f.write_str("texture upload"),
        }
    }
}

/// Input rejected before touching scene or state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("text is {len} characters, maximum is {max}")]
    TextTooLong { len: usize, max: usize },
    #[error("text is empty")]
    EmptyText,
    #[error("font `{0}` is not available")]
    UnknownFont(String),
    #[error("{0} customization is disabled")]
    FeatureDisabled(Feature),
    #[error("`{field}` must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f32,
    },
}

/// Layout generation failed; nothing was stored.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    #[error("viewer has been disposed")]
    Disposed,
    #[error("base model is not loaded yet")]
    ModelNotReady,
    #[error("frame capture failed: {0}")]
    Render(String),
}

/// Failure reported by a [`crate::scene::RenderBackend`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("unknown {0} handle")]
    UnknownHandle(&'static str),
    #[error("surface unavailable: {0}")]
    Surface(String),
    #[error("{0}")]
    Backend(String),
}

impl From<RenderError> for AssetLoadError {
    fn from(e: RenderError) -> Self {
        AssetLoadError::Backend(e.to_string())
    }
}

impl From<RenderError> for CaptureError {
    fn from(e: RenderError) -> Self {
        CaptureError::Render(e.to_string())
    }
}

/// Umbrella error returned by the customization store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KustomizerError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    AssetLoad(#[from] AssetLoadError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

impl KustomizerError {
    /// Stable class name handed to hosts (`"ValidationError"`, ...).
    pub fn kind(&self) -> &'static str {
        match self {
            KustomizerError::Configuration(_) => "ConfigurationError",
            KustomizerError::AssetLoad(_) => "AssetLoadError",
            KustomizerError::Validation(_) => "ValidationError",
            KustomizerError::Capture(_) => "CaptureError",
        }
    }
}
