use inkwell_model::ModelError;
use thiserror::Error;

/// Validation failures for an otherwise well-formed configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("threshold must be within 0.0..=1.0, got {0}")]
    InvalidThreshold(f32),

    #[error("at least one image selector is required")]
    NoSelectors,

    #[error("selector entries must not be blank")]
    BlankSelector,

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("fallback image for `{0}` has an empty URL")]
    EmptyFallbackUrl(String),

    #[error("http probe timeout must be greater than zero")]
    ZeroHttpTimeout,
}
