use thiserror::Error;

/// Errors produced by model parsers and validation routines.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid root margin `{0}`: {1}")]
    InvalidMargin(String, &'static str),

    #[error("content type must not be empty")]
    EmptyContentType,
}

pub type Result<T> = std::result::Result<T, ModelError>;
