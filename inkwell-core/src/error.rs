use inkwell_config::ConfigError;
use thiserror::Error;

use crate::dom::{DomError, SelectorError};
use crate::probe::ProbeError;

/// Errors raised while building a loader or wiring it to a page.
///
/// Per-element load failures never surface here; they settle the element
/// instead.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Selector error: {0}")]
    Selector(#[from] SelectorError),

    #[error("Probe setup error: {0}")]
    Probe(#[from] ProbeError),

    #[error("Document error: {0}")]
    Dom(#[from] DomError),
}

pub type Result<T> = std::result::Result<T, LoaderError>;
