//! Out-of-band image probes.
//!
//! A probe fetches and decodes an image without touching any element, so a
//! failed load never shows a broken image. The loader only learns whether
//! the source is usable.

use thiserror::Error;

pub mod http;

pub use http::HttpImageProbe;

/// Errors that can occur while probing an image source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {url}")]
    Status { status: u16, url: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unsupported image URL: {0}")]
    UnsupportedUrl(String),

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, ProbeError>;

/// Facts learned from a successful probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProbedImage {
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
}

/// Trait for checking that an image source can be loaded.
#[async_trait::async_trait]
pub trait ImageProbe: Send + Sync {
    /// Fetch and decode `url`.
    async fn probe(&self, url: &str) -> Result<ProbedImage>;

    /// Check if a URL is supported by this probe
    fn supports_url(&self, url: &str) -> bool;
}
