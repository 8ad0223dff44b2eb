//! Core data model definitions shared across Inkwell crates.
#![allow(missing_docs)]

pub mod article;
pub mod catalog;
pub mod content_type;
pub mod error;
pub mod geometry;
pub mod ids;

pub use article::{Article, ArticleAuthor, ArticleTag, default_articles};
pub use catalog::{DEFAULT_PORTRAIT_URL, FallbackCatalog, FallbackLookup};
pub use content_type::ContentType;
pub use error::{ModelError, Result};
pub use geometry::{Rect, RootMargin};
pub use ids::ElementId;
