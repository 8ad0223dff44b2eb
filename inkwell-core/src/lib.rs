//! Inkwell core: lazy image loading for the blog front end.
//!
//! The [`controller`] module holds the image load controller. [`dom`] and
//! [`visibility`] provide the document and viewport it observes, [`probe`]
//! checks image sources out of band, and [`render`] / [`filter`] are the
//! article grid glue that feeds it.
#![allow(missing_docs)]

pub mod controller;
pub mod dom;
pub mod error;
pub mod filter;
pub mod probe;
pub mod render;
pub mod slot;
pub mod visibility;

pub use controller::{
    ElementState, ImageLoadController, LoadOutcome, LoaderOptions, OnLoad,
    Settlement,
};
pub use dom::{Document, ElementSpec, Page, SelectorList, SharedPage};
pub use error::LoaderError;
pub use filter::{CategoryFilter, FilterSummary, SortOrder};
pub use probe::{HttpImageProbe, ImageProbe, ProbeError, ProbedImage};
pub use render::{ArticleGrid, BlogView, GridLayout};
pub use slot::LoaderSlot;
pub use visibility::{IntersectionEntry, ViewportSession};
