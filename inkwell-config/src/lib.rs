//! Configuration for the Inkwell lazy image loader.
//!
//! Settings are plain serde structs with defaults for every field, so a
//! config file only has to name what it changes. [`LazyImageConfig`] can be
//! read from an explicit path, an inline JSON environment variable, or one
//! of a few conventional file names; [`ConfigSource`] reports which one won.

pub mod error;
pub mod images;
pub mod util;

pub use error::ConfigError;
pub use images::{
    ConfigSource, HttpProbeConfig, LazyImageConfig, ObservationMode,
};
