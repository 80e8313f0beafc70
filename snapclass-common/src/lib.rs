//! # SnapClass Common Library
//!
//! Shared code for the SnapClass image classification front-end:
//! - Bootstrap configuration loading and root folder resolution
//! - Content registry (label → curated texts, images, videos)
//! - Prediction result type and probability ranking
//! - YouTube link normalization

pub mod config;
pub mod content;
pub mod error;
pub mod prediction;
pub mod ranking;
pub mod youtube;

pub use content::{ContentEntry, ContentRegistry, ContentSet};
pub use error::{Error, Result};
pub use prediction::Prediction;
pub use ranking::RankedClass;
