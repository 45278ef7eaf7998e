//! # Composition Engine
//!
//! The composition engine brackets a generated clip with the fixed intro and
//! outro, fits the soundtrack and exports the finished greeting video.

pub mod engine;
pub mod spec;

// Re-exports for convenience
pub use engine::{ComposedVideo, CompositionEngine};
pub use spec::CompositionSpec;
