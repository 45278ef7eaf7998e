//! # Greeting-Compositor
//!
//! Bracket an AI-generated clip with a fixed intro and outro, fit background
//! music to the result and export a portrait 1080×1920 H.264/AAC greeting video.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use greeting_compositor::{composition::CompositionEngine, config::Config};
//!
//! # fn main() -> anyhow::Result<()> {
//! let engine = CompositionEngine::new(Config::default());
//! let video = engine.compose("generated.mp4")?;
//!
//! println!("Greeting ready at {:?} ({:.1}s)", video.path, video.duration);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - [`video`] - Probing, decoding, pad-to-fit normalization, sequencing and encoding
//! - [`audio`] - Background music loading and duration fitting
//! - [`composition`] - Main composition engine
//! - [`workflow`] - Upload → confirmation → composition state machine
//! - [`fetch`] - Download of generated clips
//! - [`config`] - Configuration management
//!
//! All container work goes through `ffmpeg` and `ffprobe`, which must be on `PATH`.

pub mod audio;
pub mod composition;
pub mod config;
pub mod error;
pub mod fetch;
pub mod video;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export commonly used types for convenience
pub use crate::{
    composition::{ComposedVideo, CompositionEngine, CompositionSpec},
    config::Config,
    error::{CompositorError, Result},
    workflow::{Workflow, WorkflowState},
};
