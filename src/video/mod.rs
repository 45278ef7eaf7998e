//! # Video Processing Module
//!
//! Probing, frame decoding, pad-to-fit normalization, hard-cut sequencing and
//! H.264 export. Container work is delegated to `ffmpeg`/`ffprobe` child
//! processes; pixels are handled in memory as [`Frame`]s.

pub mod decoder;
pub mod encoder;
pub mod normalizer;
mod process;
pub mod probe;
pub mod sequencer;
pub mod types;

pub use decoder::{ClipDecoder, FrameSource};
pub use encoder::{mux_audio, VideoEncoder};
pub use normalizer::{FrameNormalizer, Placement};
pub use probe::MediaInfo;
pub use sequencer::{FrameSink, Segment, SegmentSpan, Sequencer, Timeline};
pub use types::{EncoderPreset, Frame, MediaClip, OutputParams, ResizeFilter, SegmentRole};
