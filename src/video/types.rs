use std::fmt;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{ImageBuffer, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::video::probe::{self, MediaInfo};

/// A single decoded RGB video frame
///
/// Thin wrapper around an RGB image buffer; the normalizer, sequencer and
/// encoder all pass frames around by value.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame from an RGB image buffer
    pub fn new(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with black
    pub fn new_black(width: u32, height: u32) -> Self {
        Self { buffer: ImageBuffer::new(width, height) }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_pixel(width, height, Rgb(color));
        Self { buffer }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// Get a pixel at the given coordinates (returns RGB array)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }

    /// Set a pixel at the given coordinates
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        self.buffer.put_pixel(x, y, Rgb(color));
    }

    /// Get the underlying image buffer
    pub fn as_image(&self) -> &RgbImage {
        &self.buffer
    }

    /// Packed rgb24 bytes, row-major, as ffmpeg's rawvideo expects
    pub fn as_rgb_bytes(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    /// Create a frame from packed rgb24 bytes
    pub fn from_rgb_bytes(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { buffer })
    }
}

/// x264 speed/quality trade-off
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EncoderPreset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    #[default]
    Medium,
    Slow,
    Slower,
    Veryslow,
}

impl EncoderPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ultrafast => "ultrafast",
            Self::Superfast => "superfast",
            Self::Veryfast => "veryfast",
            Self::Faster => "faster",
            Self::Fast => "fast",
            Self::Medium => "medium",
            Self::Slow => "slow",
            Self::Slower => "slower",
            Self::Veryslow => "veryslow",
        }
    }
}

impl fmt::Display for EncoderPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resampling filter used when scaling frames onto the canvas
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Output canvas and encoder parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputParams {
    /// Canvas width in pixels
    pub width: u32,

    /// Canvas height in pixels
    pub height: u32,

    /// Output frame rate; every segment is resampled to it
    pub fps: u32,

    /// ffmpeg video encoder
    pub video_codec: String,

    /// ffmpeg audio encoder
    pub audio_codec: String,

    /// Encoder speed/quality preset
    pub preset: EncoderPreset,

    /// Constant rate factor (0-51, lower is better)
    pub crf: u8,

    /// Audio bitrate passed to the audio encoder
    pub audio_bitrate: String,

    /// Filter used to scale frames onto the canvas
    pub resize_filter: ResizeFilter,

    /// Where the final file is created (system temp dir when unset)
    pub temp_dir: Option<PathBuf>,
}

impl Default for OutputParams {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 24,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: EncoderPreset::Medium,
            crf: 23,
            audio_bitrate: "192k".to_string(),
            resize_filter: ResizeFilter::Lanczos3,
            temp_dir: None,
        }
    }
}

impl OutputParams {
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Seconds covered by `frames` output frames
    pub fn frames_to_seconds(&self, frames: u64) -> f64 {
        frames as f64 / self.fps as f64
    }

    pub fn validate(&self) -> Result<()> {
        // yuv420p needs even dimensions
        if self.width == 0 || self.height == 0 || self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(ConfigError::InvalidValue {
                key: "output.resolution".to_string(),
                value: format!("{}x{}", self.width, self.height),
            }.into());
        }

        if self.fps == 0 {
            return Err(ConfigError::InvalidValue {
                key: "output.fps".to_string(),
                value: self.fps.to_string(),
            }.into());
        }

        if self.crf > 51 {
            return Err(ConfigError::InvalidValue {
                key: "output.crf".to_string(),
                value: self.crf.to_string(),
            }.into());
        }

        if self.video_codec.is_empty() || self.audio_codec.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "output.codec".to_string(),
                value: format!("{}/{}", self.video_codec, self.audio_codec),
            }.into());
        }

        Ok(())
    }
}

/// Position of a segment in the fixed intro/generated/outro order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentRole {
    Intro,
    Generated,
    Outro,
}

impl SegmentRole {
    pub const ORDER: [SegmentRole; 3] = [Self::Intro, Self::Generated, Self::Outro];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intro => "intro",
            Self::Generated => "generated",
            Self::Outro => "outro",
        }
    }
}

impl fmt::Display for SegmentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A probed media file
///
/// Opening a clip only reads its metadata; decoding happens through
/// [`ClipDecoder`](crate::video::ClipDecoder) handles which own the decoder
/// process and must be released.
#[derive(Debug, Clone)]
pub struct MediaClip {
    path: PathBuf,
    info: MediaInfo,
}

impl MediaClip {
    /// Probe `path` with ffprobe
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let info = probe::probe(path)?;
        Ok(Self { path: path.to_path_buf(), info })
    }

    pub fn from_parts(path: PathBuf, info: MediaInfo) -> Self {
        Self { path, info }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self) -> &MediaInfo {
        &self.info
    }

    pub fn duration(&self) -> f64 {
        self.info.duration
    }

    pub fn has_audio(&self) -> bool {
        self.info.has_audio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_bytes_roundtrip() {
        let mut frame = Frame::new_black(4, 2);
        frame.set_pixel(3, 1, [10, 20, 30]);

        let bytes = frame.as_rgb_bytes().to_vec();
        assert_eq!(bytes.len(), 4 * 2 * 3);

        let restored = Frame::from_rgb_bytes(4, 2, bytes).unwrap();
        assert_eq!(restored.get_pixel(3, 1), [10, 20, 30]);
        assert!(Frame::from_rgb_bytes(4, 2, vec![0; 5]).is_none());
    }

    #[test]
    fn test_default_output_params() {
        let params = OutputParams::default();
        assert_eq!(params.resolution(), (1080, 1920));
        assert_eq!(params.preset.as_str(), "medium");
        assert!((params.frames_to_seconds(48) - 2.0).abs() < 1e-9);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_segment_order() {
        let names: Vec<&str> = SegmentRole::ORDER.iter().map(|r| r.as_str()).collect();
        assert_eq!(names, vec!["intro", "generated", "outro"]);
    }
}
