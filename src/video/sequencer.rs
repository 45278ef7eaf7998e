use tracing::{debug, info};

use crate::error::{Result, VideoError};
use crate::video::decoder::FrameSource;
use crate::video::normalizer::FrameNormalizer;
use crate::video::types::{Frame, SegmentRole};

/// Receives the concatenated, normalized frame stream
pub trait FrameSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;
}

impl FrameSink for Vec<Frame> {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.push(frame.clone());
        Ok(())
    }
}

/// One input of the concatenation
pub struct Segment<S> {
    pub role: SegmentRole,
    pub source: S,
}

impl<S> Segment<S> {
    pub fn new(role: SegmentRole, source: S) -> Self {
        Self { role, source }
    }
}

/// Frame span a segment occupies in the combined timeline
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSpan {
    pub role: SegmentRole,
    pub start_frame: u64,
    pub frames: u64,
}

/// The combined clip produced by concatenation
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    pub fps: u32,
    pub spans: Vec<SegmentSpan>,
}

impl Timeline {
    pub fn total_frames(&self) -> u64 {
        self.spans.iter().map(|s| s.frames).sum()
    }

    /// Total duration in seconds
    pub fn duration(&self) -> f64 {
        self.total_frames() as f64 / self.fps as f64
    }

    /// Duration of a single segment in seconds
    pub fn segment_duration(&self, role: SegmentRole) -> f64 {
        self.spans
            .iter()
            .find(|s| s.role == role)
            .map(|s| s.frames as f64 / self.fps as f64)
            .unwrap_or(0.0)
    }
}

/// Hard-cut concatenation of intro, generated and outro segments
///
/// Every frame is decoded to raw pixels and normalized before it reaches the
/// sink, so sources with different codecs, pixel formats and sizes join
/// cleanly.
pub struct Sequencer {
    normalizer: FrameNormalizer,
    fps: u32,
}

impl Sequencer {
    pub fn new(normalizer: FrameNormalizer, fps: u32) -> Self {
        Self { normalizer, fps }
    }

    pub fn concatenate<S, K>(&self, segments: [Segment<S>; 3], sink: &mut K) -> Result<Timeline>
    where
        S: FrameSource,
        K: FrameSink,
    {
        let (target_width, target_height) = self.normalizer.target();
        let mut spans = Vec::with_capacity(segments.len());
        let mut start_frame = 0u64;

        // Remaining sources are dropped (and released) if a segment fails
        for Segment { role, mut source } in segments {
            debug!("Sequencing {} segment from frame {}", role, start_frame);
            let mut frames = 0u64;

            while let Some(frame) = source.next_frame()? {
                let frame = self.normalizer.normalize(frame);
                if frame.dimensions() != (target_width, target_height) {
                    return Err(VideoError::FrameSizeMismatch {
                        role: role.to_string(),
                        actual_width: frame.width(),
                        actual_height: frame.height(),
                        expected_width: target_width,
                        expected_height: target_height,
                    }.into());
                }
                sink.write_frame(&frame)?;
                frames += 1;
            }
            source.release()?;

            if frames == 0 {
                return Err(VideoError::EmptySegment { role: role.to_string() }.into());
            }

            info!("   {} segment: {} frames ({:.2}s)", role, frames, frames as f64 / self.fps as f64);
            spans.push(SegmentSpan { role, start_frame, frames });
            start_frame += frames;
        }

        Ok(Timeline { fps: self.fps, spans })
    }
}
