use std::fmt;

use tracing::{debug, info, warn};

use crate::audio::types::AudioTrack;
use crate::error::{AudioError, Result};
use crate::video::Timeline;

/// Which audio ended up on the composed video
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSource {
    /// No audio stream at all
    None,
    /// Fitted, attenuated background music
    Background,
    /// The segments' own audio, concatenated
    Source,
    /// Background music summed with the segments' audio
    Mixed,
}

impl fmt::Display for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AudioSource::None => "none",
            AudioSource::Background => "background",
            AudioSource::Source => "source",
            AudioSource::Mixed => "mixed",
        };
        f.write_str(name)
    }
}

/// Fits background music to the video length and decides what gets muxed
#[derive(Debug, Clone)]
pub struct AudioFitter {
    volume: f32,
    mix_source_audio: bool,
}

impl AudioFitter {
    pub fn new(volume: f32, mix_source_audio: bool) -> Self {
        Self { volume, mix_source_audio }
    }

    /// Loop or truncate `track` to exactly `duration` seconds, then attenuate
    pub fn fit(&self, track: &AudioTrack, duration: f64) -> Result<AudioTrack> {
        if track.frames() == 0 {
            return Err(AudioError::InvalidParameters {
                details: "background track has zero length".to_string(),
            }.into());
        }

        let wanted = track.frames_for(duration);
        let fitted = if track.frames() < wanted {
            debug!(
                "Looping {:.2}s background track {:.2} times",
                track.duration(),
                wanted as f64 / track.frames() as f64
            );
            track.looped(wanted)?
        } else {
            debug!("Truncating {:.2}s background track to {:.2}s", track.duration(), duration);
            track.truncated(wanted)
        };

        Ok(fitted.with_gain(self.volume))
    }

    /// Pick the final audio for a video of `duration` seconds
    ///
    /// `background` must already be in the same format as `source`.
    pub fn resolve(
        &self,
        background: Option<&AudioTrack>,
        source: Option<AudioTrack>,
        duration: f64,
    ) -> Result<(AudioSource, Option<AudioTrack>)> {
        let source = source.filter(|track| !track.is_silent());

        let Some(background) = background else {
            return Ok(match source {
                Some(track) => (AudioSource::Source, Some(track)),
                None => (AudioSource::None, None),
            });
        };

        let fitted = self.fit(background, duration)?;
        info!("   Background music fitted to {:.2}s at {:.0}% volume", fitted.duration(), self.volume * 100.0);

        match source {
            Some(source) if self.mix_source_audio => Ok((AudioSource::Mixed, Some(fitted.mix(&source)?))),
            Some(_) => {
                warn!("Clip audio is replaced by background music; set audio.mix_source_audio to keep both");
                Ok((AudioSource::Background, Some(fitted)))
            }
            None => Ok((AudioSource::Background, Some(fitted))),
        }
    }
}

/// Lay per-segment soundtracks end to end over their video spans
///
/// Each track is cut or padded with silence to its segment's duration; a
/// segment without audio contributes silence. `tracks` pairs up with
/// `timeline.spans` and must already be in the working format.
pub fn align_to_timeline(
    tracks: &[Option<AudioTrack>],
    timeline: &Timeline,
    sample_rate: u32,
    channels: u16,
) -> Result<AudioTrack> {
    if tracks.len() != timeline.spans.len() {
        return Err(AudioError::InvalidParameters {
            details: format!("{} soundtracks for {} segments", tracks.len(), timeline.spans.len()),
        }.into());
    }

    let mut combined = AudioTrack::silence(sample_rate, channels, 0);
    for (track, span) in tracks.iter().zip(&timeline.spans) {
        let frames = combined.frames_for(timeline.segment_duration(span.role));
        let segment = match track {
            Some(track) => track.padded(frames),
            None => AudioTrack::silence(sample_rate, channels, frames),
        };
        debug!("      {} audio: {} frames", span.role, segment.frames());
        combined.append(&segment)?;
    }

    Ok(combined)
}

impl Default for AudioFitter {
    fn default() -> Self {
        Self::new(0.6, false)
    }
}
