use crate::error::{AudioError, Result};

/// Below this peak amplitude a track counts as silent
pub const SILENCE_THRESHOLD: f32 = 1.0e-4;

/// Interleaved PCM audio held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    /// Interleaved samples in [-1.0, 1.0]
    samples: Vec<f32>,

    /// Sample rate in Hz
    sample_rate: u32,

    /// Number of channels (1 = mono, 2 = stereo)
    channels: u16,
}

impl AudioTrack {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == 0 || channels == 0 {
            return Err(AudioError::InvalidParameters {
                details: format!("{} Hz, {} channels", sample_rate, channels),
            }.into());
        }
        if samples.len() % channels as usize != 0 {
            return Err(AudioError::InvalidParameters {
                details: format!("{} samples do not divide into {} channels", samples.len(), channels),
            }.into());
        }
        Ok(Self { samples, sample_rate, channels })
    }

    /// `frames` frames of digital silence
    pub fn silence(sample_rate: u32, channels: u16, frames: usize) -> Self {
        Self {
            samples: vec![0.0; frames * channels as usize],
            sample_rate,
            channels,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of sample frames (one sample per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Sample frames needed to cover `seconds` at this track's rate
    pub fn frames_for(&self, seconds: f64) -> usize {
        (seconds.max(0.0) * self.sample_rate as f64).round() as usize
    }

    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
    }

    pub fn is_silent(&self) -> bool {
        self.peak() < SILENCE_THRESHOLD
    }

    /// Repeat from the start (hard restart) until exactly `frames` long
    pub fn looped(&self, frames: usize) -> Result<Self> {
        if self.samples.is_empty() {
            return Err(AudioError::InvalidParameters {
                details: "cannot loop an empty track".to_string(),
            }.into());
        }

        let wanted = frames * self.channels as usize;
        let samples = self.samples.iter().copied().cycle().take(wanted).collect();
        Ok(Self { samples, ..*self })
    }

    /// First `frames` frames (or the whole track if shorter)
    pub fn truncated(&self, frames: usize) -> Self {
        let wanted = (frames * self.channels as usize).min(self.samples.len());
        Self {
            samples: self.samples[..wanted].to_vec(),
            ..*self
        }
    }

    /// Exactly `frames` long: cut, or extended with silence
    pub fn padded(&self, frames: usize) -> Self {
        let mut samples = self.samples.clone();
        samples.resize(frames * self.channels as usize, 0.0);
        Self { samples, ..*self }
    }

    pub fn with_gain(mut self, gain: f32) -> Self {
        for sample in &mut self.samples {
            *sample *= gain;
        }
        self
    }

    /// Append another track of the same format
    pub fn append(&mut self, other: &AudioTrack) -> Result<()> {
        self.ensure_same_format(other)?;
        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }

    /// Additive mix, clamped to [-1, 1]; the result is as long as the longer input
    pub fn mix(&self, other: &AudioTrack) -> Result<Self> {
        self.ensure_same_format(other)?;

        let len = self.samples.len().max(other.samples.len());
        let samples = (0..len)
            .map(|i| {
                let a = self.samples.get(i).copied().unwrap_or(0.0);
                let b = other.samples.get(i).copied().unwrap_or(0.0);
                (a + b).clamp(-1.0, 1.0)
            })
            .collect();
        Ok(Self { samples, ..*self })
    }

    /// Average all channels into one
    pub fn mono_samples(&self) -> Vec<f32> {
        if self.channels == 1 {
            return self.samples.clone();
        }

        self.samples
            .chunks(self.channels as usize)
            .map(|chunk| chunk.iter().sum::<f32>() / self.channels as f32)
            .collect()
    }

    /// Convert to `channels` channels (mono is duplicated, stereo averaged)
    pub fn remixed(&self, channels: u16) -> Result<Self> {
        if channels == 0 {
            return Err(AudioError::InvalidParameters {
                details: "channel count must be positive".to_string(),
            }.into());
        }
        if channels == self.channels {
            return Ok(self.clone());
        }

        let mono = self.mono_samples();
        let samples = mono
            .iter()
            .flat_map(|&s| std::iter::repeat(s).take(channels as usize))
            .collect();
        Ok(Self { samples, sample_rate: self.sample_rate, channels })
    }

    /// Linear-interpolation resample to `sample_rate`
    pub fn resampled(&self, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidParameters {
                details: "sample rate must be positive".to_string(),
            }.into());
        }
        if sample_rate == self.sample_rate || self.samples.is_empty() {
            return Ok(Self { sample_rate, ..self.clone() });
        }

        let channels = self.channels as usize;
        let in_frames = self.frames();
        let ratio = self.sample_rate as f64 / sample_rate as f64;
        let out_frames = (in_frames as f64 / ratio).round() as usize;

        let mut samples = Vec::with_capacity(out_frames * channels);
        for i in 0..out_frames {
            let position = i as f64 * ratio;
            let index = (position.floor() as usize).min(in_frames - 1);
            let next = (index + 1).min(in_frames - 1);
            let frac = (position - index as f64).clamp(0.0, 1.0) as f32;

            for ch in 0..channels {
                let a = self.samples[index * channels + ch];
                let b = self.samples[next * channels + ch];
                samples.push(a + (b - a) * frac);
            }
        }

        Ok(Self { samples, sample_rate, channels: self.channels })
    }

    /// Bring the track to the working rate and channel count
    pub fn converted(&self, sample_rate: u32, channels: u16) -> Result<Self> {
        self.remixed(channels)?.resampled(sample_rate)
    }

    fn ensure_same_format(&self, other: &AudioTrack) -> Result<()> {
        if self.sample_rate != other.sample_rate || self.channels != other.channels {
            return Err(AudioError::InvalidParameters {
                details: format!(
                    "format mismatch: {} Hz/{} ch vs {} Hz/{} ch",
                    self.sample_rate, self.channels, other.sample_rate, other.channels
                ),
            }.into());
        }
        Ok(())
    }
}
