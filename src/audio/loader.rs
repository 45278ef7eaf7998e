use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::audio::types::AudioTrack;
use crate::error::{AudioError, Result};
use crate::video::MediaClip;

/// Audio file loader supporting multiple formats
pub struct AudioLoader;

impl AudioLoader {
    /// Decode an audio file into memory at its native rate and channel count
    pub fn load<P: AsRef<Path>>(path: P) -> Result<AudioTrack> {
        let path = path.as_ref();
        let extension = Self::detect_format(path).unwrap_or_default();

        match extension.as_str() {
            "wav" => Self::load_wav(path),
            ext if Self::is_format_supported(ext) => Self::load_with_symphonia(path),
            _ => Err(AudioError::UnsupportedFormat { format: extension }.into()),
        }
    }

    /// Load WAV files using the hound crate (most reliable for WAV)
    fn load_wav(path: &Path) -> Result<AudioTrack> {
        let load_failed = |reason: String| AudioError::LoadFailed {
            path: path.display().to_string(),
            reason,
        };

        let reader = hound::WavReader::open(path).map_err(|e| load_failed(e.to_string()))?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| load_failed(e.to_string()))?,
            hound::SampleFormat::Int => {
                let bit_depth = spec.bits_per_sample;
                reader
                    .into_samples::<i32>()
                    .map(|sample| sample.map(|s| Self::int_to_float(s, bit_depth)))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| load_failed(e.to_string()))?
            }
        };

        AudioTrack::new(samples, spec.sample_rate, spec.channels)
    }

    /// Load various formats using Symphonia
    fn load_with_symphonia(path: &Path) -> Result<AudioTrack> {
        let load_failed = |reason: String| AudioError::LoadFailed {
            path: path.display().to_string(),
            reason,
        };

        let file = File::open(path).map_err(|e| load_failed(e.to_string()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| load_failed(e.to_string()))?;
        let mut format = probed.format;

        // First track with a decodable codec
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| load_failed("no decodable audio track".to_string()))?;

        let track_id = track.id;
        let sample_rate = track.codec_params.sample_rate.ok_or_else(|| AudioError::InvalidParameters {
            details: "No sample rate found".to_string(),
        })?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| load_failed(e.to_string()))?;

        let mut samples = Vec::new();
        let mut channels = track.codec_params.channels.map(|c| c.count() as u16);
        let mut buffer: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                // End of stream
                Err(SymphoniaError::IoError(_)) => break,
                Err(e) => return Err(load_failed(e.to_string()).into()),
            };

            while !format.metadata().is_latest() {
                format.metadata().pop();
            }

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    channels.get_or_insert(spec.channels.count() as u16);

                    // Capacity is counted in interleaved samples
                    let needed = decoded.capacity() * spec.channels.count();
                    if buffer.as_ref().map_or(true, |buf| buf.capacity() < needed) {
                        buffer = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                    }
                    if let Some(buf) = buffer.as_mut() {
                        buf.copy_interleaved_ref(decoded);
                        samples.extend_from_slice(buf.samples());
                    }
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Skipping undecodable packet in {:?}: {}", path, e);
                    continue;
                }
                Err(SymphoniaError::IoError(_)) => break,
                Err(e) => return Err(load_failed(e.to_string()).into()),
            }
        }

        let channels = channels.ok_or_else(|| AudioError::InvalidParameters {
            details: "No channel information found".to_string(),
        })?;

        debug!("Decoded {} samples ({} Hz, {} ch) from {:?}", samples.len(), sample_rate, channels, path);
        AudioTrack::new(samples, sample_rate, channels)
    }

    /// Extract a clip's audio stream as PCM at the working format
    ///
    /// Returns `None` when the clip carries no audio.
    pub fn extract_clip_audio(clip: &MediaClip, sample_rate: u32, channels: u16) -> Result<Option<AudioTrack>> {
        if !clip.has_audio() {
            return Ok(None);
        }

        let path = clip.path();
        let output = Command::new("ffmpeg")
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args([
                "-map", "0:a:0",
                "-vn",
                "-ac", &channels.to_string(),
                "-ar", &sample_rate.to_string(),
                "-f", "f32le",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| AudioError::ExtractionFailed {
                path: path.display().to_string(),
                reason: format!("FFmpeg execution failed: {}", e),
            })?;

        if !output.status.success() {
            return Err(AudioError::ExtractionFailed {
                path: path.display().to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }.into());
        }

        let mut samples = Self::f32le_to_samples(&output.stdout);
        // A torn final frame can only come from a truncated stream
        samples.truncate(samples.len() - samples.len() % channels as usize);

        AudioTrack::new(samples, sample_rate, channels).map(Some)
    }

    /// Write a track as 16-bit PCM WAV
    pub fn write_wav<P: AsRef<Path>>(track: &AudioTrack, path: P) -> Result<()> {
        let path = path.as_ref();
        let write_failed = |e: hound::Error| AudioError::WriteFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        let spec = hound::WavSpec {
            channels: track.channels(),
            sample_rate: track.sample_rate(),
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(path, spec).map_err(write_failed)?;
        for &sample in track.samples() {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
            writer.write_sample(value).map_err(write_failed)?;
        }
        writer.finalize().map_err(write_failed)?;
        Ok(())
    }

    fn f32le_to_samples(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }

    /// Convert integer sample to float (-1.0 to 1.0)
    fn int_to_float(sample: i32, bit_depth: u16) -> f32 {
        match bit_depth {
            8 => sample as f32 / 128.0,
            16 => sample as f32 / 32768.0,
            24 => sample as f32 / 8388608.0,
            32 => sample as f32 / 2147483648.0,
            _ => sample as f32 / 32768.0, // Default to 16-bit
        }
    }

    /// Detect audio format from file extension
    pub fn detect_format<P: AsRef<Path>>(path: P) -> Option<String> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }

    /// Check if a file format is supported
    pub fn is_format_supported(extension: &str) -> bool {
        matches!(
            extension.to_lowercase().as_str(),
            "wav" | "mp3" | "flac" | "ogg" | "m4a" | "aac"
        )
    }
}
