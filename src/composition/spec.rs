use std::path::{Path, PathBuf};

use crate::audio::AudioFitter;
use crate::config::{AudioConfig, Config};
use crate::error::Result;
use crate::video::{FrameNormalizer, OutputParams, SegmentRole};

/// Everything a composition run needs besides the generated clip itself
#[derive(Debug, Clone)]
pub struct CompositionSpec {
    pub intro: PathBuf,
    pub outro: PathBuf,

    /// `None` disables background music entirely
    pub background_music: Option<PathBuf>,

    pub output: OutputParams,

    /// Working PCM format, music volume and source-audio policy
    pub audio: AudioConfig,

    pub min_generated_bytes: u64,
}

impl CompositionSpec {
    pub fn from_config(config: &Config) -> Self {
        Self {
            intro: config.assets.intro.clone(),
            outro: config.assets.outro.clone(),
            background_music: Some(config.assets.background_music.clone()),
            output: config.output.clone(),
            audio: config.audio.clone(),
            min_generated_bytes: config.assets.min_generated_bytes,
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        self.output.validate()?;
        self.audio.validate()
    }

    pub fn with_background_music<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.background_music = Some(path.into());
        self
    }

    pub fn without_background_music(mut self) -> Self {
        self.background_music = None;
        self
    }

    /// The three clips in playback order
    pub fn segment_paths<'a>(&'a self, generated: &'a Path) -> [(SegmentRole, &'a Path); 3] {
        [
            (SegmentRole::Intro, self.intro.as_path()),
            (SegmentRole::Generated, generated),
            (SegmentRole::Outro, self.outro.as_path()),
        ]
    }

    pub fn normalizer(&self) -> FrameNormalizer {
        FrameNormalizer::from_params(&self.output)
    }

    pub fn fitter(&self) -> AudioFitter {
        AudioFitter::new(self.audio.background_volume, self.audio.mix_source_audio)
    }
}

impl Default for CompositionSpec {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
