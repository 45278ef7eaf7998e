use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, Result},
    video::OutputParams,
};

/// Main configuration for the Greeting-Compositor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bracketing clips and background music
    pub assets: AssetConfig,

    /// Output canvas and encoder settings
    pub output: OutputParams,

    /// Background music handling
    pub audio: AudioConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.assets.validate()?;
        self.output.validate()?;
        self.audio.validate()?;
        Ok(())
    }
}

/// Locations of the fixed media assets
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Clip played before the generated segment
    pub intro: PathBuf,

    /// Clip played after the generated segment
    pub outro: PathBuf,

    /// Background track; a missing file disables music
    pub background_music: PathBuf,

    /// Generated clips smaller than this are treated as failed downloads
    pub min_generated_bytes: u64,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            intro: PathBuf::from("intro.mp4"),
            outro: PathBuf::from("outro.mp4"),
            background_music: PathBuf::from("bgm.mp3"),
            min_generated_bytes: 1024,
        }
    }
}

impl AssetConfig {
    fn validate(&self) -> Result<()> {
        if self.intro.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "assets.intro".to_string(),
                value: String::new(),
            }.into());
        }

        if self.outro.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "assets.outro".to_string(),
                value: String::new(),
            }.into());
        }

        Ok(())
    }
}

/// Background music configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Gain applied to the fitted background track
    pub background_volume: f32,

    /// Working sample rate for all PCM handling (Hz)
    pub sample_rate: u32,

    /// Working channel count (1 or 2)
    pub channels: u16,

    /// Sum background music with audio already present on the clips
    /// instead of replacing it
    pub mix_source_audio: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            background_volume: 0.6,
            sample_rate: 44100,
            channels: 2,
            mix_source_audio: false,
        }
    }
}

impl AudioConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=4.0).contains(&self.background_volume) {
            return Err(ConfigError::InvalidValue {
                key: "audio.background_volume".to_string(),
                value: self.background_volume.to_string()
            }.into());
        }

        if self.sample_rate == 0 {
            return Err(ConfigError::InvalidValue {
                key: "audio.sample_rate".to_string(),
                value: self.sample_rate.to_string()
            }.into());
        }

        if !matches!(self.channels, 1 | 2) {
            return Err(ConfigError::InvalidValue {
                key: "audio.channels".to_string(),
                value: self.channels.to_string()
            }.into());
        }

        Ok(())
    }
}
