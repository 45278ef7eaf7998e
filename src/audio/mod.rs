//! # Audio Module
//!
//! Loads background music and clip soundtracks into memory and fits them to
//! the length of the composed video.
//!
//! ## Core Features
//!
//! - **Loading**: WAV through hound, MP3/FLAC/OGG/AAC through symphonia
//! - **Clip audio**: a clip's own soundtrack extracted as PCM through ffmpeg
//! - **Fitting**: loop or truncate to the video duration, then attenuate
//! - **Source policy**: background music replaces clip audio unless mixing is enabled
//!
//! ## Usage
//!
//! ```rust,no_run
//! use greeting_compositor::audio::{AudioFitter, AudioLoader};
//!
//! # fn main() -> anyhow::Result<()> {
//! let bgm = AudioLoader::load("bgm.mp3")?.converted(44100, 2)?;
//!
//! let fitter = AudioFitter::new(0.6, false);
//! let fitted = fitter.fit(&bgm, 8.0)?;
//!
//! AudioLoader::write_wav(&fitted, "soundtrack.wav")?;
//! # Ok(())
//! # }
//! ```

pub mod fitter;
pub mod loader;
pub mod types;

pub use fitter::{align_to_timeline, AudioFitter, AudioSource};
pub use loader::AudioLoader;
pub use types::AudioTrack;
