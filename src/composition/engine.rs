use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::{
    audio::{align_to_timeline, AudioLoader, AudioSource, AudioTrack},
    composition::spec::CompositionSpec,
    config::Config,
    error::{CompositorError, ExportError, PreconditionError, Result},
    video::{
        mux_audio, probe, ClipDecoder, MediaClip, Segment, SegmentRole, Sequencer, Timeline,
        VideoEncoder,
    },
};

/// The finished greeting video
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedVideo {
    /// Persisted temporary file; the caller owns its cleanup
    pub path: PathBuf,
    pub duration: f64,
    pub frame_count: u64,
    pub width: u32,
    pub height: u32,
    pub file_size: u64,
    pub audio: AudioSource,
}

/// Main composition engine that turns a generated clip into the final greeting video
///
/// The engine follows a clear pipeline:
/// 1. Preconditions - All clips present, generated clip non-trivial, FFmpeg installed
/// 2. Video - Decode, normalize and hard-cut intro, generated and outro into one H.264 stream
/// 3. Audio - Fit background music (or keep clip audio) to the combined duration
/// 4. Export - Mux video and audio into a fresh temporary MP4
#[derive(Debug, Clone)]
pub struct CompositionEngine {
    spec: CompositionSpec,
}

impl CompositionEngine {
    /// Create a new composition engine from configuration
    pub fn new(config: Config) -> Self {
        Self::with_spec(CompositionSpec::from_config(&config))
    }

    pub fn with_spec(spec: CompositionSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &CompositionSpec {
        &self.spec
    }

    /// Main composition method - orchestrates the entire pipeline
    ///
    /// Blocks until the output file is written. Every call renders from
    /// scratch and returns a new file.
    pub fn compose<P: AsRef<Path>>(&self, generated: P) -> Result<ComposedVideo> {
        let generated = generated.as_ref();

        info!("🎬 Starting greeting composition");
        info!("   Intro: {:?}", self.spec.intro);
        info!("   Generated: {:?}", generated);
        info!("   Outro: {:?}", self.spec.outro);

        // Pipeline Step 1: Preconditions
        self.check_preconditions(generated)?;

        let workdir = self.create_workdir()?;
        debug!("Working directory: {:?}", workdir.path());

        // Pipeline Step 2: Video
        let clips = self.open_clips(generated)?;
        let video_path = workdir.path().join("video.mp4");
        let timeline = self.render_video(&clips, &video_path)?;

        // Pipeline Step 3: Audio
        let (audio, track) = self.prepare_audio(&clips, &timeline)?;
        let audio_path = match &track {
            Some(track) => {
                let path = workdir.path().join("audio.wav");
                AudioLoader::write_wav(track, &path)?;
                Some(path)
            }
            None => None,
        };

        // Pipeline Step 4: Export
        let output_path = self.export(&video_path, audio_path.as_deref())?;

        let file_size = fs::metadata(&output_path)?.len();
        let (width, height) = self.spec.output.resolution();
        let composed = ComposedVideo {
            path: output_path,
            duration: timeline.duration(),
            frame_count: timeline.total_frames(),
            width,
            height,
            file_size,
            audio,
        };

        info!("🎉 Composition complete! Output saved to: {:?}", composed.path);
        info!("   {}x{}, {:.2}s, {} frames, audio: {}", width, height, composed.duration, composed.frame_count, audio);
        Ok(composed)
    }

    /// Run [`compose`](Self::compose) on tokio's blocking pool
    pub async fn compose_in_background(&self, generated: PathBuf) -> Result<ComposedVideo> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.compose(&generated))
            .await
            .map_err(|e| CompositorError::generic(format!("Composition task failed: {}", e)))?
    }

    // ==========================================
    // PIPELINE STEP 1: PRECONDITIONS
    // ==========================================

    /// Cheap settings and input checks; nothing is decoded and no file is created
    fn check_preconditions(&self, generated: &Path) -> Result<()> {
        info!("🔎 Step 1: Checking inputs...");
        self.spec.validate()?;

        for (role, path) in self.spec.segment_paths(generated) {
            if !path.is_file() {
                return Err(PreconditionError::MissingAsset {
                    role: role.to_string(),
                    path: path.display().to_string(),
                }.into());
            }
        }

        let size = fs::metadata(generated)?.len();
        if size < self.spec.min_generated_bytes {
            return Err(PreconditionError::GeneratedClipTooSmall {
                path: generated.display().to_string(),
                size,
                minimum: self.spec.min_generated_bytes,
            }.into());
        }

        for tool in ["ffmpeg", "ffprobe"] {
            if !probe::tool_available(tool) {
                return Err(PreconditionError::ToolUnavailable { tool: tool.to_string() }.into());
            }
        }

        info!("   ✅ Inputs ready (generated clip: {} bytes)", size);
        Ok(())
    }

    fn create_workdir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("greeting_work_");
        let dir = match &self.spec.output.temp_dir {
            Some(dir) => builder.tempdir_in(dir)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    // ==========================================
    // PIPELINE STEP 2: VIDEO
    // ==========================================

    fn open_clips(&self, generated: &Path) -> Result<[MediaClip; 3]> {
        let [intro, generated, outro] = self.spec.segment_paths(generated).map(|(_, path)| path);
        let clips = [MediaClip::open(intro)?, MediaClip::open(generated)?, MediaClip::open(outro)?];

        for (role, clip) in SegmentRole::ORDER.iter().zip(&clips) {
            let (width, height) = clip.info().display_size().unwrap_or((0, 0));
            debug!(
                "      {} - {}x{} @ {:.2} fps, {:.2}s, audio: {}",
                role,
                width,
                height,
                clip.info().fps.unwrap_or(0.0),
                clip.duration(),
                clip.has_audio()
            );
        }
        Ok(clips)
    }

    /// Decode, normalize and encode all three segments into a video-only file
    fn render_video(&self, clips: &[MediaClip; 3], video_path: &Path) -> Result<Timeline> {
        info!("📹 Step 2: Rendering video...");
        let params = &self.spec.output;

        let [intro, generated, outro] = clips;
        let segments = [
            Segment::new(SegmentRole::Intro, ClipDecoder::new(intro, params.fps)?),
            Segment::new(SegmentRole::Generated, ClipDecoder::new(generated, params.fps)?),
            Segment::new(SegmentRole::Outro, ClipDecoder::new(outro, params.fps)?),
        ];

        let sequencer = Sequencer::new(self.spec.normalizer(), params.fps);
        let mut encoder = VideoEncoder::start(params, video_path)?;
        let timeline = sequencer.concatenate(segments, &mut encoder)?;
        let encoded = encoder.finish()?;

        if encoded != timeline.total_frames() {
            return Err(ExportError::EncodingFailed {
                reason: format!("encoded {} frames, sequenced {}", encoded, timeline.total_frames()),
            }.into());
        }

        info!("   ✅ Video rendered: {} frames ({:.2}s)", encoded, params.frames_to_seconds(encoded));
        Ok(timeline)
    }

    // ==========================================
    // PIPELINE STEP 3: AUDIO
    // ==========================================

    fn prepare_audio(&self, clips: &[MediaClip; 3], timeline: &Timeline) -> Result<(AudioSource, Option<AudioTrack>)> {
        info!("🎵 Step 3: Preparing audio...");

        let background = self.load_background()?;
        let source = self.source_audio(clips, timeline)?;
        let (audio, track) = self.spec.fitter().resolve(background.as_ref(), source, timeline.duration())?;

        match &track {
            Some(track) => info!("   ✅ Audio ready: {} ({:.2}s)", audio, track.duration()),
            None => info!("   ✅ No audio to attach"),
        }
        Ok((audio, track))
    }

    /// Background music in the working format, or `None` when disabled or absent
    fn load_background(&self) -> Result<Option<AudioTrack>> {
        let Some(path) = &self.spec.background_music else {
            debug!("Background music disabled");
            return Ok(None);
        };

        if !path.is_file() {
            info!("   Background music {:?} not found, continuing without it", path);
            return Ok(None);
        }

        let track = AudioLoader::load(path)?;
        info!("   Loaded: {:.1}s, {} Hz, {} channels", track.duration(), track.sample_rate(), track.channels());
        track.converted(self.spec.audio.sample_rate, self.spec.audio.channels).map(Some)
    }

    /// The clips' own soundtracks laid end to end over their video spans
    fn source_audio(&self, clips: &[MediaClip; 3], timeline: &Timeline) -> Result<Option<AudioTrack>> {
        if !clips.iter().any(MediaClip::has_audio) {
            return Ok(None);
        }

        let (rate, channels) = (self.spec.audio.sample_rate, self.spec.audio.channels);
        let tracks = clips
            .iter()
            .map(|clip| AudioLoader::extract_clip_audio(clip, rate, channels))
            .collect::<Result<Vec<_>>>()?;

        align_to_timeline(&tracks, timeline, rate, channels).map(Some)
    }

    // ==========================================
    // PIPELINE STEP 4: EXPORT
    // ==========================================

    fn export(&self, video_path: &Path, audio_path: Option<&Path>) -> Result<PathBuf> {
        info!("💾 Step 4: Exporting final video...");

        let output_path = self.create_output_file()?;
        if let Err(e) = mux_audio(&self.spec.output, video_path, audio_path, &output_path) {
            if let Err(remove) = fs::remove_file(&output_path) {
                warn!("Could not remove partial output {:?}: {}", output_path, remove);
            }
            return Err(e);
        }

        Ok(output_path)
    }

    /// A new `greeting_*.mp4` that survives the engine
    fn create_output_file(&self) -> Result<PathBuf> {
        let output_failed = |reason: String| ExportError::OutputFile { reason };

        let mut builder = tempfile::Builder::new();
        builder.prefix("greeting_").suffix(".mp4");
        let file = match &self.spec.output.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| output_failed(e.to_string()))?;

        let (_, path) = file.keep().map_err(|e| output_failed(e.to_string()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::testutil;
    use crate::video::EncoderPreset;
    use tempfile::tempdir;

    fn engine_in(dir: &Path) -> CompositionEngine {
        let mut spec = CompositionSpec::default();
        spec.intro = dir.join("intro.mp4");
        spec.outro = dir.join("outro.mp4");
        spec.background_music = Some(dir.join("bgm.wav"));
        spec.output.temp_dir = Some(dir.join("out"));
        spec.output.preset = EncoderPreset::Ultrafast;
        fs::create_dir_all(dir.join("out")).unwrap();
        CompositionEngine::with_spec(spec)
    }

    fn out_entries(dir: &Path) -> usize {
        fs::read_dir(dir.join("out")).unwrap().count()
    }

    #[test]
    fn test_missing_intro_fails_without_temp_files() {
        let dir = tempdir().unwrap();
        let engine = engine_in(dir.path());
        fs::write(dir.path().join("outro.mp4"), vec![0u8; 4096]).unwrap();
        let generated = dir.path().join("generated.mp4");
        fs::write(&generated, vec![0u8; 4096]).unwrap();

        let err = engine.compose(&generated).unwrap_err();
        assert!(err.is_precondition());
        match err {
            CompositorError::Precondition(PreconditionError::MissingAsset { role, .. }) => assert_eq!(role, "intro"),
            other => panic!("expected MissingAsset, got {:?}", other),
        }
        assert_eq!(out_entries(dir.path()), 0);
    }

    #[test]
    fn test_zero_byte_generated_clip_fails_early() {
        let dir = tempdir().unwrap();
        let engine = engine_in(dir.path());
        fs::write(dir.path().join("intro.mp4"), vec![0u8; 4096]).unwrap();
        fs::write(dir.path().join("outro.mp4"), vec![0u8; 4096]).unwrap();
        let generated = dir.path().join("generated.mp4");
        fs::File::create(&generated).unwrap();

        match engine.compose(&generated) {
            Err(CompositorError::Precondition(PreconditionError::GeneratedClipTooSmall { size, minimum, .. })) => {
                assert_eq!(size, 0);
                assert_eq!(minimum, 1024);
            }
            other => panic!("expected GeneratedClipTooSmall, got {:?}", other),
        }
        assert_eq!(out_entries(dir.path()), 0);
    }

    #[test]
    fn test_unusable_canvas_rejected_before_any_work() {
        let dir = tempdir().unwrap();
        for name in ["intro.mp4", "outro.mp4", "generated.mp4"] {
            fs::write(dir.path().join(name), vec![0u8; 4096]).unwrap();
        }
        let generated = dir.path().join("generated.mp4");

        for (width, height) in [(0, 1920), (1080, 1919)] {
            let mut spec = engine_in(dir.path()).spec().clone();
            spec.output.width = width;
            spec.output.height = height;

            match CompositionEngine::with_spec(spec).compose(&generated) {
                Err(CompositorError::Config(ConfigError::InvalidValue { key, .. })) => {
                    assert_eq!(key, "output.resolution");
                }
                other => panic!("expected InvalidValue for {}x{}, got {:?}", width, height, other),
            }
            assert_eq!(out_entries(dir.path()), 0);
        }

        let mut spec = engine_in(dir.path()).spec().clone();
        spec.audio.background_volume = -0.5;
        let err = CompositionEngine::with_spec(spec).compose(&generated).unwrap_err();
        assert!(matches!(err, CompositorError::Config(_)));
        assert_eq!(out_entries(dir.path()), 0);
    }

    #[test]
    fn test_end_to_end_greeting() {
        if !testutil::ffmpeg_ready() {
            return;
        }
        let dir = tempdir().unwrap();
        let engine = engine_in(dir.path());
        testutil::make_clip(dir.path(), "intro.mp4", 1920, 1080, 2.0, 24, false);
        let generated = testutil::make_clip(dir.path(), "generated.mp4", 1280, 720, 4.0, 24, false);
        testutil::make_clip(dir.path(), "outro.mp4", 1080, 1920, 2.0, 24, false);
        testutil::make_wav(&dir.path().join("bgm.wav"), 3.0, 44100, 2);

        let composed = engine.compose(&generated).unwrap();

        assert_eq!((composed.width, composed.height), (1080, 1920));
        assert_eq!(composed.audio, AudioSource::Background);
        assert!((composed.duration - 8.0).abs() <= 1.0 / 24.0);
        assert!(composed.file_size > 0);
        assert!(composed.path.starts_with(dir.path().join("out")));
        assert!(composed.path.file_name().unwrap().to_string_lossy().starts_with("greeting_"));

        let probed = MediaClip::open(&composed.path).unwrap();
        assert_eq!(probed.info().display_size(), Some((1080, 1920)));
        assert!((probed.duration() - 8.0).abs() < 0.2);
        assert!(probed.has_audio());

        let audio = AudioLoader::extract_clip_audio(&probed, 44100, 2).unwrap().unwrap();
        assert!((audio.duration() - 8.0).abs() < 0.2);

        // Only the kept output remains; the working directory is gone
        assert_eq!(out_entries(dir.path()), 1);
    }

    #[test]
    fn test_source_audio_kept_without_background() {
        if !testutil::ffmpeg_ready() {
            return;
        }
        let dir = tempdir().unwrap();
        let mut spec = engine_in(dir.path()).spec().clone().without_background_music();
        spec.output.width = 108;
        spec.output.height = 192;
        let engine = CompositionEngine::with_spec(spec);

        testutil::make_clip(dir.path(), "intro.mp4", 192, 108, 1.0, 24, false);
        let generated = testutil::make_clip(dir.path(), "generated.mp4", 128, 72, 2.0, 30, true);
        testutil::make_clip(dir.path(), "outro.mp4", 108, 192, 1.0, 24, false);

        let composed = engine.compose(&generated).unwrap();
        assert_eq!(composed.audio, AudioSource::Source);
        assert!(MediaClip::open(&composed.path).unwrap().has_audio());
    }

    #[test]
    fn test_repeated_runs_agree() {
        if !testutil::ffmpeg_ready() {
            return;
        }
        let dir = tempdir().unwrap();
        let mut spec = engine_in(dir.path()).spec().clone();
        spec.output.width = 108;
        spec.output.height = 192;
        let engine = CompositionEngine::with_spec(spec);

        testutil::make_clip(dir.path(), "intro.mp4", 192, 108, 1.0, 24, false);
        let generated = testutil::make_clip(dir.path(), "generated.mp4", 128, 72, 1.0, 24, false);
        testutil::make_clip(dir.path(), "outro.mp4", 108, 192, 1.0, 24, false);

        // No bgm.wav on disk: music is skipped, output is silent
        let first = engine.compose(&generated).unwrap();
        let second = engine.compose(&generated).unwrap();

        assert_ne!(first.path, second.path);
        assert_eq!(first.audio, AudioSource::None);
        assert_eq!(first.frame_count, second.frame_count);
        assert_eq!((first.width, first.height), (second.width, second.height));
        assert!(!MediaClip::open(&first.path).unwrap().has_audio());
    }

    #[tokio::test]
    async fn test_compose_in_background_reports_errors() {
        let dir = tempdir().unwrap();
        let engine = engine_in(dir.path());

        let err = engine.compose_in_background(dir.path().join("nope.mp4")).await.unwrap_err();
        assert!(err.is_precondition());
    }
}
