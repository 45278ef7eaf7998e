use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use tracing::{debug, info, warn};

use crate::error::{CompositorError, ExportError, Result, VideoError};
use crate::video::process::StderrDrain;
use crate::video::sequencer::FrameSink;
use crate::video::types::{Frame, OutputParams};

/// H.264 encoder fed with raw rgb24 frames over stdin
///
/// Writes a video-only file; audio is attached afterwards by [`mux_audio`].
pub struct VideoEncoder {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr: Option<StderrDrain>,
    out_path: PathBuf,
    width: u32,
    height: u32,
    frames_written: u64,
}

impl VideoEncoder {
    /// ffmpeg arguments for encoding the raw frame stream into `out_path`
    pub fn encode_args(params: &OutputParams, out_path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-y", "-v", "error",
            "-f", "rawvideo",
            "-pix_fmt", "rgb24",
            "-s", &format!("{}x{}", params.width, params.height),
            "-r", &params.fps.to_string(),
            "-i", "pipe:0",
            "-an",
            "-c:v", &params.video_codec,
            "-preset", params.preset.as_str(),
            "-crf", &params.crf.to_string(),
            "-pix_fmt", "yuv420p",
            "-r", &params.fps.to_string(),
            "-movflags", "+faststart",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(out_path.as_os_str().to_owned());
        args
    }

    pub fn start(params: &OutputParams, out_path: &Path) -> Result<Self> {
        Self::start_program(OsStr::new("ffmpeg"), params, out_path)
    }

    fn start_program(program: &OsStr, params: &OutputParams, out_path: &Path) -> Result<Self> {
        info!("Starting {} encoder ({} preset) -> {:?}", params.video_codec, params.preset, out_path);

        let mut child = Command::new(program)
            .args(Self::encode_args(params, out_path))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExportError::EncodingFailed {
                reason: format!("Failed to spawn FFmpeg process: {}", e),
            })?;

        let stdin = child.stdin.take().ok_or_else(|| ExportError::EncodingFailed {
            reason: "FFmpeg stdin unavailable".to_string(),
        })?;

        let stderr = StderrDrain::spawn(&mut child);

        Ok(Self {
            child: Some(child),
            stdin: Some(stdin),
            stderr: Some(stderr),
            out_path: out_path.to_path_buf(),
            width: params.width,
            height: params.height,
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Close the frame stream and wait for the encoder to flush
    pub fn finish(mut self) -> Result<u64> {
        self.stdin = None;
        let stderr = self.reap()?;
        debug!("Encoded {} frames into {:?}", self.frames_written, self.out_path);

        match stderr {
            None => Ok(self.frames_written),
            Some(stderr) => Err(ExportError::EncodingFailed {
                reason: format!("FFmpeg failed: {}", stderr),
            }.into()),
        }
    }

    /// Wait for the child; returns its stderr when it exited unsuccessfully
    fn reap(&mut self) -> Result<Option<String>> {
        let Some(mut child) = self.child.take() else {
            return Ok(None);
        };

        let status = child.wait().map_err(|e| ExportError::EncodingFailed {
            reason: format!("FFmpeg execution failed: {}", e),
        })?;
        let stderr = self.stderr.take().map(|mut drain| drain.collect()).unwrap_or_default();

        if status.success() {
            Ok(None)
        } else {
            Ok(Some(format!("{} {}", status, stderr)))
        }
    }

    fn write_failed(&mut self, error: std::io::Error) -> CompositorError {
        self.stdin = None;
        let detail = match self.reap() {
            Ok(Some(stderr)) => stderr,
            _ => error.to_string(),
        };
        ExportError::EncodingFailed {
            reason: format!("FFmpeg stopped accepting frames: {}", detail),
        }
        .into()
    }
}

impl FrameSink for VideoEncoder {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(VideoError::InvalidParameters {
                details: format!(
                    "encoder expects {}x{} frames, got {}x{}",
                    self.width,
                    self.height,
                    frame.width(),
                    frame.height()
                ),
            }.into());
        }

        let written = match self.stdin.as_mut() {
            Some(stdin) => stdin.write_all(frame.as_rgb_bytes()),
            None => Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "encoder already closed")),
        };
        if let Err(e) = written {
            return Err(self.write_failed(e));
        }

        self.frames_written += 1;
        Ok(())
    }
}

impl Drop for VideoEncoder {
    fn drop(&mut self) {
        self.stdin = None;
        if let Some(mut child) = self.child.take() {
            warn!("Encoder dropped before finish, killing FFmpeg");
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// ffmpeg arguments that copy the video stream and attach `audio` (if any)
pub fn mux_args(params: &OutputParams, video: &Path, audio: Option<&Path>, out_path: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-y".into(), "-v".into(), "error".into(), "-i".into(), video.into()];

    match audio {
        Some(audio) => {
            args.push("-i".into());
            args.push(audio.into());
            args.extend(
                [
                    "-map", "0:v:0",
                    "-map", "1:a:0",
                    "-c:v", "copy",
                    "-c:a", &params.audio_codec,
                    "-b:a", &params.audio_bitrate,
                ]
                .iter()
                .map(OsString::from),
            );
        }
        None => {
            args.extend(["-map", "0:v:0", "-c:v", "copy", "-an"].iter().map(OsString::from));
        }
    }

    args.extend(["-movflags", "+faststart"].iter().map(OsString::from));
    args.push(out_path.into());
    args
}

/// Produce the final file from the video-only intermediate and an optional WAV
pub fn mux_audio(params: &OutputParams, video: &Path, audio: Option<&Path>, out_path: &Path) -> Result<()> {
    debug!("Muxing {:?} + {:?} -> {:?}", video, audio, out_path);

    let output = Command::new("ffmpeg")
        .args(mux_args(params, video, audio, out_path))
        .stdin(Stdio::null())
        .output()
        .map_err(|e| ExportError::MuxFailed {
            reason: format!("FFmpeg execution failed: {}", e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExportError::MuxFailed {
            reason: format!("FFmpeg failed: {}", stderr.trim()),
        }.into());
    }

    Ok(())
}
