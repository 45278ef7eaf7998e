use std::ffi::OsString;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::{debug, warn};

use crate::error::{Result, VideoError};
use crate::video::process::StderrDrain;
use crate::video::types::{Frame, MediaClip};

/// Anything that yields frames in presentation order
pub trait FrameSource {
    /// Next frame, or `None` once the source is exhausted
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Free decoder resources. Called once the source is exhausted; safe to
    /// call more than once.
    fn release(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Streams rgb24 frames out of a clip through an ffmpeg child process
///
/// The process is spawned lazily on the first `next_frame` call and
/// resampled to a fixed frame rate, so every segment of a composition
/// shares the output timebase. Dropping the decoder kills the process.
pub struct ClipDecoder {
    program: OsString,
    path: PathBuf,
    width: u32,
    height: u32,
    fps: u32,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    stderr: Option<StderrDrain>,
    frames_read: u64,
    finished: bool,
}

impl ClipDecoder {
    pub fn new(clip: &MediaClip, fps: u32) -> Result<Self> {
        let (width, height) = clip.info().display_size().ok_or_else(|| VideoError::NoVideoStream {
            path: clip.path().display().to_string(),
        })?;

        if width == 0 || height == 0 || fps == 0 {
            return Err(VideoError::InvalidParameters {
                details: format!("{}x{} @ {} fps for {}", width, height, fps, clip.path().display()),
            }.into());
        }

        Ok(Self {
            program: OsString::from("ffmpeg"),
            path: clip.path().to_path_buf(),
            width,
            height,
            fps,
            child: None,
            stdout: None,
            stderr: None,
            frames_read: 0,
            finished: false,
        })
    }

    /// Run `program` instead of the `ffmpeg` found on PATH
    #[cfg(test)]
    fn with_program<S: Into<OsString>>(mut self, program: S) -> Self {
        self.program = program.into();
        self
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    fn spawn(&mut self) -> Result<()> {
        debug!("Spawning decoder for {:?} at {} fps", self.path, self.fps);

        let mut child = Command::new(&self.program)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(&self.path)
            .args([
                "-map", "0:v:0",
                "-an", "-sn",
                "-vf", &format!("fps={}", self.fps),
                "-pix_fmt", "rgb24",
                "-f", "rawvideo",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.decode_error(format!("failed to spawn ffmpeg: {}", e)))?;

        self.stdout = child.stdout.take();
        self.stderr = Some(StderrDrain::spawn(&mut child));
        self.child = Some(child);
        Ok(())
    }

    /// Reap the process after end of stream and surface its exit status
    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        self.stdout = None;

        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        let status = child
            .wait()
            .map_err(|e| self.decode_error(format!("failed to wait for ffmpeg: {}", e)))?;
        let stderr = self.stderr.take().map(|mut drain| drain.collect()).unwrap_or_default();

        if !status.success() {
            return Err(self.decode_error(format!("ffmpeg exited with {}: {}", status, stderr)));
        }

        debug!("Decoded {} frames from {:?}", self.frames_read, self.path);
        Ok(())
    }

    fn decode_error(&self, reason: String) -> crate::error::CompositorError {
        VideoError::DecodingFailed {
            path: self.path.display().to_string(),
            reason,
        }
        .into()
    }
}

impl FrameSource for ClipDecoder {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }
        if self.child.is_none() {
            self.spawn()?;
        }

        let mut buf = vec![0u8; self.frame_len()];
        let read = match self.stdout.as_mut() {
            Some(stdout) => read_frame_bytes(stdout, &mut buf),
            None => Ok(0),
        };
        let filled = read.map_err(|e| self.decode_error(format!("read failed: {}", e)))?;

        if filled == 0 {
            self.finish()?;
            return Ok(None);
        }

        if filled < buf.len() {
            let _ = self.release();
            return Err(self.decode_error(format!(
                "truncated frame {} ({} of {} bytes)",
                self.frames_read,
                filled,
                buf.len()
            )));
        }

        self.frames_read += 1;
        Frame::from_rgb_bytes(self.width, self.height, buf)
            .map(Some)
            .ok_or_else(|| self.decode_error("frame buffer size mismatch".to_string()))
    }

    fn release(&mut self) -> Result<()> {
        self.finished = true;
        self.stdout = None;

        if let Some(mut child) = self.child.take() {
            // Already exited is fine; kill only fails then
            let _ = child.kill();
            child
                .wait()
                .map_err(|e| self.decode_error(format!("failed to reap ffmpeg: {}", e)))?;
        }
        if let Some(mut drain) = self.stderr.take() {
            drain.collect();
        }
        Ok(())
    }
}

impl Drop for ClipDecoder {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Failed to release decoder: {}", e);
        }
    }
}

/// Fill `buf` from `reader`, stopping early only at end of stream
fn read_frame_bytes<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
