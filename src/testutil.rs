//! Fixtures shared by the unit tests

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::video::probe::tool_available;

/// ffmpeg and ffprobe are installed and ffmpeg can encode H.264
pub fn ffmpeg_ready() -> bool {
    if !tool_available("ffmpeg") || !tool_available("ffprobe") {
        eprintln!("ffmpeg/ffprobe not installed, skipping");
        return false;
    }

    let has_x264 = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .output()
        .map(|out| String::from_utf8_lossy(&out.stdout).contains("libx264"))
        .unwrap_or(false);
    if !has_x264 {
        eprintln!("ffmpeg lacks libx264, skipping");
    }
    has_x264
}

/// Render a test-pattern clip (optionally with a 440 Hz tone) into `dir`
pub fn make_clip(dir: &Path, name: &str, width: u32, height: u32, seconds: f64, fps: u32, with_audio: bool) -> PathBuf {
    let path = dir.join(name);
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-y", "-v", "error", "-f", "lavfi", "-i"])
        .arg(format!("testsrc=size={}x{}:rate={}:duration={}", width, height, fps, seconds));

    if with_audio {
        cmd.args(["-f", "lavfi", "-i"])
            .arg(format!("sine=frequency=440:sample_rate=44100:duration={}", seconds));
    }

    cmd.args(["-c:v", "libx264", "-preset", "ultrafast", "-pix_fmt", "yuv420p"]);
    if with_audio {
        cmd.args(["-c:a", "aac", "-shortest"]);
    }

    let status = cmd.arg(&path).status().expect("failed to run ffmpeg");
    assert!(status.success(), "ffmpeg could not create {:?}", path);
    path
}

/// Write a 16-bit sine WAV of the given length
pub fn make_wav(path: &Path, seconds: f64, sample_rate: u32, channels: u16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let frames = (seconds * sample_rate as f64).round() as usize;

    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let sample = ((t * 220.0 * std::f32::consts::TAU).sin() * 0.5 * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(sample).unwrap();
        }
    }
    writer.finalize().unwrap();
}

/// Shell script standing in for an external tool; ignores its arguments
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Run `f` on its own thread and fail the test if it takes longer than `limit`
pub fn within<T, F>(limit: Duration, f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(f());
    });
    rx.recv_timeout(limit).expect("operation stalled or panicked")
}
