use std::collections::HashMap;
use std::path::Path;
use std::process::{Command, Stdio};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, VideoError};

/// What ffprobe reports about a media file
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    /// Display width (rotation applied), video only
    pub width: Option<u32>,

    /// Display height (rotation applied), video only
    pub height: Option<u32>,

    /// Native frame rate, video only
    pub fps: Option<f64>,

    /// Duration in seconds
    pub duration: f64,

    pub has_video: bool,
    pub has_audio: bool,

    pub video_codec: Option<String>,
}

impl MediaInfo {
    /// (width, height) of a video stream
    pub fn display_size(&self) -> Option<(u32, u32)> {
        Some((self.width?, self.height?))
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    side_data_list: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Returns true when `tool -version` runs successfully
pub fn tool_available(tool: &str) -> bool {
    Command::new(tool)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Run ffprobe on `path`
pub fn probe<P: AsRef<Path>>(path: P) -> Result<MediaInfo> {
    let path = path.as_ref();
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json", "-show_streams", "-show_format"])
        .arg(path)
        .output()
        .map_err(|e| VideoError::ProbeFailed {
            path: path.display().to_string(),
            reason: format!("could not run ffprobe: {}", e),
        })?;

    if !output.status.success() {
        return Err(VideoError::ProbeFailed {
            path: path.display().to_string(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }.into());
    }

    let json = String::from_utf8_lossy(&output.stdout);
    let info = parse_probe_output(&json, path)?;
    debug!("Probed {:?}: {:?}", path, info);
    Ok(info)
}

/// Parse `ffprobe -print_format json -show_streams -show_format` output
pub fn parse_probe_output(json: &str, path: &Path) -> Result<MediaInfo> {
    let parsed: ProbeOutput = serde_json::from_str(json).map_err(|e| VideoError::ProbeFailed {
        path: path.display().to_string(),
        reason: format!("invalid ffprobe output: {}", e),
    })?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let audio = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"));

    let duration = parsed
        .format
        .as_ref()
        .and_then(|f| parse_seconds(f.duration.as_deref()))
        .or_else(|| video.and_then(|s| parse_seconds(s.duration.as_deref())))
        .or_else(|| audio.and_then(|s| parse_seconds(s.duration.as_deref())))
        .unwrap_or(0.0);

    let (width, height) = match video {
        Some(stream) => match (stream.width, stream.height) {
            (Some(w), Some(h)) if is_quarter_turn(stream_rotation(stream)) => (Some(h), Some(w)),
            (w, h) => (w, h),
        },
        None => (None, None),
    };

    let fps = video.and_then(|s| {
        parse_rate(s.avg_frame_rate.as_deref()).or_else(|| parse_rate(s.r_frame_rate.as_deref()))
    });

    Ok(MediaInfo {
        width,
        height,
        fps,
        duration,
        has_video: video.is_some(),
        has_audio: audio.is_some(),
        video_codec: video.and_then(|s| s.codec_name.clone()),
    })
}

fn parse_seconds(value: Option<&str>) -> Option<f64> {
    value?.trim().parse::<f64>().ok().filter(|d| d.is_finite() && *d >= 0.0)
}

/// Parses "num/den" rates; "0/0" means unknown
fn parse_rate(value: Option<&str>) -> Option<f64> {
    let (num, den) = value?.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if num <= 0.0 || den <= 0.0 {
        return None;
    }
    Some(num / den)
}

/// Rotation in degrees from either the legacy `rotate` tag or the display matrix
fn stream_rotation(stream: &ProbeStream) -> i64 {
    if let Some(rotate) = stream.tags.get("rotate").and_then(|r| r.trim().parse::<f64>().ok()) {
        return rotate.round() as i64;
    }

    stream
        .side_data_list
        .iter()
        .find_map(|entry| entry.get("rotation").and_then(|r| r.as_f64()))
        .map(|r| r.round() as i64)
        .unwrap_or(0)
}

fn is_quarter_turn(degrees: i64) -> bool {
    degrees.rem_euclid(180) == 90
}

#[cfg(test)]
mod tests {
    use super::*;

    const LANDSCAPE_WITH_AUDIO: &str = r#"{
        "streams": [
            {"index": 0, "codec_name": "h264", "codec_type": "video", "width": 1280, "height": 720,
             "r_frame_rate": "30/1", "avg_frame_rate": "30000/1001", "duration": "4.004000"},
            {"index": 1, "codec_name": "aac", "codec_type": "audio", "duration": "4.010000"}
        ],
        "format": {"duration": "4.010000", "size": "123456"}
    }"#;

    #[test]
    fn test_parse_video_with_audio() {
        let info = parse_probe_output(LANDSCAPE_WITH_AUDIO, Path::new("gen.mp4")).unwrap();
        assert_eq!(info.display_size(), Some((1280, 720)));
        assert!((info.fps.unwrap() - 29.97).abs() < 0.01);
        assert!((info.duration - 4.01).abs() < 1e-9);
        assert!(info.has_video);
        assert!(info.has_audio);
        assert_eq!(info.video_codec.as_deref(), Some("h264"));
    }

    #[test]
    fn test_rotated_stream_swaps_dimensions() {
        let json = r#"{
            "streams": [
                {"codec_type": "video", "width": 1920, "height": 1080, "avg_frame_rate": "0/0",
                 "r_frame_rate": "24/1",
                 "side_data_list": [{"side_data_type": "Display Matrix", "rotation": -90}]}
            ],
            "format": {"duration": "2.0"}
        }"#;
        let info = parse_probe_output(json, Path::new("phone.mp4")).unwrap();
        assert_eq!(info.display_size(), Some((1080, 1920)));
        assert_eq!(info.fps, Some(24.0));
        assert!(!info.has_audio);
    }

    #[test]
    fn test_rotate_tag() {
        let json = r#"{
            "streams": [{"codec_type": "video", "width": 640, "height": 480, "tags": {"rotate": "270"}}],
            "format": {}
        }"#;
        let info = parse_probe_output(json, Path::new("old.mov")).unwrap();
        assert_eq!(info.display_size(), Some((480, 640)));
        assert_eq!(info.duration, 0.0);
    }

    #[test]
    fn test_audio_only() {
        let json = r#"{"streams": [{"codec_type": "audio", "duration": "3.0"}], "format": {"duration": "3.0"}}"#;
        let info = parse_probe_output(json, Path::new("bgm.mp3")).unwrap();
        assert!(!info.has_video);
        assert_eq!(info.display_size(), None);
        assert_eq!(info.duration, 3.0);
    }

    #[test]
    fn test_invalid_json() {
        assert!(parse_probe_output("not json", Path::new("x.mp4")).is_err());
    }
}
