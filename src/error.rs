use thiserror::Error;

/// Main error type for the Greeting-Compositor library
#[derive(Error, Debug)]
pub enum CompositorError {
    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    #[error("Audio processing error: {0}")]
    Audio(#[from] AudioError),

    #[error("Video processing error: {0}")]
    Video(#[from] VideoError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Download error: {0}")]
    Fetch(#[from] FetchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Input checks performed before anything is decoded
#[derive(Error, Debug)]
pub enum PreconditionError {
    #[error("Missing {role} clip: {path}")]
    MissingAsset { role: String, path: String },

    #[error("Generated clip {path} is {size} bytes, expected at least {minimum}")]
    GeneratedClipTooSmall { path: String, size: u64, minimum: u64 },

    #[error("{tool} not found on PATH")]
    ToolUnavailable { tool: String },
}

/// Audio-specific errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to load audio file: {path} ({reason})")]
    LoadFailed { path: String, reason: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Audio extraction failed for {path}: {reason}")]
    ExtractionFailed { path: String, reason: String },

    #[error("Failed to write audio file: {path} ({reason})")]
    WriteFailed { path: String, reason: String },

    #[error("Invalid audio parameters: {details}")]
    InvalidParameters { details: String },
}

/// Video-specific errors
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Failed to probe media file {path}: {reason}")]
    ProbeFailed { path: String, reason: String },

    #[error("No video stream in {path}")]
    NoVideoStream { path: String },

    #[error("Video decoding failed for {path}: {reason}")]
    DecodingFailed { path: String, reason: String },

    #[error("The {role} segment contains no frames")]
    EmptySegment { role: String },

    #[error("Frame size mismatch in {role} segment: got {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    FrameSizeMismatch {
        role: String,
        actual_width: u32,
        actual_height: u32,
        expected_width: u32,
        expected_height: u32,
    },

    #[error("Invalid video parameters: {details}")]
    InvalidParameters { details: String },
}

/// Encoding and muxing errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Video encoding failed: {reason}")]
    EncodingFailed { reason: String },

    #[error("Muxing audio failed: {reason}")]
    MuxFailed { reason: String },

    #[error("Could not create output file: {reason}")]
    OutputFile { reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path} ({reason})")]
    ParseFailed { path: String, reason: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Illegal moves through the greeting workflow
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Cannot {event} while {state}")]
    InvalidTransition { state: String, event: String },
}

/// Errors while downloading the generated clip
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
}

/// Convenience type alias for Results using CompositorError
pub type Result<T> = std::result::Result<T, CompositorError>;

impl CompositorError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// True when the failure was caught before any media was decoded
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Precondition(PreconditionError::MissingAsset { role, path }) => {
                format!("The {} clip '{}' could not be found. Please make sure it exists before composing.", role, path)
            }
            Self::Precondition(PreconditionError::GeneratedClipTooSmall { path, .. }) => {
                format!("The generated clip '{}' looks empty or truncated. Please generate it again.", path)
            }
            Self::Precondition(PreconditionError::ToolUnavailable { tool }) => {
                format!("'{}' is required to compose videos. Please install FFmpeg.", tool)
            }
            Self::Video(VideoError::DecodingFailed { path, .. }) => {
                format!("Could not read video file '{}'. Please check it is a supported format.", path)
            }
            Self::Audio(AudioError::LoadFailed { path, .. }) => {
                format!("Could not load audio file '{}'. Please check the file exists and is a supported format.", path)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}
