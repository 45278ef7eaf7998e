//! Greeting workflow: upload, preview confirmation, composition, result
//!
//! Every move goes through an explicit transition; a move that does not
//! apply in the current state is rejected with
//! [`WorkflowError::InvalidTransition`] and leaves the state untouched.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::composition::{ComposedVideo, CompositionEngine};
use crate::error::{Result, WorkflowError};

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowState {
    /// Waiting for a photo to turn into a greeting image
    AwaitingUpload,

    /// A generated image is shown and waits for the user's go-ahead
    AwaitingConfirmation { preview_url: String },

    /// The confirmed image is being animated and composed
    Composing { preview_url: String },

    /// The final video is available
    Ready { video: ComposedVideo },

    /// Composition failed; `reason` is suitable for display
    Failed { reason: String },
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowState::AwaitingUpload => "awaiting upload",
            WorkflowState::AwaitingConfirmation { .. } => "awaiting confirmation",
            WorkflowState::Composing { .. } => "composing",
            WorkflowState::Ready { .. } => "ready",
            WorkflowState::Failed { .. } => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Workflow {
    state: WorkflowState,
}

impl Workflow {
    pub fn new() -> Self {
        Self { state: WorkflowState::AwaitingUpload }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// The composed video once the workflow is ready
    pub fn video(&self) -> Option<&ComposedVideo> {
        match &self.state {
            WorkflowState::Ready { video } => Some(video),
            _ => None,
        }
    }

    pub fn preview_url(&self) -> Option<&str> {
        match &self.state {
            WorkflowState::AwaitingConfirmation { preview_url } | WorkflowState::Composing { preview_url } => {
                Some(preview_url)
            }
            _ => None,
        }
    }

    /// A greeting image was generated and should be previewed
    pub fn image_generated<S: Into<String>>(&mut self, preview_url: S) -> Result<()> {
        match &self.state {
            WorkflowState::AwaitingUpload => {
                self.transition(WorkflowState::AwaitingConfirmation { preview_url: preview_url.into() });
                Ok(())
            }
            _ => Err(self.invalid("show a generated image")),
        }
    }

    /// Discard the preview and start over with a new upload
    pub fn reject_preview(&mut self) -> Result<()> {
        match &self.state {
            WorkflowState::AwaitingConfirmation { .. } => {
                self.transition(WorkflowState::AwaitingUpload);
                Ok(())
            }
            _ => Err(self.invalid("reject the preview")),
        }
    }

    /// Accept the preview and begin composing
    pub fn confirm(&mut self) -> Result<()> {
        match &self.state {
            WorkflowState::AwaitingConfirmation { preview_url } => {
                let preview_url = preview_url.clone();
                self.transition(WorkflowState::Composing { preview_url });
                Ok(())
            }
            _ => Err(self.invalid("confirm the preview")),
        }
    }

    /// Record the outcome of composition
    ///
    /// The composition error (if any) is handed back after the state has
    /// moved to `Failed`.
    pub fn finish(&mut self, outcome: Result<ComposedVideo>) -> Result<ComposedVideo> {
        if !matches!(self.state, WorkflowState::Composing { .. }) {
            return Err(self.invalid("finish composing"));
        }

        match outcome {
            Ok(video) => {
                self.transition(WorkflowState::Ready { video: video.clone() });
                Ok(video)
            }
            Err(e) => {
                warn!("Composition failed: {}", e);
                self.transition(WorkflowState::Failed { reason: e.user_message() });
                Err(e)
            }
        }
    }

    /// Back to the start from any state
    pub fn reset(&mut self) {
        self.transition(WorkflowState::AwaitingUpload);
    }

    /// Confirm, compose `generated` and record the result
    pub fn compose(&mut self, engine: &CompositionEngine, generated: &Path) -> Result<ComposedVideo> {
        self.confirm()?;
        let outcome = engine.compose(generated);
        self.finish(outcome)
    }

    /// Async counterpart of [`compose`](Self::compose) running on the blocking pool
    pub async fn compose_in_background(&mut self, engine: &CompositionEngine, generated: PathBuf) -> Result<ComposedVideo> {
        self.confirm()?;
        let outcome = engine.compose_in_background(generated).await;
        self.finish(outcome)
    }

    fn transition(&mut self, next: WorkflowState) {
        debug!("Workflow: {} -> {}", self.state, next);
        self.state = next;
    }

    fn invalid(&self, event: &str) -> crate::error::CompositorError {
        WorkflowError::InvalidTransition {
            state: self.state.to_string(),
            event: event.to_string(),
        }
        .into()
    }
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioSource;
    use crate::composition::CompositionSpec;
    use crate::error::{CompositorError, ExportError};

    fn video() -> ComposedVideo {
        ComposedVideo {
            path: PathBuf::from("/tmp/greeting_test.mp4"),
            duration: 8.0,
            frame_count: 192,
            width: 1080,
            height: 1920,
            file_size: 1024,
            audio: AudioSource::Background,
        }
    }

    fn awaiting_confirmation() -> Workflow {
        let mut workflow = Workflow::new();
        workflow.image_generated("https://cdn.example.com/cny.png").unwrap();
        workflow
    }

    #[test]
    fn test_happy_path() {
        let mut workflow = awaiting_confirmation();
        assert_eq!(workflow.preview_url(), Some("https://cdn.example.com/cny.png"));

        workflow.confirm().unwrap();
        assert!(matches!(workflow.state(), WorkflowState::Composing { .. }));

        let finished = workflow.finish(Ok(video())).unwrap();
        assert_eq!(finished, video());
        assert_eq!(workflow.video(), Some(&video()));
    }

    #[test]
    fn test_reject_preview_returns_to_upload() {
        let mut workflow = awaiting_confirmation();
        workflow.reject_preview().unwrap();
        assert_eq!(workflow.state(), &WorkflowState::AwaitingUpload);
        assert!(workflow.preview_url().is_none());
    }

    #[test]
    fn test_failure_is_recorded_and_returned() {
        let mut workflow = awaiting_confirmation();
        workflow.confirm().unwrap();

        let err = workflow
            .finish(Err(ExportError::MuxFailed { reason: "no space left".to_string() }.into()))
            .unwrap_err();

        assert!(matches!(err, CompositorError::Export(_)));
        match workflow.state() {
            WorkflowState::Failed { reason } => assert!(reason.contains("no space left")),
            other => panic!("expected Failed, got {:?}", other),
        }

        workflow.reset();
        assert_eq!(workflow.state(), &WorkflowState::AwaitingUpload);
    }

    #[test]
    fn test_invalid_transitions_leave_state_alone() {
        let mut workflow = Workflow::new();

        let err = workflow.confirm().unwrap_err();
        assert_eq!(err.to_string(), "Workflow error: Cannot confirm the preview while awaiting upload");
        assert_eq!(workflow.state(), &WorkflowState::AwaitingUpload);

        assert!(workflow.reject_preview().is_err());
        assert!(workflow.finish(Ok(video())).is_err());
        assert!(workflow.video().is_none());

        let mut workflow = awaiting_confirmation();
        assert!(workflow.image_generated("https://cdn.example.com/other.png").is_err());
        assert_eq!(workflow.preview_url(), Some("https://cdn.example.com/cny.png"));
    }

    #[test]
    fn test_compose_failure_moves_to_failed() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = CompositionSpec::default();
        spec.intro = dir.path().join("intro.mp4");
        spec.outro = dir.path().join("outro.mp4");
        let engine = CompositionEngine::with_spec(spec);

        let mut workflow = awaiting_confirmation();
        let err = workflow.compose(&engine, &dir.path().join("generated.mp4")).unwrap_err();

        assert!(err.is_precondition());
        assert!(matches!(workflow.state(), WorkflowState::Failed { .. }));
    }

    #[tokio::test]
    async fn test_compose_in_background_requires_confirmation_state() {
        let engine = CompositionEngine::with_spec(CompositionSpec::default());
        let mut workflow = Workflow::new();

        let err = workflow
            .compose_in_background(&engine, PathBuf::from("generated.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, CompositorError::Workflow(_)));
        assert_eq!(workflow.state(), &WorkflowState::AwaitingUpload);
    }
}
