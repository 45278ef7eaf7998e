//! Helpers for long-running ffmpeg children

use std::io::{self, Read};
use std::process::Child;
use std::thread::{self, JoinHandle};

/// Collects a child's stderr on a background thread
///
/// ffmpeg blocks once the stderr pipe buffer is full, so anything that
/// streams through stdin/stdout must keep stderr drained from spawn onwards.
pub(crate) struct StderrDrain {
    handle: Option<JoinHandle<io::Result<Vec<u8>>>>,
}

impl StderrDrain {
    /// Take `child`'s stderr pipe (if any) and start reading it
    pub(crate) fn spawn(child: &mut Child) -> Self {
        let handle = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut bytes = Vec::new();
                stderr.read_to_end(&mut bytes)?;
                Ok(bytes)
            })
        });
        Self { handle }
    }

    /// Wait for end of stream and return what was written
    ///
    /// A drain that failed is reported in the returned text.
    pub(crate) fn collect(&mut self) -> String {
        let Some(handle) = self.handle.take() else {
            return String::new();
        };

        match handle.join() {
            Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).trim().to_string(),
            Ok(Err(e)) => format!("(stderr unreadable: {})", e),
            Err(_) => "(stderr drain thread panicked)".to_string(),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};

    #[test]
    fn test_drain_keeps_noisy_child_moving() {
        let mut child = Command::new("sh")
            .args(["-c", "head -c 262144 /dev/zero | tr '\\0' x >&2; printf done"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let mut drain = StderrDrain::spawn(&mut child);

        let mut stdout = String::new();
        child.stdout.take().unwrap().read_to_string(&mut stdout).unwrap();
        assert!(child.wait().unwrap().success());

        assert_eq!(stdout, "done");
        assert_eq!(drain.collect().len(), 262144);
        assert_eq!(drain.collect(), "");
    }

    #[test]
    fn test_child_without_stderr_pipe() {
        let mut child = Command::new("sh")
            .args(["-c", "true"])
            .stderr(Stdio::null())
            .spawn()
            .unwrap();
        let mut drain = StderrDrain::spawn(&mut child);
        child.wait().unwrap();
        assert_eq!(drain.collect(), "");
    }
}
