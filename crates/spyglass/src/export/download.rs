use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::ExportArtifact;
use crate::core::DiagramError;

/// Something that can hand an artifact to the user
///
/// `create` allocates a handle (an object URL, a temp file), `trigger` starts
/// the download, `release` frees the handle. [`deliver`] guarantees `release`
/// runs once for every created handle.
pub trait DownloadSink {
    type Handle;

    fn create(&mut self, artifact: &ExportArtifact) -> Result<Self::Handle, DiagramError>;
    fn trigger(&mut self, handle: &Self::Handle) -> Result<(), DiagramError>;
    fn release(&mut self, handle: Self::Handle);
}

struct HandleGuard<'s, S: DownloadSink> {
    sink: &'s mut S,
    handle: Option<S::Handle>,
}

impl<S: DownloadSink> Drop for HandleGuard<'_, S> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.sink.release(handle);
        }
    }
}

/// Create, trigger and release a download
pub fn deliver<S: DownloadSink>(
    sink: &mut S,
    artifact: &ExportArtifact,
) -> Result<(), DiagramError> {
    let handle = sink.create(artifact)?;
    let mut guard = HandleGuard {
        sink,
        handle: Some(handle),
    };
    if let Some(handle) = guard.handle.as_ref() {
        guard.sink.trigger(handle)?;
    }
    debug!(filename = %artifact.filename, "Download triggered");
    Ok(())
}

/// Writes artifacts into a directory
///
/// The file is staged next to its target and renamed into place on trigger,
/// so a failed export never leaves a partial file behind.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
    delivered: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct StagedFile {
    staging: PathBuf,
    target: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            delivered: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths written so far
    pub fn delivered(&self) -> &[PathBuf] {
        &self.delivered
    }
}

impl DownloadSink for FileSink {
    type Handle = StagedFile;

    fn create(&mut self, artifact: &ExportArtifact) -> Result<StagedFile, DiagramError> {
        let target = self.dir.join(&artifact.filename);
        let staging = self.dir.join(format!(".{}.part", artifact.filename));
        let staged = StagedFile { staging, target };
        if let Err(err) = fs::write(&staged.staging, &artifact.bytes) {
            // No handle reaches the caller, so a partial write is cleaned up here
            self.release(staged);
            return Err(err.into());
        }
        Ok(staged)
    }

    fn trigger(&mut self, handle: &StagedFile) -> Result<(), DiagramError> {
        fs::rename(&handle.staging, &handle.target)?;
        info!(path = %handle.target.display(), "Wrote export");
        self.delivered.push(handle.target.clone());
        Ok(())
    }

    fn release(&mut self, handle: StagedFile) {
        if handle.staging.is_file() {
            if let Err(err) = fs::remove_file(&handle.staging) {
                warn!(
                    path = %handle.staging.display(),
                    error = %err,
                    "Could not remove staged export"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::SVG_MIME_TYPE;

    /// Records every call in order
    #[derive(Default)]
    struct RecordingSink {
        calls: Vec<String>,
        fail_trigger: bool,
        next: u32,
    }

    impl DownloadSink for RecordingSink {
        type Handle = u32;

        fn create(&mut self, artifact: &ExportArtifact) -> Result<u32, DiagramError> {
            self.next += 1;
            self.calls.push(format!("create {}", artifact.filename));
            Ok(self.next)
        }

        fn trigger(&mut self, handle: &u32) -> Result<(), DiagramError> {
            self.calls.push(format!("trigger {}", handle));
            if self.fail_trigger {
                Err(DiagramError::render_failure("download blocked"))
            } else {
                Ok(())
            }
        }

        fn release(&mut self, handle: u32) {
            self.calls.push(format!("release {}", handle));
        }
    }

    fn artifact() -> ExportArtifact {
        ExportArtifact {
            filename: "repo-diagram.svg".to_string(),
            mime_type: SVG_MIME_TYPE,
            bytes: b"<svg/>".to_vec(),
        }
    }

    #[test]
    fn test_handle_released_after_trigger() {
        let mut sink = RecordingSink::default();
        deliver(&mut sink, &artifact()).unwrap();
        assert_eq!(
            sink.calls,
            ["create repo-diagram.svg", "trigger 1", "release 1"]
        );
    }

    #[test]
    fn test_handle_released_when_trigger_fails() {
        let mut sink = RecordingSink {
            fail_trigger: true,
            ..Default::default()
        };
        assert!(deliver(&mut sink, &artifact()).is_err());
        assert_eq!(sink.calls.last().map(String::as_str), Some("release 1"));
    }

    #[test]
    fn test_failed_staging_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::new(dir.path());
        let artifact = ExportArtifact {
            filename: "missing/repo-diagram.svg".to_string(),
            ..artifact()
        };

        assert!(deliver(&mut sink, &artifact).is_err());
        assert!(sink.delivered().is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_release_removes_unrenamed_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::new(dir.path());
        let handle = sink.create(&artifact()).unwrap();
        assert!(dir.path().join(".repo-diagram.svg.part").is_file());

        sink.release(handle);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
