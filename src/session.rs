//! Headless editing session.
//!
//! Wires the geometry engine to the snapshot history: every applied event
//! mutates the working annotation and records it according to the engine's
//! commit hint. A rendering shell drives this and nothing else; it owns no
//! annotation state of its own.

use crate::format::stream::{decode_file, encode_file};
use crate::format::StreamError;
use crate::history::{Commit, History};
use crate::model::{HelperEvent, ImageAnnotation, Transition};

/// One image being edited: the working annotation plus its history.
#[derive(Debug, Clone)]
pub struct EditSession {
    annotation: ImageAnnotation,
    history: History,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditSession {
    /// Start an empty session for a fresh image.
    pub fn new() -> Self {
        let annotation = ImageAnnotation::new();
        let history = History::new(annotation.clone());
        Self {
            annotation,
            history,
        }
    }

    /// Resume a session from a decoded annotation and its persisted
    /// snapshots.
    pub fn resume(annotation: ImageAnnotation, snapshots: Vec<ImageAnnotation>) -> Self {
        let history = History::from_snapshots(snapshots)
            .unwrap_or_else(|| History::new(annotation.clone()));
        Self {
            annotation,
            history,
        }
    }

    /// Replace everything with a different image's annotation. The caller is
    /// responsible for flushing the previous session first.
    pub fn open(&mut self, annotation: ImageAnnotation) {
        self.history.reset(annotation.clone());
        self.annotation = annotation;
    }

    pub fn annotation(&self) -> &ImageAnnotation {
        &self.annotation
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Feed one construction event through the engine and record the result.
    pub fn apply(&mut self, event: HelperEvent) -> Transition {
        let transition = self.annotation.apply(event);
        self.history
            .commit_hint(self.annotation.clone(), transition.commit);
        transition
    }

    /// Commit a transcription for one block and record the result.
    pub fn input_text(&mut self, index: usize, text: &str) -> Transition {
        let transition = self.annotation.input_text(index, text);
        self.history
            .commit_hint(self.annotation.clone(), transition.commit);
        transition
    }

    /// Mark one block as an illegible ignore region and record the result.
    pub fn mask_block(&mut self, index: usize) -> Transition {
        let transition = self.annotation.mask_block(index);
        self.history
            .commit_hint(self.annotation.clone(), transition.commit);
        transition
    }

    /// Record the working state explicitly, e.g. with [`Commit::Replace`] to
    /// coalesce a corner drag driven by the shell.
    pub fn commit(&mut self, kind: Commit) {
        self.history.commit(self.annotation.clone(), kind);
    }

    pub fn undo(&mut self) {
        self.annotation = self.history.undo().clone();
    }

    pub fn redo(&mut self) {
        self.annotation = self.history.redo().clone();
    }

    /// Serialize the session as a stream file: annotation plus compressed
    /// history companion.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StreamError> {
        encode_file(&self.annotation, self.history.snapshots())
    }

    /// Restore a session from a stream file.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StreamError> {
        let (annotation, snapshots) = decode_file(bytes)?;
        Ok(Self::resume(annotation, snapshots))
    }
}
