//! Undo/redo history over committed annotation snapshots.
//!
//! The history keeps full deep-copy snapshots rather than command deltas:
//! annotations are small and the geometry engine mutates them in ways that
//! are awkward to invert. Three commit kinds exist (see [`Commit`]), and
//! the baseline snapshot installed at load time is never removed, so
//! [`History::undo`] is always safe to call.

use crate::model::{CommitHint, ImageAnnotation};

/// How a snapshot enters the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// Durable: clears the redo stack and appends.
    Strong,
    /// Provisional: held aside without touching the stacks; the next commit
    /// of any kind overwrites it, and an undo discards it for free.
    Weak,
    /// Coalescing: replaces the most recent entry instead of appending
    /// (e.g. a corner still being dragged).
    Replace,
}

impl Commit {
    /// Map a geometry-engine commit hint to a history commit, if any.
    pub fn from_hint(hint: CommitHint) -> Option<Commit> {
        match hint {
            CommitHint::Strong => Some(Commit::Strong),
            CommitHint::Weak => Some(Commit::Weak),
            CommitHint::None => None,
        }
    }
}

/// Undo/redo stacks of full snapshots.
///
/// `past` always holds at least one element: the load/reset baseline. The
/// current state is the pending weak snapshot when one exists, otherwise the
/// top of `past`.
#[derive(Debug, Clone, Default)]
pub struct History {
    past: Vec<ImageAnnotation>,
    future: Vec<ImageAnnotation>,
    pending_weak: Option<ImageAnnotation>,
}

impl History {
    /// Start a history with `baseline` as the permanent floor entry.
    pub fn new(baseline: ImageAnnotation) -> Self {
        Self {
            past: vec![baseline],
            future: Vec::new(),
            pending_weak: None,
        }
    }

    /// Drop everything and install a new baseline (image switch).
    pub fn reset(&mut self, baseline: ImageAnnotation) {
        self.past.clear();
        self.past.push(baseline);
        self.future.clear();
        self.pending_weak = None;
    }

    /// Record a snapshot.
    pub fn commit(&mut self, snapshot: ImageAnnotation, kind: Commit) {
        match kind {
            Commit::Strong => {
                self.pending_weak = None;
                self.future.clear();
                self.past.push(snapshot);
            }
            Commit::Weak => {
                self.pending_weak = Some(snapshot);
            }
            Commit::Replace => {
                self.pending_weak = None;
                self.future.clear();
                self.past.pop();
                self.past.push(snapshot);
            }
        }
    }

    /// Record a snapshot driven by a geometry-engine hint. Returns whether
    /// anything was recorded.
    pub fn commit_hint(&mut self, snapshot: ImageAnnotation, hint: CommitHint) -> bool {
        match Commit::from_hint(hint) {
            Some(kind) => {
                self.commit(snapshot, kind);
                true
            }
            None => false,
        }
    }

    /// The state the editor should display.
    pub fn current(&self) -> &ImageAnnotation {
        self.pending_weak.as_ref().unwrap_or_else(|| {
            self.past.last().expect("history baseline is never removed")
        })
    }

    pub fn can_undo(&self) -> bool {
        self.pending_weak.is_some() || self.past.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Step back one committed state and return the new current state.
    ///
    /// A pending weak snapshot is discarded without popping the stacks and
    /// without consuming a redo slot. At the baseline this is a no-op.
    pub fn undo(&mut self) -> &ImageAnnotation {
        if self.pending_weak.take().is_none() && self.past.len() > 1 {
            if let Some(snapshot) = self.past.pop() {
                self.future.push(snapshot);
            }
        }
        self.current()
    }

    /// Step forward one undone state and return the new current state.
    pub fn redo(&mut self) -> &ImageAnnotation {
        self.pending_weak = None;
        if let Some(snapshot) = self.future.pop() {
            self.past.push(snapshot);
        }
        self.current()
    }

    /// Number of entries on the undo stack (including the baseline).
    pub fn depth(&self) -> usize {
        self.past.len()
    }

    /// Committed snapshots from oldest to newest, for persistence. The
    /// pending weak state is deliberately not included.
    pub fn snapshots(&self) -> &[ImageAnnotation] {
        &self.past
    }

    /// Rebuild a history from persisted snapshots; the last one becomes the
    /// current state. Returns `None` for an empty sequence.
    pub fn from_snapshots(snapshots: Vec<ImageAnnotation>) -> Option<Self> {
        if snapshots.is_empty() {
            return None;
        }
        Some(Self {
            past: snapshots,
            future: Vec::new(),
            pending_weak: None,
        })
    }
}
