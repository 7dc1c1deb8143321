use serde::Serialize;
use std::collections::BTreeSet;

use crate::error::NoteError;
use crate::paths;

/// A note and the tag set snapshotted for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub path: String,
    pub tags: BTreeSet<String>,
}

impl Note {
    pub fn new<I, S>(path: &str, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Note {
            path: paths::normalize(path),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn untagged(path: &str) -> Self {
        Note {
            path: paths::normalize(path),
            tags: BTreeSet::new(),
        }
    }

    /// Folder currently containing the note.
    pub fn folder(&self) -> String {
        paths::parent_folder(&self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "folder", rename_all = "snake_case")]
pub enum Classification {
    Destination(String),
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MoveOutcome {
    /// The note lives under an ignored prefix.
    Skipped,
    AlreadyInPlace,
    Moved { folder: String, path: String },
    /// Dry run: the note would move to `folder`.
    Planned { folder: String },
    MoveFailed { error: NoteError },
}

impl MoveOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            MoveOutcome::Skipped => "skipped",
            MoveOutcome::AlreadyInPlace => "in-place",
            MoveOutcome::Moved { .. } => "moved",
            MoveOutcome::Planned { .. } => "planned",
            MoveOutcome::MoveFailed { .. } => "failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, MoveOutcome::MoveFailed { .. })
    }
}

impl From<NoteError> for MoveOutcome {
    fn from(error: NoteError) -> Self {
        MoveOutcome::MoveFailed { error }
    }
}

/// What a vault path points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryRef {
    File(String),
    Folder(String),
    NotFound,
}

/// One element of a classification pass.
#[derive(Debug, Clone, Serialize)]
pub struct NoteResult {
    pub note: Note,
    #[serde(flatten)]
    pub outcome: MoveOutcome,
}
