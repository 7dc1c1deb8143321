//! Note store abstraction: where notes are listed, read and moved.

use std::collections::BTreeSet;

use crate::error::NoteError;
use crate::models::{EntryRef, Note};

#[async_trait::async_trait]
pub trait NoteStore: Send + Sync {
    /// Vault paths of every candidate note.
    async fn list_notes(&self) -> Result<Vec<String>, NoteError>;

    /// Current tag set of the note at `path`, without leading `#`.
    async fn read_tags(&self, path: &str) -> Result<BTreeSet<String>, NoteError>;

    async fn resolve(&self, path: &str) -> EntryRef;

    /// Moves the note into `folder`, keeping its file name unless a conflict
    /// policy renames it. Returns the new vault path.
    async fn move_note(&self, path: &str, folder: &str) -> Result<String, NoteError>;

    /// Reads the note's tags once and freezes them into a [`Note`].
    async fn snapshot(&self, path: &str) -> Result<Note, NoteError> {
        let tags = self.read_tags(path).await?;
        Ok(Note::new(path, tags))
    }
}
