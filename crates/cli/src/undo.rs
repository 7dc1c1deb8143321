use anyhow::{bail, Result};
use elements_core::models::EntryRef;
use elements_core::store::NoteStore;
use elements_storage::journal;
use serde::Serialize;
use tracing::{info, warn};

use crate::session::Session;

#[derive(Debug, Default, Serialize)]
pub struct UndoReport {
    pub run_id: Option<i64>,
    pub restored: Vec<String>,
    pub skipped: Vec<SkippedUndo>,
}

#[derive(Debug, Serialize)]
pub struct SkippedUndo {
    pub path: String,
    pub reason: String,
}

/// Moves the notes of a run back where they came from, newest move first.
/// Defaults to the latest run that still has moves to revert.
pub async fn undo_run(session: &Session, run_id: Option<i64>) -> Result<UndoReport> {
    let Some(pool) = session.journal().await? else {
        bail!("journal is disabled; nothing to undo");
    };
    let run_id = match run_id {
        Some(id) => id,
        None => match journal::latest_undoable_run(&pool).await? {
            Some(id) => id,
            None => return Ok(UndoReport::default()),
        },
    };

    let mut report = UndoReport {
        run_id: Some(run_id),
        ..UndoReport::default()
    };
    let moves = journal::moves_for_run(&pool, run_id).await?;
    for record in moves.iter().rev().filter(|m| m.status == "moved") {
        let Some(moved_to) = record.to_path.as_deref() else {
            continue;
        };
        let skip = |reason: &str| SkippedUndo {
            path: record.from_path.clone(),
            reason: reason.to_string(),
        };
        if session.vault.resolve(&record.from_path).await != EntryRef::NotFound {
            // skip to avoid overwrite
            report.skipped.push(skip("original location is occupied"));
            continue;
        }
        if !matches!(session.vault.resolve(moved_to).await, EntryRef::File(_)) {
            report.skipped.push(skip("moved note no longer exists"));
            continue;
        }
        match session.vault.relocate(moved_to, &record.from_path).await {
            Ok(()) => {
                journal::mark_undone(&pool, record.id).await?;
                info!(from = moved_to, to = %record.from_path, "restored note");
                report.restored.push(record.from_path.clone());
            }
            Err(e) => {
                warn!(path = %record.from_path, error = %e, "undo failed");
                report.skipped.push(skip(&e.to_string()));
            }
        }
    }
    Ok(report)
}
