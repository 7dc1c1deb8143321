use anyhow::{Context, Result};
use elements_core::classifier;
use elements_core::models::{Classification, MoveOutcome, Note, NoteResult};
use elements_core::paths;
use elements_core::pipeline::{self, CancelHandle, PassOptions, PassSummary};
use elements_core::store::NoteStore;
use elements_storage::journal;
use elements_storage::models::{NewMove, RunTotals};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::session::Session;

#[derive(Debug, Clone, Default)]
pub struct OrganizeOptions {
    pub dry_run: bool,
    pub concurrency: usize,
    pub cancel: CancelHandle,
}

#[derive(Debug, Serialize)]
pub struct OrganizeReport {
    pub run_id: Option<i64>,
    pub summary: PassSummary,
    pub results: Vec<NoteResult>,
}

#[derive(Debug, Serialize)]
pub struct PreviewEntry {
    pub path: String,
    pub tags: Vec<String>,
    pub destination: Option<String>,
    pub ignored: bool,
    pub error: Option<String>,
}

/// Runs one batch pass over the whole vault. `on_result` sees each outcome
/// as soon as it is available.
pub async fn organize(
    session: &Session,
    opts: OrganizeOptions,
    mut on_result: impl FnMut(&NoteResult),
) -> Result<OrganizeReport> {
    let pool = if opts.dry_run {
        None
    } else {
        session.journal().await?
    };
    let options = PassOptions {
        concurrency: opts.concurrency.max(1),
        dry_run: opts.dry_run,
        cancel: opts.cancel.clone(),
    };
    // Begin the run before any note moves.
    let run_id = match &pool {
        Some(pool) => Some(journal::begin_run(pool, opts.dry_run, 0).await?),
        None => None,
    };
    let listed = pipeline::classify_vault(session.vault.clone(), session.classification(), options).await;
    let mut pass = match listed {
        Ok(pass) => pass,
        Err(e) => {
            if let (Some(pool), Some(run_id)) = (&pool, run_id) {
                journal::finish_run(pool, run_id, "failed", &RunTotals::default()).await?;
            }
            return Err(anyhow::Error::new(e).context("listing notes"));
        }
    };

    let mut results = Vec::new();
    let mut journal_error = None;
    while let Some(result) = pass.next().await {
        on_result(&result);
        if let (Some(pool), Some(run_id)) = (&pool, run_id) {
            if let Err(e) = record_outcome(pool, run_id, &result).await {
                warn!(path = %result.note.path, error = %e, "journal write failed, cancelling pass");
                pass.cancel_handle().cancel();
                journal_error.get_or_insert(e);
            }
        }
        results.push(result);
    }

    let summary = pass.summary();
    if let (Some(pool), Some(run_id)) = (&pool, run_id) {
        let status = match (&journal_error, summary.cancelled) {
            (Some(_), _) => "failed",
            (None, true) => "cancelled",
            (None, false) => "completed",
        };
        journal::finish_run(pool, run_id, status, &totals(&summary)).await?;
    }
    if let Some(e) = journal_error {
        return Err(e.context("recording moves"));
    }
    info!(
        moved = summary.moved,
        failed = summary.failed,
        skipped = summary.skipped,
        "organize finished"
    );
    Ok(OrganizeReport {
        run_id,
        summary,
        results,
    })
}

/// Classifies and moves a single note and journals the outcome.
pub async fn move_one(session: &Session, path: &str) -> Result<NoteResult> {
    let result = process_note(session, path).await;
    journal_single(session, &result).await?;
    Ok(result)
}

/// Classifies and moves one note. A failed tag read becomes the note's
/// `MoveFailed`, as in a batch pass.
pub async fn process_note(session: &Session, path: &str) -> NoteResult {
    let config = session.classification();
    match session.vault.snapshot(path).await {
        Ok(note) => {
            let outcome = classifier::classify_and_move(&note, &config, session.vault.as_ref()).await;
            NoteResult { note, outcome }
        }
        Err(error) => {
            warn!(path = %path, %error, "could not read note");
            NoteResult {
                note: Note::untagged(path),
                outcome: MoveOutcome::MoveFailed { error },
            }
        }
    }
}

/// Journals a one-note run when the outcome changed or failed something.
pub async fn journal_single(session: &Session, result: &NoteResult) -> Result<()> {
    if !matches!(
        result.outcome,
        MoveOutcome::Moved { .. } | MoveOutcome::MoveFailed { .. }
    ) {
        return Ok(());
    }
    let Some(pool) = session.journal().await? else {
        return Ok(());
    };
    let run_id = journal::begin_run(&pool, false, 1).await?;
    record_outcome(&pool, run_id, result).await?;
    let mut summary = PassSummary {
        total: 1,
        ..PassSummary::default()
    };
    summary.record(&result.outcome);
    journal::finish_run(&pool, run_id, "completed", &totals(&summary)).await?;
    Ok(())
}

/// Destinations without moving anything. An empty `paths` previews the
/// whole vault.
pub async fn preview(session: &Session, paths: &[String]) -> Result<Vec<PreviewEntry>> {
    let targets = if paths.is_empty() {
        session.vault.list_notes().await.context("listing notes")?
    } else {
        paths.to_vec()
    };
    let config = session.classification();
    let mut out = Vec::with_capacity(targets.len());
    for path in targets {
        if paths::is_ignored(&path, &config.ignored_path_prefixes) {
            out.push(PreviewEntry {
                path: paths::normalize(&path),
                tags: Vec::new(),
                destination: None,
                ignored: true,
                error: None,
            });
            continue;
        }
        let entry = match session.vault.snapshot(&path).await {
            Ok(note) => {
                let decision = classifier::classify(&note, &config);
                PreviewEntry {
                    path: note.path.clone(),
                    tags: note.tags.iter().cloned().collect(),
                    ignored: decision == Classification::Ignored,
                    destination: match decision {
                        Classification::Destination(folder) => Some(folder),
                        Classification::Ignored => None,
                    },
                    error: None,
                }
            }
            Err(e) => PreviewEntry {
                path: paths::normalize(&path),
                tags: Vec::new(),
                destination: None,
                ignored: false,
                error: Some(e.to_string()),
            },
        };
        out.push(entry);
    }
    Ok(out)
}

async fn record_outcome(pool: &SqlitePool, run_id: i64, result: &NoteResult) -> Result<()> {
    let entry = match &result.outcome {
        MoveOutcome::Moved { folder, path } => NewMove {
            from_path: &result.note.path,
            to_path: Some(path.as_str()),
            folder: Some(folder.as_str()),
            status: "moved",
            error: None,
        },
        MoveOutcome::MoveFailed { error } => NewMove {
            from_path: &result.note.path,
            to_path: None,
            folder: None,
            status: "failed",
            error: Some(error.to_string()),
        },
        _ => return Ok(()),
    };
    journal::record_move(pool, run_id, &entry).await
}

fn totals(summary: &PassSummary) -> RunTotals {
    RunTotals {
        total: summary.total as i64,
        moved: summary.moved as i64,
        failed: summary.failed as i64,
        skipped: summary.skipped as i64,
        in_place: summary.already_in_place as i64,
    }
}
