//! Batch classification passes.
//!
//! A pass runs on a tokio task and hands results to the caller one at a time
//! through a bounded channel, so progress can be rendered as it happens. A
//! note is only started once a channel slot is reserved for its result, so at
//! most `concurrency` notes run ahead of the consumer. A pass is consumed
//! once; run another to reprocess the notes.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, OwnedPermit};
use tokio::task::{self, JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::classifier;
use crate::config::ClassificationConfig;
use crate::error::NoteError;
use crate::models::{MoveOutcome, Note, NoteResult};
use crate::paths;
use crate::store::NoteStore;

/// Stops a pass from starting new notes. Notes already in flight finish.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct PassOptions {
    /// Notes processed at once. With 1, results arrive in input order.
    pub concurrency: usize,
    /// Report `Planned` instead of moving.
    pub dry_run: bool,
    pub cancel: CancelHandle,
}

impl Default for PassOptions {
    fn default() -> Self {
        PassOptions {
            concurrency: 1,
            dry_run: false,
            cancel: CancelHandle::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PassSummary {
    pub total: usize,
    pub processed: usize,
    pub moved: usize,
    pub planned: usize,
    pub already_in_place: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: bool,
}

impl PassSummary {
    pub fn record(&mut self, outcome: &MoveOutcome) {
        self.processed += 1;
        match outcome {
            MoveOutcome::Skipped => self.skipped += 1,
            MoveOutcome::AlreadyInPlace => self.already_in_place += 1,
            MoveOutcome::Moved { .. } => self.moved += 1,
            MoveOutcome::Planned { .. } => self.planned += 1,
            MoveOutcome::MoveFailed { .. } => self.failed += 1,
        }
    }

    pub fn unprocessed(&self) -> usize {
        self.total.saturating_sub(self.processed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub summary: PassSummary,
    pub results: Vec<NoteResult>,
}

enum PendingNote {
    Loaded(Note),
    Unread(String),
}

impl PendingNote {
    fn path(&self) -> &str {
        match self {
            PendingNote::Loaded(note) => &note.path,
            PendingNote::Unread(path) => path,
        }
    }
}

/// Where a started note's result goes.
struct Slot {
    path: String,
    permit: OwnedPermit<NoteResult>,
}

/// Lazy sequence of per-note outcomes.
pub struct ClassificationPass {
    rx: mpsc::Receiver<NoteResult>,
    cancel: CancelHandle,
    summary: PassSummary,
}

impl ClassificationPass {
    pub async fn next(&mut self) -> Option<NoteResult> {
        let result = self.rx.recv().await?;
        self.summary.record(&result.outcome);
        Some(result)
    }

    /// Number of notes the pass was started with.
    pub fn total(&self) -> usize {
        self.summary.total
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Counts of everything yielded so far.
    pub fn summary(&self) -> PassSummary {
        let mut summary = self.summary.clone();
        summary.cancelled = self.cancel.is_cancelled() && summary.unprocessed() > 0;
        summary
    }

    /// Drains the remaining results.
    pub async fn finish(mut self) -> PassReport {
        let mut results = Vec::new();
        while let Some(result) = self.next().await {
            results.push(result);
        }
        let summary = self.summary();
        info!(
            total = summary.total,
            moved = summary.moved,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "classification pass finished"
        );
        PassReport { summary, results }
    }
}

/// Classifies and moves each of `notes` independently. Must be called from
/// within a tokio runtime.
pub fn classify_all_notes(
    notes: Vec<Note>,
    config: Arc<ClassificationConfig>,
    store: Arc<dyn NoteStore>,
    options: PassOptions,
) -> ClassificationPass {
    let pending = notes.into_iter().map(PendingNote::Loaded).collect();
    start(pending, config, store, options)
}

/// Lists every note in `store` and runs a pass over them. Tags are read
/// inside the pass; a failed read becomes that note's `MoveFailed`.
pub async fn classify_vault(
    store: Arc<dyn NoteStore>,
    config: Arc<ClassificationConfig>,
    options: PassOptions,
) -> Result<ClassificationPass, NoteError> {
    let listed = store.list_notes().await?;
    debug!(count = listed.len(), "listed notes");
    let pending = listed.into_iter().map(PendingNote::Unread).collect();
    Ok(start(pending, config, store, options))
}

fn start(
    pending: Vec<PendingNote>,
    config: Arc<ClassificationConfig>,
    store: Arc<dyn NoteStore>,
    options: PassOptions,
) -> ClassificationPass {
    let (tx, rx) = mpsc::channel(options.concurrency.max(1));
    let summary = PassSummary {
        total: pending.len(),
        ..PassSummary::default()
    };
    let cancel = options.cancel.clone();
    tokio::spawn(drive(pending, config, store, options, tx));
    ClassificationPass {
        rx,
        cancel,
        summary,
    }
}

async fn drive(
    pending: Vec<PendingNote>,
    config: Arc<ClassificationConfig>,
    store: Arc<dyn NoteStore>,
    options: PassOptions,
    tx: mpsc::Sender<NoteResult>,
) {
    let limit = options.concurrency.max(1);
    let mut in_flight = JoinSet::new();
    let mut slots: HashMap<task::Id, Slot> = HashMap::new();
    for item in pending {
        while in_flight.len() >= limit {
            match in_flight.join_next_with_id().await {
                Some(joined) => deliver(joined, &mut slots),
                None => break,
            }
        }
        let permit = match tx.clone().reserve_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                debug!("pass dropped by its consumer, not starting further notes");
                return;
            }
        };
        if options.cancel.is_cancelled() {
            info!("pass cancelled, not starting further notes");
            break;
        }
        let path = item.path().to_string();
        let config = config.clone();
        let store = store.clone();
        let dry_run = options.dry_run;
        let handle =
            in_flight.spawn(async move { process(item, &config, store.as_ref(), dry_run).await });
        slots.insert(handle.id(), Slot { path, permit });
    }
    while let Some(joined) = in_flight.join_next_with_id().await {
        deliver(joined, &mut slots);
    }
}

/// Sends a finished note's result through its reserved slot. A task that
/// panicked still yields a `MoveFailed` for its note.
fn deliver(
    joined: Result<(task::Id, NoteResult), JoinError>,
    slots: &mut HashMap<task::Id, Slot>,
) {
    let (id, result) = match joined {
        Ok(done) => done,
        Err(e) => {
            let id = e.id();
            let path = slots.get(&id).map(|s| s.path.clone()).unwrap_or_default();
            error!(path = %path, error = %e, "note task aborted");
            let reason = if e.is_panic() { "task panicked" } else { "task cancelled" };
            let result = NoteResult {
                note: Note::untagged(&path),
                outcome: MoveOutcome::MoveFailed {
                    error: NoteError::Io {
                        path,
                        reason: reason.to_string(),
                    },
                },
            };
            (id, result)
        }
    };
    if let Some(slot) = slots.remove(&id) {
        slot.permit.send(result);
    }
}

async fn process(
    item: PendingNote,
    config: &ClassificationConfig,
    store: &dyn NoteStore,
    dry_run: bool,
) -> NoteResult {
    let note = match item {
        PendingNote::Loaded(note) => note,
        PendingNote::Unread(path) if paths::is_ignored(&path, &config.ignored_path_prefixes) => {
            debug!(path = %path, "ignored");
            return NoteResult {
                note: Note::untagged(&path),
                outcome: MoveOutcome::Skipped,
            };
        }
        PendingNote::Unread(path) => match store.snapshot(&path).await {
            Ok(note) => note,
            Err(error) => {
                warn!(path = %path, %error, "could not read tags");
                return NoteResult {
                    note: Note::untagged(&path),
                    outcome: MoveOutcome::MoveFailed { error },
                };
            }
        },
    };
    let outcome = if dry_run {
        classifier::plan(&note, config)
    } else {
        classifier::classify_and_move(&note, config, store).await
    };
    NoteResult { note, outcome }
}
