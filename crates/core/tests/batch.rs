use elements_core::classifier;
use elements_core::config::ClassificationConfig;
use elements_core::error::NoteError;
use elements_core::models::{EntryRef, MoveOutcome, Note};
use elements_core::paths;
use elements_core::pipeline::{self, CancelHandle, PassOptions};
use elements_core::rules::FolderRule;
use elements_core::store::NoteStore;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory vault: path -> tags. Paths listed in `unreadable` fail tag reads
/// and paths in `corrupt` panic while reading.
#[derive(Default)]
struct MemoryStore {
    notes: Mutex<BTreeMap<String, BTreeSet<String>>>,
    unreadable: BTreeSet<String>,
    corrupt: BTreeSet<String>,
    moves: AtomicUsize,
}

impl MemoryStore {
    fn with(notes: &[(&str, &[&str])]) -> Self {
        let map = notes
            .iter()
            .map(|(p, tags)| (p.to_string(), tags.iter().map(|t| t.to_string()).collect()))
            .collect();
        MemoryStore {
            notes: Mutex::new(map),
            ..Default::default()
        }
    }

    fn paths(&self) -> Vec<String> {
        self.notes.lock().unwrap().keys().cloned().collect()
    }

    fn move_count(&self) -> usize {
        self.moves.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl NoteStore for MemoryStore {
    async fn list_notes(&self) -> Result<Vec<String>, NoteError> {
        Ok(self.paths())
    }

    async fn read_tags(&self, path: &str) -> Result<BTreeSet<String>, NoteError> {
        if self.corrupt.contains(path) {
            panic!("corrupt note {path}");
        }
        if self.unreadable.contains(path) {
            return Err(NoteError::TagRead {
                path: path.to_string(),
                reason: "unreadable".into(),
            });
        }
        self.notes
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| NoteError::NoteNotFound { path: path.into() })
    }

    async fn resolve(&self, path: &str) -> EntryRef {
        if self.notes.lock().unwrap().contains_key(path) {
            EntryRef::File(path.to_string())
        } else {
            EntryRef::NotFound
        }
    }

    async fn move_note(&self, path: &str, folder: &str) -> Result<String, NoteError> {
        if folder == "/Forbidden" {
            return Err(NoteError::PermissionDenied {
                path: folder.to_string(),
            });
        }
        let mut notes = self.notes.lock().unwrap();
        let tags = notes
            .remove(path)
            .ok_or_else(|| NoteError::NoteNotFound { path: path.into() })?;
        let dest = paths::join(folder, paths::file_name(path));
        notes.insert(dest.clone(), tags);
        self.moves.fetch_add(1, Ordering::SeqCst);
        Ok(dest)
    }
}

fn scenario_config() -> ClassificationConfig {
    ClassificationConfig::new(
        vec![FolderRule::new("Person", "/03 People", "person")],
        "/02 Concepts",
        vec!["/10 Files".to_string()],
    )
}

#[tokio::test]
async fn scenario_routes_notes() {
    let store = Arc::new(MemoryStore::with(&[
        ("/10 Files/x.md", &["person"]),
        ("/00 Home/y.md", &["person"]),
        ("/00 Home/z.md", &[]),
    ]));
    let report = pipeline::classify_vault(store.clone(), Arc::new(scenario_config()), PassOptions::default())
        .await
        .unwrap()
        .finish()
        .await;

    let outcomes: BTreeMap<String, MoveOutcome> = report
        .results
        .into_iter()
        .map(|r| (r.note.path, r.outcome))
        .collect();
    assert_eq!(outcomes["/10 Files/x.md"], MoveOutcome::Skipped);
    assert_eq!(
        outcomes["/00 Home/y.md"],
        MoveOutcome::Moved {
            folder: "/03 People".into(),
            path: "/03 People/y.md".into()
        }
    );
    assert_eq!(
        outcomes["/00 Home/z.md"],
        MoveOutcome::Moved {
            folder: "/02 Concepts".into(),
            path: "/02 Concepts/z.md".into()
        }
    );
    assert_eq!(report.summary.moved, 2);
    assert_eq!(report.summary.skipped, 1);
    assert!(!report.summary.cancelled);
    assert_eq!(
        store.paths(),
        vec!["/02 Concepts/z.md", "/03 People/y.md", "/10 Files/x.md"]
    );
}

#[tokio::test]
async fn failed_tag_read_does_not_stop_the_run() {
    let mut store = MemoryStore::with(&[
        ("/a.md", &["person"]),
        ("/b.md", &["person"]),
        ("/c.md", &[]),
    ]);
    store.unreadable.insert("/b.md".to_string());
    let store = Arc::new(store);

    let report = pipeline::classify_vault(store.clone(), Arc::new(scenario_config()), PassOptions::default())
        .await
        .unwrap()
        .finish()
        .await;

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.moved, 2);
    let failed = report
        .results
        .iter()
        .find(|r| r.outcome.is_failure())
        .unwrap();
    assert_eq!(failed.note.path, "/b.md");
    assert!(matches!(
        failed.outcome,
        MoveOutcome::MoveFailed {
            error: NoteError::TagRead { .. }
        }
    ));
}

#[tokio::test]
async fn move_failure_is_reported_per_note() {
    let cfg = ClassificationConfig::new(
        vec![FolderRule::new("Secret", "/Forbidden", "secret")],
        "/Inbox",
        vec![],
    );
    let notes = vec![Note::new("/a.md", ["secret"]), Note::new("/b.md", ["other"])];
    let store = Arc::new(MemoryStore::with(&[("/a.md", &["secret"]), ("/b.md", &["other"])]));

    let report = pipeline::classify_all_notes(notes, Arc::new(cfg), store, PassOptions::default())
        .finish()
        .await;
    assert_eq!(report.results[0].note.path, "/a.md");
    assert!(matches!(
        report.results[0].outcome,
        MoveOutcome::MoveFailed {
            error: NoteError::PermissionDenied { .. }
        }
    ));
    assert!(matches!(report.results[1].outcome, MoveOutcome::Moved { .. }));
}

#[tokio::test]
async fn second_pass_is_already_in_place() {
    let store = Arc::new(MemoryStore::with(&[("/00 Home/y.md", &["person"])]));
    let cfg = scenario_config();

    let first = store.snapshot("/00 Home/y.md").await.unwrap();
    let outcome = classifier::classify_and_move(&first, &cfg, store.as_ref()).await;
    assert!(matches!(outcome, MoveOutcome::Moved { .. }));
    assert_eq!(store.move_count(), 1);

    let moved = store.snapshot("/03 People/y.md").await.unwrap();
    for _ in 0..2 {
        let again = classifier::classify_and_move(&moved, &cfg, store.as_ref()).await;
        assert_eq!(again, MoveOutcome::AlreadyInPlace);
    }
    assert_eq!(store.move_count(), 1);
}

#[tokio::test]
async fn dry_run_moves_nothing() {
    let store = Arc::new(MemoryStore::with(&[("/00 Home/y.md", &["person"])]));
    let options = PassOptions {
        dry_run: true,
        ..PassOptions::default()
    };
    let report = pipeline::classify_vault(store.clone(), Arc::new(scenario_config()), options)
        .await
        .unwrap()
        .finish()
        .await;
    assert_eq!(
        report.results[0].outcome,
        MoveOutcome::Planned {
            folder: "/03 People".into()
        }
    );
    assert_eq!(store.move_count(), 0);
}

#[tokio::test]
async fn cancelled_pass_starts_nothing_new() {
    let store = Arc::new(MemoryStore::with(&[("/a.md", &[]), ("/b.md", &[]), ("/c.md", &[])]));
    let cancel = CancelHandle::new();
    cancel.cancel();
    let options = PassOptions {
        cancel: cancel.clone(),
        ..PassOptions::default()
    };
    let report = pipeline::classify_vault(store.clone(), Arc::new(scenario_config()), options)
        .await
        .unwrap()
        .finish()
        .await;
    assert!(report.results.is_empty());
    assert!(report.summary.cancelled);
    assert_eq!(report.summary.unprocessed(), 3);
    assert_eq!(store.move_count(), 0);
}

#[tokio::test]
async fn concurrent_pass_processes_every_note() {
    let names: Vec<String> = (0..20).map(|i| format!("/inbox/n{i}.md")).collect();
    let entries: Vec<(&str, &[&str])> = names
        .iter()
        .enumerate()
        .map(|(i, n)| {
            let tags: &[&str] = if i % 2 == 0 { &["person"] } else { &[] };
            (n.as_str(), tags)
        })
        .collect();
    let store = Arc::new(MemoryStore::with(&entries));
    let options = PassOptions {
        concurrency: 4,
        ..PassOptions::default()
    };
    let mut pass = pipeline::classify_vault(store.clone(), Arc::new(scenario_config()), options)
        .await
        .unwrap();
    assert_eq!(pass.total(), 20);
    let mut seen = 0;
    while let Some(result) = pass.next().await {
        assert!(matches!(result.outcome, MoveOutcome::Moved { .. }));
        seen += 1;
    }
    assert_eq!(seen, 20);
    assert_eq!(pass.summary().moved, 20);
    assert_eq!(store.move_count(), 20);
}

#[tokio::test]
async fn panicking_note_is_reported_as_failed() {
    let mut store = MemoryStore::with(&[("/a.md", &[]), ("/b.md", &[]), ("/panic.md", &[])]);
    store.corrupt.insert("/panic.md".to_string());
    let store = Arc::new(store);

    let report = pipeline::classify_vault(store.clone(), Arc::new(scenario_config()), PassOptions::default())
        .await
        .unwrap()
        .finish()
        .await;

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.summary.moved, 2);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.unprocessed(), 0);
    assert!(!report.summary.cancelled);
    let failed = report
        .results
        .iter()
        .find(|r| r.outcome.is_failure())
        .unwrap();
    assert_eq!(failed.note.path, "/panic.md");
    assert!(matches!(
        &failed.outcome,
        MoveOutcome::MoveFailed {
            error: NoteError::Io { reason, .. }
        } if reason == "task panicked"
    ));
}

async fn moves_after_reading_one(concurrency: usize) -> usize {
    let names: Vec<String> = (0..200).map(|i| format!("/inbox/n{i:03}.md")).collect();
    let entries: Vec<(&str, &[&str])> = names.iter().map(|n| (n.as_str(), &[][..])).collect();
    let store = Arc::new(MemoryStore::with(&entries));
    let options = PassOptions {
        concurrency,
        ..PassOptions::default()
    };
    let mut pass = pipeline::classify_vault(store.clone(), Arc::new(scenario_config()), options)
        .await
        .unwrap();
    assert!(pass.next().await.is_some());
    drop(pass);
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    store.move_count()
}

#[tokio::test]
async fn dropped_pass_stops_moving_notes() {
    assert!(moves_after_reading_one(1).await <= 2);
    assert!(moves_after_reading_one(4).await <= 5);
}
