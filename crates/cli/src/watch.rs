use anyhow::Result;
use elements_core::models::NoteResult;
use elements_core::vault::FsVault;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::organize;
use crate::session::Session;

/// Vault paths of the notes an event created or changed.
pub fn note_paths(vault: &FsVault, event: &Event) -> Vec<String> {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return Vec::new();
    }
    event
        .paths
        .iter()
        .filter(|p| p.is_file() && vault.is_note(p))
        .filter_map(|p| vault.to_vault_path(p))
        .collect()
}

/// Classifies notes as they appear or change until Ctrl-C.
pub async fn watch_vault(session: &Session, mut on_result: impl FnMut(&NoteResult)) -> Result<()> {
    let (tx, mut rx) = mpsc::channel(256);
    let mut watcher: RecommendedWatcher = Watcher::new(
        move |event: notify::Result<Event>| {
            let _ = tx.blocking_send(event);
        },
        notify::Config::default().with_poll_interval(Duration::from_secs(2)),
    )?;
    watcher.watch(session.vault.root(), RecursiveMode::Recursive)?;

    loop {
        let event = tokio::select! {
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        };
        let event = match event {
            Ok(ev) => ev,
            Err(e) => {
                warn!(error = %e, "watch error");
                continue;
            }
        };
        for path in note_paths(&session.vault, &event) {
            let result = organize::process_note(session, &path).await;
            debug!(path = %path, outcome = result.outcome.label(), "watched note processed");
            on_result(&result);
            organize::journal_single(session, &result).await?;
        }
    }
    Ok(())
}

