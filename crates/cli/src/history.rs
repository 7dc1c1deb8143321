use anyhow::{bail, Result};
use elements_storage::journal;
use elements_storage::models::RunRecord;

use crate::session::Session;

pub async fn list_runs(session: &Session, limit: i64) -> Result<Vec<RunRecord>> {
    let Some(pool) = session.journal().await? else {
        bail!("journal is disabled");
    };
    journal::list_runs(&pool, limit).await
}

/// `YYYY-MM-DD HH:MM:SS` in UTC.
pub fn format_timestamp(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| secs.to_string())
}

pub fn render_run(run: &RunRecord) -> String {
    format!(
        "#{:<4} {}  {:<9} total={} moved={} in-place={} skipped={} failed={}",
        run.id,
        format_timestamp(run.started_at),
        run.status,
        run.total,
        run.moved,
        run.in_place,
        run.skipped,
        run.failed
    )
}
