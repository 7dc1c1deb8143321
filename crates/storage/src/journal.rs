//! Journal of batch runs and the moves they executed.

use sqlx::SqlitePool;

use crate::models::{MoveRecord, NewMove, RunRecord, RunTotals};

pub async fn begin_run(pool: &SqlitePool, dry_run: bool, total: i64) -> anyhow::Result<i64> {
    let res = sqlx::query(
        "INSERT INTO runs (started_at, dry_run, total, status) VALUES (strftime('%s','now'), ?1, ?2, 'running')",
    )
    .bind(dry_run)
    .bind(total)
    .execute(pool)
    .await?;
    Ok(res.last_insert_rowid())
}

pub async fn record_move(pool: &SqlitePool, run_id: i64, entry: &NewMove<'_>) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO moves (run_id, from_path, to_path, folder, status, error, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, strftime('%s','now'))
        "#,
    )
    .bind(run_id)
    .bind(entry.from_path)
    .bind(entry.to_path)
    .bind(entry.folder)
    .bind(entry.status)
    .bind(entry.error.as_deref())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn finish_run(
    pool: &SqlitePool,
    run_id: i64,
    status: &str,
    totals: &RunTotals,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE runs SET finished_at = strftime('%s','now'), status = ?2,
            total = ?3, moved = ?4, failed = ?5, skipped = ?6, in_place = ?7
        WHERE id = ?1
        "#,
    )
    .bind(run_id)
    .bind(status)
    .bind(totals.total)
    .bind(totals.moved)
    .bind(totals.failed)
    .bind(totals.skipped)
    .bind(totals.in_place)
    .execute(pool)
    .await?;
    Ok(())
}

/// Most recent runs first.
pub async fn list_runs(pool: &SqlitePool, limit: i64) -> anyhow::Result<Vec<RunRecord>> {
    let rows = sqlx::query_as::<_, RunRecord>("SELECT * FROM runs ORDER BY id DESC LIMIT ?1")
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Latest run that still has moves to revert.
pub async fn latest_undoable_run(pool: &SqlitePool) -> anyhow::Result<Option<i64>> {
    let id = sqlx::query_scalar::<_, i64>(
        "SELECT run_id FROM moves WHERE status = 'moved' ORDER BY run_id DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;
    Ok(id)
}

pub async fn moves_for_run(pool: &SqlitePool, run_id: i64) -> anyhow::Result<Vec<MoveRecord>> {
    let rows = sqlx::query_as::<_, MoveRecord>("SELECT * FROM moves WHERE run_id = ?1 ORDER BY id")
        .bind(run_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn mark_undone(pool: &SqlitePool, move_id: i64) -> anyhow::Result<()> {
    sqlx::query("UPDATE moves SET status = 'undone', undone_at = strftime('%s','now') WHERE id = ?1")
        .bind(move_id)
        .execute(pool)
        .await?;
    Ok(())
}
