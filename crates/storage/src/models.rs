use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub status: String,
    pub dry_run: bool,
    pub total: i64,
    pub moved: i64,
    pub failed: i64,
    pub skipped: i64,
    pub in_place: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MoveRecord {
    pub id: i64,
    pub run_id: i64,
    pub from_path: String,
    pub to_path: Option<String>,
    pub folder: Option<String>,
    pub status: String,
    pub error: Option<String>,
    pub created_at: i64,
    pub undone_at: Option<i64>,
}

/// Row to insert for one journaled note.
#[derive(Debug, Clone)]
pub struct NewMove<'a> {
    pub from_path: &'a str,
    pub to_path: Option<&'a str>,
    pub folder: Option<&'a str>,
    pub status: &'a str,
    pub error: Option<String>,
}

/// Totals written when a run closes.
#[derive(Debug, Clone, Default)]
pub struct RunTotals {
    pub total: i64,
    pub moved: i64,
    pub failed: i64,
    pub skipped: i64,
    pub in_place: i64,
}
