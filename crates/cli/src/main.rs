use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use elements_cli::organize::{self, OrganizeOptions};
use elements_cli::session::Session;
use elements_cli::{history, undo, watch};
use elements_core::config::{self, AppConfig, ConflictPolicy};
use elements_core::models::{MoveOutcome, NoteResult};
use elements_core::pipeline::CancelHandle;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    if let Commands::Init { path, force } = &cli.command {
        return run_init(path, *force);
    }

    let mut cfg = config::load(cli.config.as_deref())?;
    if let Commands::Organize {
        conflict: Some(policy),
        ..
    } = &cli.command
    {
        cfg.moves.conflict = policy.parse::<ConflictPolicy>()?;
    }
    let session = Session::open(cfg, cli.vault.as_deref())?;

    match cli.command {
        Commands::Preview { paths, json } => run_preview(&session, &paths, json).await,
        Commands::Organize {
            dry_run,
            json,
            concurrency,
            ..
        } => run_organize(&session, dry_run, json, concurrency).await,
        Commands::Move { path, json } => run_move(&session, &path, json).await,
        Commands::Watch => {
            println!("Watching {} ...", session.vault.root().display());
            watch::watch_vault(&session, |r| println!("{}", describe(r))).await
        }
        Commands::Undo { run, json } => run_undo(&session, run, json).await,
        Commands::History { limit, json } => run_history(&session, limit, json).await,
        Commands::Init { .. } => Ok(()),
    }
}

#[derive(Parser)]
#[command(name = "elements")]
#[command(about = "Sorts notes into folders by their tags", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    /// Vault root directory (overrides vault.root)
    #[arg(long)]
    vault: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show where notes would go without moving them
    Preview {
        /// Vault paths to preview; all notes if omitted
        paths: Vec<String>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Move every note in the vault to its folder
    Organize {
        /// Only report what would move
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        /// Output JSON
        #[arg(long)]
        json: bool,
        /// Notes processed at once (defaults to moves.concurrency)
        #[arg(long)]
        concurrency: Option<usize>,
        /// Conflict policy: fail|rename
        #[arg(long)]
        conflict: Option<String>,
    },
    /// Move one note to its most appropriate folder
    Move {
        /// Vault path of the note, e.g. "/00 Home/Ada.md"
        path: String,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Classify notes as they are created or edited
    Watch,
    /// Revert the moves of a journaled run
    Undo {
        /// Run ID; latest undoable run if omitted
        #[arg(long)]
        run: Option<i64>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// List journaled runs
    History {
        #[arg(long, default_value_t = 20)]
        limit: i64,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the default configuration
    Init {
        #[arg(long, default_value = "elements.toml")]
        path: String,
        /// Overwrite an existing file
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn run_init(path: &str, force: bool) -> Result<()> {
    if Path::new(path).exists() && !force {
        bail!("{path} already exists (use --force to overwrite)");
    }
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, AppConfig::default().to_toml()?)?;
    println!("wrote {path}");
    Ok(())
}

async fn run_preview(session: &Session, paths: &[String], json: bool) -> Result<()> {
    let entries = organize::preview(session, paths).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    for e in &entries {
        let target = match (&e.error, &e.destination) {
            (Some(err), _) => format!("error: {err}"),
            (None, Some(folder)) => folder.clone(),
            (None, None) => "ignored".to_string(),
        };
        println!("{} -> {}", e.path, target);
    }
    Ok(())
}

async fn run_organize(
    session: &Session,
    dry_run: bool,
    json: bool,
    concurrency: Option<usize>,
) -> Result<()> {
    let cancel = CancelHandle::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("cancelling: letting in-flight moves finish...");
            on_ctrl_c.cancel();
        }
    });

    let opts = OrganizeOptions {
        dry_run: dry_run || session.config.moves.dry_run,
        concurrency: concurrency.unwrap_or(session.config.moves.concurrency),
        cancel,
    };
    let report = organize::organize(session, opts, |r| {
        if !json {
            println!("{}", describe(r));
        }
    })
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    let s = &report.summary;
    println!(
        "organize summary: moved={}, planned={}, in-place={}, skipped={}, failed={}",
        s.moved, s.planned, s.already_in_place, s.skipped, s.failed
    );
    if s.cancelled {
        println!("cancelled with {} note(s) not processed", s.unprocessed());
    }
    if let Some(id) = report.run_id {
        println!("journal run #{id}");
    }
    Ok(())
}

async fn run_move(session: &Session, path: &str, json: bool) -> Result<()> {
    let result = organize::move_one(session, path).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", describe(&result));
    }
    Ok(())
}

async fn run_undo(session: &Session, run: Option<i64>, json: bool) -> Result<()> {
    let report = undo::undo_run(session, run).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    match report.run_id {
        None => println!("nothing to undo"),
        Some(id) => {
            println!("undo run #{id}: restored {}", report.restored.len());
            for s in &report.skipped {
                println!("  skipped {}: {}", s.path, s.reason);
            }
        }
    }
    Ok(())
}

async fn run_history(session: &Session, limit: i64, json: bool) -> Result<()> {
    let runs = history::list_runs(session, limit).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
    } else if runs.is_empty() {
        println!("no runs recorded");
    } else {
        for run in &runs {
            println!("{}", history::render_run(run));
        }
    }
    Ok(())
}

fn describe(result: &NoteResult) -> String {
    let detail = match &result.outcome {
        MoveOutcome::Moved { path, .. } => format!(" -> {path}"),
        MoveOutcome::Planned { folder } => format!(" -> {folder}"),
        MoveOutcome::MoveFailed { error } => format!(": {error}"),
        MoveOutcome::Skipped | MoveOutcome::AlreadyInPlace => String::new(),
    };
    format!("{:>8}  {}{}", result.outcome.label(), result.note.path, detail)
}
