//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `kanban_core` linkage and that a database file loads cleanly.
//! - Start file logging before any store touches the database.
//! - Keep output deterministic for quick local sanity checks.

use clap::Parser;
use kanban_core::db::open_db;
use kanban_core::{BoardStore, IdentityStore, KanbanConfig, SqliteKeyValueStore};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "kanban_cli")]
#[command(version, about = "Load a kanban database and print store counts")]
struct Args {
    /// SQLite database file; created when missing.
    #[arg(default_value = "kanban.sqlite3")]
    db_path: PathBuf,

    /// JSON config file overriding record keys, limits and log level.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log directory. Defaults to `logs/` next to the database file.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    println!("kanban_core ping={}", kanban_core::ping());
    println!("kanban_core version={}", kanban_core::core_version());

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("kanban_cli error={err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let config = match &args.config {
        Some(path) => KanbanConfig::load(path)?,
        None => KanbanConfig::default(),
    };

    let log_dir = resolve_log_dir(args, &std::env::current_dir()?);
    kanban_core::init_logging(&config.log_level, &log_dir.to_string_lossy())?;

    let conn = open_db(&args.db_path)?;
    let storage = SqliteKeyValueStore::try_new(&conn)?;
    let identity = IdentityStore::open(&storage, &config)?;
    let boards = BoardStore::open(&storage, &config)?;

    let lists: usize = boards.boards().iter().map(|board| board.lists.len()).sum();
    let tasks: usize = boards.boards().iter().map(|board| board.task_count()).sum();
    println!(
        "kanban_store users={} session={} boards={} lists={} tasks={}",
        identity.users().len(),
        identity.current_user().is_some(),
        boards.boards().len(),
        lists,
        tasks
    );
    Ok(())
}

/// Absolute log directory: `--log-dir` if given, else `logs/` beside the database.
fn resolve_log_dir(args: &Args, cwd: &Path) -> PathBuf {
    let dir = match &args.log_dir {
        Some(dir) => dir.clone(),
        None => args
            .db_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join("logs"),
    };
    if dir.is_absolute() {
        dir
    } else {
        cwd.join(dir)
    }
}
