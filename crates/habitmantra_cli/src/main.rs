//! Terminal driver for the habit session.
//!
//! # Responsibility
//! - Provide a small executable over `habitmantra_core` for local use and
//!   wiring checks without the Flutter runtime.
//! - Keep output deterministic and line-oriented.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use habitmantra_core::db::open_db;
use habitmantra_core::{
    init_logging, CoreConfig, GeminiMantraGenerator, HabitService, SessionUpdate,
    SqliteHabitStore,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "habitmantra", version, about = "Micro-habit mantra and daily check-ins")]
struct Cli {
    /// Slot database path (overrides HABITMANTRA_DB_PATH).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Absolute directory for rolling log files.
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print core linkage information.
    Ping,
    /// Show the active habit and streak.
    Status,
    /// Generate a mantra for a goal and start tracking it.
    Create { goal: String },
    /// Record today's check-in.
    CheckIn,
    /// Forget the active habit.
    Reset,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CoreConfig::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(log_dir) = cli.log_dir.as_deref() {
        init_logging(&config.log_level, log_dir)?;
    }

    let command = cli.command.unwrap_or(Command::Ping);
    if let Command::Ping = command {
        println!("habitmantra_core ping={}", habitmantra_core::ping());
        println!("habitmantra_core version={}", habitmantra_core::core_version());
        return Ok(());
    }

    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;
    let generator = Arc::new(GeminiMantraGenerator::new(config.gemini));
    let mut service = HabitService::restore(SqliteHabitStore::new(conn), generator);

    let update = match command {
        Command::Ping | Command::Status => None,
        Command::Create { goal } => Some(service.submit_goal(&goal).await?),
        Command::CheckIn => Some(service.check_in()?),
        Command::Reset => Some(service.reset()?),
    };

    if let Some(update) = &update {
        print_update(update);
    }
    print_status(&service);
    Ok(())
}

fn print_update(update: &SessionUpdate) {
    for notice in &update.notices {
        eprintln!("notice: {notice}");
    }
    if update.celebrate {
        println!("*** checked in, well done ***");
    }
}

fn print_status(service: &HabitService<SqliteHabitStore>) {
    println!("state={}", service.state());
    let Some(habit) = service.habit() else {
        println!("no active habit; run `habitmantra create <goal>`");
        return;
    };
    println!("goal={}", habit.original_goal);
    println!("identity={}", habit.mantra.identity);
    println!("benefit={}", habit.mantra.benefit);
    println!("emotion={}", habit.mantra.emotion);
    println!("check_ins={}", habit.check_ins);
    match habit.last_check_in_date {
        Some(day) => println!("last_check_in={day}"),
        None => println!("last_check_in=never"),
    }
}
