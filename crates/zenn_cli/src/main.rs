//! Command-line entry point for the Zenn core.
//!
//! # Responsibility
//! - Drive the core against a local SQLite task store for manual checks.
//! - Print insight reports as text or JSON.

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use zenn_core::{
    default_log_level, init_logging, CompletionFilter, CoordinatorConfig, DateWindow,
    InsightReport, LogNotifier, PillarScores, SqliteTaskStore, StaticAuth, Task, TaskCache,
    TaskMutationCoordinator,
};

#[derive(Debug, Parser)]
#[command(name = "zenn", version, about = "Zenn task core tools")]
struct Cli {
    /// Absolute directory for rolling log files.
    #[arg(long, global = true, env = "ZENN_LOG_DIR")]
    log_dir: Option<String>,

    /// Log level (trace|debug|info|warn|error). Requires --log-dir.
    #[arg(long, global = true, env = "ZENN_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Checks that the core links and answers.
    Ping,
    /// Inserts a small demo data set for one user.
    Seed {
        #[arg(long)]
        db: PathBuf,
        #[arg(long)]
        user: String,
    },
    /// Prints pillar, feedback and zone insights.
    Insights {
        #[arg(long)]
        db: PathBuf,
        #[arg(long)]
        user: String,
        /// Window length in days ending now; all time when omitted.
        #[arg(long)]
        days: Option<u32>,
        #[arg(long)]
        json: bool,
    },
    /// Toggles completion of one task.
    Complete {
        #[arg(long)]
        db: PathBuf,
        #[arg(long)]
        user: String,
        task_id: String,
    },
    /// Toggles visibility of one task.
    Hide {
        #[arg(long)]
        db: PathBuf,
        #[arg(long)]
        user: String,
        task_id: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, log_dir) {
            eprintln!("warning: {err}");
        }
    }
    if let Some(warning) = logging_warning(&cli) {
        eprintln!("warning: {warning}");
    }

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

/// Logging only starts with a directory, so a bare level has no effect.
fn logging_warning(cli: &Cli) -> Option<&'static str> {
    match (&cli.log_dir, &cli.log_level) {
        (None, Some(_)) => Some("--log-level is ignored without --log-dir"),
        _ => None,
    }
}

async fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Ping => {
            println!("zenn_core ping={}", zenn_core::ping());
            println!("zenn_core version={}", zenn_core::core_version());
            Ok(())
        }
        Command::Seed { db, user } => seed(&db, &user),
        Command::Insights {
            db,
            user,
            days,
            json,
        } => {
            let coordinator = open_coordinator(&db, &user)?;
            coordinator
                .load_tasks(CompletionFilter::Completed)
                .await
                .map_err(|err| err.to_string())?;
            let window = match days {
                Some(days) => DateWindow::last_days(days, Utc::now()),
                None => DateWindow::AllTime,
            };
            let tasks = coordinator.cache().user_tasks(&user);
            let report = InsightReport::compute(&tasks, &window);
            if json {
                let text = serde_json::to_string_pretty(&report).map_err(|err| err.to_string())?;
                println!("{text}");
            } else {
                print_report(&report);
            }
            Ok(())
        }
        Command::Complete { db, user, task_id } => {
            let coordinator = open_coordinator(&db, &user)?;
            coordinator
                .load_tasks(CompletionFilter::All)
                .await
                .map_err(|err| err.to_string())?;
            let outcome = coordinator
                .toggle_complete(&task_id)
                .await
                .map_err(|err| err.to_string())?;
            settled_to_result(outcome.settlement.error())
        }
        Command::Hide { db, user, task_id } => {
            let coordinator = open_coordinator(&db, &user)?;
            coordinator
                .load_tasks(CompletionFilter::All)
                .await
                .map_err(|err| err.to_string())?;
            let outcome = coordinator
                .toggle_hidden(&task_id)
                .await
                .map_err(|err| err.to_string())?;
            settled_to_result(outcome.settlement.error())
        }
    }
}

fn open_coordinator(
    db: &Path,
    user: &str,
) -> Result<TaskMutationCoordinator<SqliteTaskStore>, String> {
    let store = SqliteTaskStore::open(db).map_err(|err| err.to_string())?;
    let config = CoordinatorConfig::from_env("ZENN").map_err(|err| err.to_string())?;
    Ok(TaskMutationCoordinator::new(
        store,
        Arc::new(TaskCache::new()),
        Arc::new(StaticAuth::signed_in(user)),
        Arc::new(LogNotifier),
        config,
    ))
}

fn settled_to_result(error: Option<&zenn_core::StoreError>) -> Result<(), String> {
    match error {
        Some(err) => Err(err.to_string()),
        None => {
            println!("ok");
            Ok(())
        }
    }
}

fn seed(db: &Path, user: &str) -> Result<(), String> {
    let store = SqliteTaskStore::open(db).map_err(|err| err.to_string())?;
    let now = Utc::now();
    let samples = [
        ("File taxes", PillarScores::new(5, 3, 2), Some(2)),
        ("Run 10k", PillarScores::new(2, 5, 5), Some(5)),
        ("Call the bank", PillarScores::new(4, 2, 1), Some(9)),
        ("Read a chapter", PillarScores::new(1, 3, 4), None),
        ("Fix the bike", PillarScores::new(3, 4, 3), None),
    ];
    for (title, scores, completed_days_ago) in samples {
        let mut task = Task::new(user, title, scores);
        if let Some(days) = completed_days_ago {
            task.mark_completed(now - Duration::days(days));
        }
        store.insert_task(&task).map_err(|err| err.to_string())?;
        println!("seeded {} {}", task.id, title);
    }
    Ok(())
}

fn print_report(report: &InsightReport) {
    println!("{} ({} completed tasks)", report.window_label, report.task_count);
    if report.malformed > 0 {
        println!("  skipped {} tasks with unreadable completion dates", report.malformed);
    }
    for insight in &report.pillars.pillars {
        println!(
            "  {:<13} {:>4.2}  {:?}  {}",
            insight.pillar.label(),
            insight.average,
            insight.classification,
            insight.message
        );
    }
    if let Some(message) = report.pillars.highest_message() {
        println!("  {message}");
    }
    if let Some(message) = report.pillars.lowest_message() {
        println!("  {message}");
    }
    for share in &report.feedback.shares {
        println!(
            "  {:<12} {:>3} ({:>3}%)",
            share.feedback.as_str(),
            share.count,
            share.percent
        );
    }
    println!("  {}", report.feedback.message);
    println!(
        "  zones: critical={} important={} moderate={} low={}",
        report.zones.critical, report.zones.important, report.zones.moderate, report.zones.low
    );
}
