use std::path::PathBuf;

use anyhow::{Result, bail};
use arc14_common::{APP_NAME, Arc14Config, logging};
use arc14_core::window::{SchedulingWindow, minimum_task_date, tomorrow_progress};
use arc14_core::{Clock, SystemClock, mirror14};
use arc14_notify::{Notifier, SendGridMailer, run_reminder_scan, test_message};
use arc14_store::TrackerStore;
use chrono::Duration;
use clap::{Parser, Subcommand};
use tracing::debug;

#[derive(Debug, Parser)]
#[command(name = "arc14", about = "ARC-14 self-tracking service", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate local setup and generate default config if missing.
    Doctor,
    /// Serve the REST API and run the reminder scheduler.
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
    /// Reminder operations.
    Reminders {
        #[command(subcommand)]
        command: ReminderCommand,
    },
    /// Email delivery checks.
    Email {
        #[command(subcommand)]
        command: EmailCommand,
    },
    /// Database maintenance.
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
    /// Mirror-14 evaluator.
    Mirror {
        #[command(subcommand)]
        command: MirrorCommand,
    },
    /// Scheduled task helpers.
    Tasks {
        #[command(subcommand)]
        command: TaskCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ReminderCommand {
    /// Run one reminder scan now.
    Run {
        #[arg(long)]
        to: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum EmailCommand {
    /// Send a test email.
    Test { address: String },
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Backup the sqlite database to a file.
    Backup { path: PathBuf },
    /// Restore the sqlite database from a backup file.
    Restore { path: PathBuf },
}

#[derive(Debug, Subcommand)]
enum MirrorCommand {
    /// Score an ARC cycle.
    Evaluate {
        #[arg(long)]
        action: String,
        #[arg(long, default_value = "")]
        reflection: String,
        #[arg(long, default_value = "")]
        correction: String,
    },
}

#[derive(Debug, Subcommand)]
enum TaskCommand {
    /// Show the scheduling window and the earliest date a new task may use.
    Window,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Some(Command::Doctor) => doctor(),
        Some(Command::Serve { bind }) => serve(bind),
        Some(Command::Reminders { command }) => reminders(command),
        Some(Command::Email { command }) => email(command),
        Some(Command::Db { command }) => db(command),
        Some(Command::Mirror { command }) => mirror(command),
        Some(Command::Tasks { command }) => tasks(command),
        None => {
            println!("{APP_NAME} CLI bootstrap complete.");
            println!("Run `arc14 doctor` to generate and validate local config.");
            Ok(())
        }
    }
}

fn load_config() -> Result<(Arc14Config, PathBuf, bool)> {
    let dotenv = dotenvy::dotenv().ok();
    let (mut config, path, created) = Arc14Config::load_or_create()?;
    config.apply_env_overrides()?;
    config.validate_and_prepare()?;
    logging::init(&config.log_level);
    if let Some(dotenv) = dotenv {
        debug!(path = %dotenv.display(), "loaded .env");
    }
    Ok((config, path, created))
}

fn load_initialized_config() -> Result<Arc14Config> {
    let (config, _, _) = load_config()?;
    Ok(config)
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

fn doctor() -> Result<()> {
    let (config, path, created) = load_config()?;
    let store = TrackerStore::open(&config.database.path)?;
    let counts = store.counts()?;

    println!("{} doctor: OK", APP_NAME);
    println!("config: {}", path.display());
    println!("created_config: {created}");
    println!("db: {}", config.database.path.display());
    println!("schema_version: {}", store.schema_version()?);
    println!("bind: {}", config.server.bind);
    println!("cutoff_hour: {}", config.scheduling.cutoff_hour);
    println!(
        "email_configured: {}",
        config.notifications.has_credentials()
    );
    println!(
        "reminder_recipient: {}",
        config.notifications.recipient.as_deref().unwrap_or("-")
    );
    println!(
        "records: habits={} logs={} journals={} arc_cycles={} scheduled_tasks={}",
        counts.habits, counts.daily_logs, counts.journals, counts.arc_cycles, counts.scheduled_tasks
    );
    Ok(())
}

fn serve(bind: Option<String>) -> Result<()> {
    let mut config = load_initialized_config()?;
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    println!("web_status: starting");
    println!("bind: {}", config.server.bind);
    println!("db: {}", config.database.path.display());
    runtime()?.block_on(arc14_web::serve(&config))
}

fn reminders(command: ReminderCommand) -> Result<()> {
    let config = load_initialized_config()?;
    match command {
        ReminderCommand::Run { to } => {
            let Some(recipient) = to.or_else(|| config.notifications.recipient.clone()) else {
                bail!("no recipient: pass --to or set REMINDER_EMAIL");
            };
            let mailer = SendGridMailer::from_config(&config.notifications)?;
            let report = runtime()?.block_on(run_reminder_scan(
                &config.database.path,
                &mailer,
                &recipient,
                SystemClock.now(),
                Duration::minutes(config.notifications.lead_minutes),
            ))?;
            println!("checked: {}", report.checked);
            println!("sent: {}", report.sent);
            println!("failed: {}", report.failed);
            for result in report.results {
                match result.error {
                    Some(err) => println!("- {} | {} | failed: {err}", result.task_id, result.title),
                    None => println!("- {} | {} | sent", result.task_id, result.title),
                }
            }
        }
    }
    Ok(())
}

fn email(command: EmailCommand) -> Result<()> {
    let config = load_initialized_config()?;
    match command {
        EmailCommand::Test { address } => {
            let mailer = SendGridMailer::from_config(&config.notifications)?;
            if !mailer.is_configured() {
                bail!("Email not configured: set SENDGRID_API_KEY and SENDER_EMAIL");
            }
            let delivery = runtime()?.block_on(mailer.send(&test_message(&address)))?;
            println!("email_status: sent");
            println!("recipient: {}", delivery.recipient);
            println!(
                "message_id: {}",
                delivery.message_id.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(())
}

fn db(command: DbCommand) -> Result<()> {
    let config = load_initialized_config()?;
    let mut store = TrackerStore::open(&config.database.path)?;
    match command {
        DbCommand::Backup { path } => {
            store.backup_to(&path)?;
            println!("backup_created: {}", path.display());
        }
        DbCommand::Restore { path } => {
            store.restore_from(&path)?;
            println!("restore_applied: {}", path.display());
        }
    }
    Ok(())
}

fn mirror(command: MirrorCommand) -> Result<()> {
    match command {
        MirrorCommand::Evaluate {
            action,
            reflection,
            correction,
        } => {
            if action.trim().is_empty() {
                bail!("action is required");
            }
            let evaluation =
                mirror14::evaluate(action.trim(), reflection.trim(), correction.trim());
            println!("{}", serde_json::to_string_pretty(&evaluation)?);
        }
    }
    Ok(())
}

fn tasks(command: TaskCommand) -> Result<()> {
    let config = load_initialized_config()?;
    match command {
        TaskCommand::Window => {
            let now = SystemClock.now_local();
            let today = now.date();
            let window = SchedulingWindow::new(config.scheduling.cutoff_hour);
            let store = TrackerStore::open(&config.database.path)?;
            let upcoming = store.tasks_on_or_after(today)?;
            let progress = tomorrow_progress(&upcoming, today);

            println!("cutoff: {:02}:00", window.cutoff_hour());
            println!("now: {}", now.format("%H:%M:%S"));
            println!("window_open: {}", window.is_open(now));
            println!("minimum_task_date: {}", minimum_task_date(&upcoming, today));
            println!(
                "tomorrow: {}/{} completed",
                progress.tomorrow_completed_count, progress.tomorrow_tasks_count
            );
            println!("{}", progress.message);
        }
    }
    Ok(())
}
