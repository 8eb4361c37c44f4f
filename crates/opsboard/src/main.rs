//! CLI entry point for opsboard.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use time::OffsetDateTime;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use opsboard_app::{DashboardService, KeywordIntakeParser, ProjectConfig};
use opsboard_core::Session;
use store::JsonStore;

mod commands;
mod store;

/// Tasks, leads and lead statistics for a small operations team.
#[derive(Parser, Debug)]
#[command(
    name = "opsboard",
    version,
    about = "opsboard: free-text tasks, a drag-style board and a lead tracker under .opsboard/"
)]
struct Cli {
    /// Working directory holding `.opsboard/` (defaults to current).
    #[arg(long)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a task from a free-text sentence.
    Add {
        /// Sentence such as "pay supplier tomorrow at 10:00 {yossi}".
        text: String,
        /// Column override (wins over keyword detection).
        #[arg(short = 'c', long)]
        category: Option<String>,
    },

    /// List tasks.
    Tasks {
        /// Assignee scope: mine, others or all.
        #[arg(long, default_value = "all")]
        scope: String,
        /// Hide completed tasks.
        #[arg(long)]
        hide_done: bool,
        #[arg(short = 'p', long)]
        priority: Option<String>,
        /// Repeatable; no value means every column.
        #[arg(short = 'c', long = "category")]
        categories: Vec<String>,
        #[arg(long)]
        text: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Move a task to another task's position.
    Move {
        task: String,
        /// Task whose position is taken.
        over: String,
    },

    /// Move a task to another column.
    Recategorize { task: String, category: String },

    /// Move a task's due date to another day, keeping its time.
    Schedule {
        task: String,
        /// Day as YYYY-MM-DD.
        date: String,
    },

    /// Toggle completion of a task.
    Done { task: String },

    /// Delete every completed task.
    Purge,

    /// Switch between list and grouped views.
    View {
        #[arg(value_enum)]
        mode: ViewArg,
    },

    /// Drop the manual order and sort automatically again.
    ResetOrder,

    /// Record a new lead.
    LeadAdd {
        name: String,
        phone: String,
        #[arg(long)]
        message: Option<String>,
        #[arg(long)]
        source: Option<String>,
    },

    /// List leads.
    Leads {
        /// Rolling window: all, 7d or 30d.
        #[arg(long, default_value = "all")]
        window: String,
        /// Explicit range start (YYYY-MM-DD); requires --to.
        #[arg(long, requires = "to")]
        from: Option<String>,
        #[arg(long, requires = "from")]
        to: Option<String>,
        #[arg(long)]
        text: Option<String>,
        /// Ordering: status, oldest or newest.
        #[arg(long, default_value = "status")]
        sort: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Change a lead's status.
    LeadStatus {
        lead: String,
        status: String,
        /// RFC 3339 appointment time when booking.
        #[arg(long)]
        appointment: Option<String>,
    },

    /// Replace the appointment time of a booked lead.
    Appointment {
        lead: String,
        /// RFC 3339 timestamp.
        at: String,
    },

    /// Log a conversation note on a lead.
    Note { lead: String, text: String },

    /// Show lead statistics.
    Stats {
        #[arg(long, value_enum, default_value_t = StatsWindow::Week)]
        window: StatsWindow,
        /// Custom range start (YYYY-MM-DD).
        #[arg(long)]
        from: Option<String>,
        /// Custom range end (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        to: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
enum ViewArg {
    List,
    Grouped,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
enum StatsWindow {
    Week,
    Month,
    PrevMonth,
    Custom,
}

fn main() -> Result<()> {
    let Cli { dir, cmd } = Cli::parse();

    if should_install_tracing(&cmd) {
        install_tracing();
    }

    let workdir = dir.unwrap_or_else(|| PathBuf::from("."));
    execute_command(&workdir, cmd)
}

fn execute_command(workdir: &std::path::Path, command: Command) -> Result<()> {
    let config = ProjectConfig::from_workdir(workdir)?;
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let session = Session::new(now, config.session.clone());
    let store = JsonStore::open(workdir)?;
    let parser = KeywordIntakeParser::new(config.intake);
    let mut service = DashboardService::open(store, config.directory, parser)?;
    commands::run(command, &mut service, &session)
}

const fn should_install_tracing(cmd: &Command) -> bool {
    !matches!(
        cmd,
        Command::Tasks {
            format: OutputFormat::Json,
            ..
        } | Command::Leads {
            format: OutputFormat::Json,
            ..
        }
    )
}

fn install_tracing() {
    // RUST_LOG is honoured; INFO otherwise.
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
