use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod calendar;
mod config;
mod dates;
mod html;
mod mocks;
mod persistence;
mod plan;
mod progress;
mod schedule;
mod server;
mod state;
mod storage;
mod tracker;
mod types;

use config::Config;
use state::Action;
use tracker::Tracker;

#[derive(Parser, Debug)]
#[command(name = "ripasso")]
#[command(about = "Track a day-by-day study plan, mock exams and progress")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory holding the database and generated files
    /// [default: $RIPASSO_DATA_DIR or .]
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the web server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Generate static HTML (no server)
    Build,

    /// Show the progress report
    Status,

    /// List every scheduled study day
    Schedule,

    /// List every mock exam
    Mocks,

    /// Mark or unmark something as done
    Toggle {
        #[command(subcommand)]
        target: ToggleTarget,
    },

    /// Remove all day marks
    ClearDays,
}

#[derive(Subcommand, Debug)]
enum ToggleTarget {
    /// A whole subject, by number
    Subject { number: u32 },

    /// One topic of a subject, by 0-based index
    Topic { subject: u32, topic: usize },

    /// A scheduled study day
    Day {
        /// Date as YYYY-MM-DD
        #[arg(value_parser = dates::parse_date_key)]
        date: NaiveDate,
    },

    /// A mock exam, by id
    Mock { id: u32 },
}

impl From<ToggleTarget> for Action {
    fn from(target: ToggleTarget) -> Self {
        match target {
            ToggleTarget::Subject { number } => Action::ToggleSubject { number },
            ToggleTarget::Topic { subject, topic } => Action::ToggleTopic { subject, topic },
            ToggleTarget::Day { date } => Action::ToggleDay { date },
            ToggleTarget::Mock { id } => Action::ToggleMock { id },
        }
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level))
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("tower_http=warn".parse().unwrap());

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_max_level(Level::TRACE)
        .init();
}

fn log_status(tracker: &Tracker) {
    let progress = tracker.progress();
    info!(
        overall = %format!("{:.2}%", progress.overall_percent),
        subjects = %format!("{}/{}", progress.subjects_done, progress.subjects_total),
        mocks = %format!("{}/{}", progress.mocks_done, progress.mocks_total),
        topics = %format!("{}/{}", progress.topics_done, progress.topics_total),
        days = %format!("{}/{}", progress.days_done, progress.days_total),
        "Progress"
    );
}

fn apply(tracker: &mut Tracker, action: Action) -> Result<()> {
    tracker.dispatch(action)?;
    log_status(tracker);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level);

    let config = Config::resolve(args.data_dir);

    match args.command {
        // Default to serve if no command specified
        None => {
            server::serve(8080, config).await?;
        }
        Some(Commands::Serve { port }) => {
            server::serve(port, config).await?;
        }
        Some(Commands::Build) => {
            let tracker = config.open_tracker()?;
            let html_path = config.html_path();
            html::generate_html(&tracker, &html_path)?;
            info!(path = %html_path.display(), "HTML saved");
        }
        Some(Commands::Status) => {
            let tracker = config.open_tracker()?;
            log_status(&tracker);
        }
        Some(Commands::Schedule) => {
            let tracker = config.open_tracker()?;
            let state = tracker.state();
            for entry in tracker.schedule() {
                let duration = plan::subject(entry.subject_number)
                    .map(|s| s.duration_days)
                    .unwrap_or_default();
                info!(
                    date = %entry.date_key(),
                    subject = %entry.subject_name,
                    day = %format!("{}/{}", entry.day_index, duration),
                    done = state.days.is_done(&entry.date),
                    "Study day"
                );
            }
        }
        Some(Commands::Mocks) => {
            let tracker = config.open_tracker()?;
            for mock in tracker.mocks() {
                info!(
                    id = mock.id,
                    date = %mock.date_key(),
                    done = mock.done,
                    note = %mock.note,
                    "Mock"
                );
            }
        }
        Some(Commands::Toggle { target }) => {
            let mut tracker = config.open_tracker()?;
            apply(&mut tracker, target.into())?;
        }
        Some(Commands::ClearDays) => {
            let mut tracker = config.open_tracker()?;
            apply(&mut tracker, Action::ClearDays)?;
        }
    }

    Ok(())
}
