//! CLI entry point for the admissions statistics service.
//!
//! Serves the web facade, or queries and updates the stats store directly.

use admissions_stats::{
    config::{ServerArgs, StoreArgs},
    output::{print_json, print_records},
    record::{Metric, Observation},
    server::{AppState, serve},
};
use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "admissions_stats")]
#[command(
    about = "View and update admissions statistics per university and course",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web application
    Serve {
        #[command(flatten)]
        server: ServerArgs,
    },
    /// Show records, optionally only those for one course
    Show {
        /// Course name (case and surrounding whitespace are ignored)
        #[arg(short, long)]
        course: Option<String>,

        /// Print JSON instead of log lines
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List the courses recorded for a university
    Courses {
        /// Exact university name
        university: String,
    },
    /// Fold one applicant's scores into a record's averages
    Update {
        #[arg(long)]
        university: String,
        #[arg(long)]
        course: String,
        /// Years of work experience
        #[arg(long)]
        experience: f64,
        #[arg(long)]
        gpa: f64,
        #[arg(long)]
        gmat: Option<f64>,
        #[arg(long)]
        gre: Option<f64>,
        #[arg(long)]
        toefl: Option<f64>,
        #[arg(long)]
        ielts: Option<f64>,
    },
}

/// Colored stderr plus a daily-rolling JSON log file.
fn init_tracing() -> WorkerGuard {
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/admissions_stats.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("admissions_stats.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_filter =
        EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let json_filter =
        EnvFilter::try_from_env("RUST_LOG_JSON").unwrap_or_else(|_| EnvFilter::new("debug"));

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter);

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(json_filter);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _log_guard = init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { server } => {
            let state = AppState::new(cli.store.open(), server.default_course);
            serve(server.addr, state).await?;
        }
        Commands::Show { course, json } => {
            let store = cli.store.open();
            let records = match &course {
                Some(c) => store.find_by_course(c)?,
                None => store.load()?.to_vec(),
            };
            if records.is_empty() {
                warn!(course = ?course, "No matching records");
            }
            if json {
                print_json(&records)?;
            } else {
                print_records(&records);
            }
        }
        Commands::Courses { university } => {
            let courses = cli.store.open().courses_for_university(&university)?;
            info!(university = %university, total = courses.len(), "Courses");
            for course in courses {
                println!("{course}");
            }
        }
        Commands::Update {
            university,
            course,
            experience,
            gpa,
            gmat,
            gre,
            toefl,
            ielts,
        } => {
            let mut observation = Observation::new(experience, gpa);
            for (metric, value) in [
                (Metric::Gmat, gmat),
                (Metric::Gre, gre),
                (Metric::Toefl, toefl),
                (Metric::Ielts, ielts),
            ] {
                if let Some(v) = value {
                    observation = observation.with(metric, v);
                }
            }
            if let Some((metric, value)) = observation.values().find(|(_, v)| !v.is_finite()) {
                bail!("{metric} must be a finite number, got {value}");
            }

            match cli
                .store
                .open()
                .apply_observation(&university, &course, &observation)?
            {
                Some(record) => print_records(&[record]),
                None => warn!(
                    university = %university,
                    course = %course,
                    "No such record, nothing updated"
                ),
            }
        }
    }

    Ok(())
}
