//! CLI entry point for the attendance rater.
//!
//! Loads students, modules, periods and attendance from the backend or a JSON
//! fixture, then reports session, module and student attendance rates, or
//! manages period cancellations.

use anyhow::{Context, Result, anyhow, bail};
use attendance_rater::aggregator::{AttendanceAggregator, SessionPolicy};
use attendance_rater::cancellation::{JsonFileStore, PeriodStatus};
use attendance_rater::config::Settings;
use attendance_rater::fetch::{BasicClient, HttpClient, auth::ApiKey};
use attendance_rater::infra::{backend::BackendClient, fixture::FixtureSource};
use attendance_rater::model::Scope;
use attendance_rater::output::{append_rows, print_json, print_pretty};
use attendance_rater::report;
use attendance_rater::services::source::AttendanceSource;
use attendance_rater::snapshot::{Snapshot, load_snapshot};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::ffi::OsStr;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "attendance_rater")]
#[command(about = "Attendance rates for university modules", long_about = None)]
struct Cli {
    /// Backend URL or path to a JSON fixture [default: ATTENDANCE_API_URL]
    #[arg(long, global = true, value_name = "URL_OR_FILE")]
    source: Option<String>,

    /// Which periods to load
    #[arg(long, global = true, value_enum, default_value_t = ScopeArg::All)]
    scope: ScopeArg,

    /// How a module's sessions are derived
    #[arg(long, global = true, value_enum, default_value_t = SessionsArg::Observed)]
    sessions: SessionsArg,

    /// First day counted by `--sessions scheduled` (YYYY-MM-DD)
    #[arg(long, global = true)]
    from: Option<NaiveDate>,

    /// Last day counted by `--sessions scheduled` (YYYY-MM-DD)
    #[arg(long, global = true)]
    to: Option<NaiveDate>,

    /// Cancellation book [default: CANCELLATIONS_PATH or data/cancellations.json]
    #[arg(long, global = true)]
    cancellations: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScopeArg {
    All,
    Lecturer,
}

impl From<ScopeArg> for Scope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::All => Scope::All,
            ScopeArg::Lecturer => Scope::Lecturer,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SessionsArg {
    /// Sessions seen in attendance records
    Observed,
    /// Every weekly occurrence between --from and --to
    Scheduled,
}

#[derive(Args)]
struct Emit {
    /// CSV file to append rows to
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Also log the full report as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Attendance sheet for one session of a period
    Period {
        #[arg(short, long)]
        module: String,

        #[arg(short, long)]
        period: String,

        /// Session date (YYYY-MM-DD)
        #[arg(short, long)]
        date: NaiveDate,

        /// Only list students whose name or number contains this
        #[arg(short, long)]
        search: Option<String>,

        #[command(flatten)]
        emit: Emit,
    },
    /// Module rate and every enrolled student's standing
    Module {
        #[arg(short, long)]
        module: String,

        #[command(flatten)]
        emit: Emit,
    },
    /// One student's attendance in a module
    Student {
        #[arg(short, long)]
        student: String,

        #[arg(short, long)]
        module: String,

        #[command(flatten)]
        emit: Emit,
    },
    /// Module rate for every module
    Overview {
        #[command(flatten)]
        emit: Emit,
    },
    /// Weekly timetable with each period's cancellation state
    Timetable {
        #[command(flatten)]
        emit: Emit,
    },
    /// Cancel a period this week, permanently, or on one date
    #[command(group(
        clap::ArgGroup::new("mode")
            .required(true)
            .args(["this_week", "permanent", "date"])
    ))]
    Cancel {
        #[arg(short, long)]
        period: String,

        #[arg(long)]
        this_week: bool,

        #[arg(long)]
        permanent: bool,

        /// Cancel only the session on this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Lift a period's cancellation, or one date's with --date
    Reactivate {
        #[arg(short, long)]
        period: String,

        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Revert weekly cancellations older than seven days
    Sweep,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file
    let settings = Settings::from_env()?;

    // Logging setup: colored stderr + JSON rolling log file
    let log_dir = settings
        .log_file_path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = settings
        .log_file_path
        .file_name()
        .unwrap_or(OsStr::new("attendance_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let policy = session_policy(&cli)?;
    let scope = Scope::from(cli.scope);
    let store = JsonFileStore::new(
        cli.cancellations
            .clone()
            .unwrap_or_else(|| settings.cancellations_path.clone()),
    );
    let source = cli.source.clone().or_else(|| settings.api_url.clone());

    match cli.command {
        Commands::Period {
            module,
            period,
            date,
            search,
            emit,
        } => {
            let snapshot = load(source.as_deref(), &settings, scope).await?;
            let book = store.load()?;
            let aggregator = AttendanceAggregator::new(&book).with_policy(policy);

            if snapshot.is_empty() {
                warn!(module = %module, period = %period, "No data available");
                return Ok(());
            }
            let report = report::session_report(
                &snapshot,
                &aggregator,
                &module,
                &period,
                date,
                search.as_deref(),
            )?;

            match report.period_rate.held() {
                Some(rate) => info!(
                    module = %report.module_code,
                    period = %report.period_id,
                    date = %report.date,
                    present = rate.present_count,
                    enrolled = rate.total_enrolled,
                    rate_percent = rate.rate_percent,
                    "Session attendance"
                ),
                None => info!(
                    module = %report.module_code,
                    period = %report.period_id,
                    date = %report.date,
                    "Session cancelled"
                ),
            }
            for row in &report.roster {
                info!(
                    student_number = %row.student_number,
                    name = %row.full_name,
                    present = row.present,
                    "Roster"
                );
            }
            info!(
                module = %report.module_code,
                sessions = report.module_rate.sessions,
                rate_percent = report.module_rate.rate_percent,
                "Module attendance"
            );

            emit_report(&emit, &report, &report.roster)?;
        }
        Commands::Module { module, emit } => {
            let snapshot = load(source.as_deref(), &settings, scope).await?;
            let book = store.load()?;
            let aggregator = AttendanceAggregator::new(&book).with_policy(policy);

            let report = report::module_report(&snapshot, &aggregator, &module);

            info!(
                module = %report.module_code,
                name = %report.module_name,
                sessions = report.rate.sessions,
                actual = report.rate.actual_attendance,
                possible = report.rate.possible_attendance,
                rate_percent = report.rate.rate_percent,
                "Module attendance"
            );
            for row in &report.students {
                info!(
                    student_number = %row.student_number,
                    name = %row.full_name,
                    attended = row.attended,
                    total_sessions = row.total_sessions,
                    rate_percent = row.rate_percent,
                    status = %row.status,
                    "Student"
                );
            }

            emit_report(&emit, &report, &report.students)?;
        }
        Commands::Student {
            student,
            module,
            emit,
        } => {
            let snapshot = load(source.as_deref(), &settings, scope).await?;
            let book = store.load()?;
            let aggregator = AttendanceAggregator::new(&book).with_policy(policy);

            if snapshot.student(&student).is_none() {
                warn!(student = %student, "Student not found in snapshot");
            }
            let row = report::student_row(&snapshot, &aggregator, &student, &module);

            info!(
                student_number = %row.student_number,
                name = %row.full_name,
                module = %row.module_code,
                attended = row.attended,
                total_sessions = row.total_sessions,
                rate_percent = row.rate_percent,
                status = %row.status,
                "Student attendance"
            );

            emit_report(&emit, &row, std::slice::from_ref(&row))?;
        }
        Commands::Overview { emit } => {
            let snapshot = load(source.as_deref(), &settings, scope).await?;
            let book = store.load()?;
            let aggregator = AttendanceAggregator::new(&book).with_policy(policy);

            let rows = report::overview(&snapshot, &aggregator);
            for row in &rows {
                info!(
                    module = %row.module_code,
                    name = %row.module_name,
                    sessions = row.sessions,
                    rate_percent = row.rate_percent,
                    "Module attendance"
                );
            }
            info!(modules = rows.len(), "Overview complete");

            emit_report(&emit, &rows, &rows)?;
        }
        Commands::Timetable { emit } => {
            let snapshot = load(source.as_deref(), &settings, scope).await?;
            let book = store.load()?;

            let rows = report::timetable(&snapshot, &book);
            for row in &rows {
                info!(
                    day = %row.day,
                    start = %row.start_time.format("%H:%M"),
                    end = %row.end_time.format("%H:%M"),
                    period = %row.period_id,
                    module = %row.module_code,
                    venue = row.venue.as_deref().unwrap_or("-"),
                    state = row.state,
                    "Period"
                );
            }

            emit_report(&emit, &rows, &rows)?;
        }
        Commands::Cancel {
            period,
            this_week,
            permanent,
            date,
        } => {
            let mut book = store.load()?;
            let now = Utc::now();

            if let Some(date) = date {
                if !book.cancel_session(&period, date) {
                    warn!(period = %period, date = %date, "Session was already cancelled");
                }
            } else if permanent {
                book.cancel_permanently(&period, now)?;
            } else if this_week {
                let snapshot = load(source.as_deref(), &settings, scope).await?;
                let target = snapshot.period(&period).ok_or_else(|| {
                    anyhow!(
                        "period {period} is not in the timetable; \
                         cannot work out this week's session"
                    )
                })?;
                book.cancel_this_week(target, now)?;
            }

            store.save(&book)?;
        }
        Commands::Reactivate { period, date } => {
            let mut book = store.load()?;

            match date {
                Some(date) => {
                    if !book.restore_session(&period, date) {
                        bail!("session {period} on {date} is not cancelled");
                    }
                }
                None => {
                    let previous = book.reactivate(&period)?;
                    if let PeriodStatus::CancelledThisWeek { session_date, .. } = previous {
                        info!(period = %period, date = %session_date, "Session restored");
                    }
                }
            }

            store.save(&book)?;
        }
        Commands::Sweep => {
            let mut book = store.load()?;
            let reset = book.sweep(Utc::now());
            info!(reset = reset.len(), periods = ?reset, "Weekly reset applied");
            if !reset.is_empty() {
                store.save(&book)?;
            }
        }
    }

    Ok(())
}

fn session_policy(cli: &Cli) -> Result<SessionPolicy> {
    match cli.sessions {
        SessionsArg::Observed => Ok(SessionPolicy::Observed),
        SessionsArg::Scheduled => match (cli.from, cli.to) {
            (Some(from), Some(to)) if from <= to => Ok(SessionPolicy::Scheduled { from, to }),
            (Some(from), Some(to)) => bail!("--from {from} is after --to {to}"),
            _ => bail!("--sessions scheduled needs both --from and --to"),
        },
    }
}

/// Builds the data source: an http(s) URL selects the backend, anything else
/// is read as a fixture file.
fn build_source(source: &str, settings: &Settings) -> Result<Box<dyn AttendanceSource>> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let mut http: Box<dyn HttpClient> =
            Box::new(BasicClient::with_timeout(settings.fetch_timeout)?);
        if let Some(token) = settings.api_token.as_deref() {
            http = Box::new(ApiKey::bearer(http, token)?);
        }
        Ok(Box::new(BackendClient::new(http, source)))
    } else {
        Ok(Box::new(FixtureSource::load(source)?))
    }
}

/// Fetches the snapshot, giving up if the user hits Ctrl-C.
///
/// A failed listing yields an empty snapshot so every report shows zeros.
#[tracing::instrument(skip(settings), fields(timeout_secs = settings.fetch_timeout.as_secs()))]
async fn load(source: Option<&str>, settings: &Settings, scope: Scope) -> Result<Snapshot> {
    let source = source.context("no data source: pass --source or set ATTENDANCE_API_URL")?;
    let source = build_source(source, settings)?;
    let timeout: Duration = settings.fetch_timeout;

    let outcome = tokio::select! {
        outcome = load_snapshot(source.as_ref(), scope, timeout) => outcome,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, dropping in-flight requests");
            bail!("interrupted");
        }
    };

    if !outcome.is_complete() {
        let failed: Vec<&str> = outcome.failures.iter().map(|f| f.listing).collect();
        warn!(
            failed = ?failed,
            "No data available: could not load {}. Statistics below are empty.",
            failed.join(", ")
        );
    }

    Ok(outcome.snapshot)
}

fn emit_report<T, R>(emit: &Emit, report: &T, rows: &[R]) -> Result<()>
where
    T: Serialize + Debug,
    R: Serialize,
{
    print_pretty(report);
    if emit.json {
        print_json(report)?;
    }
    if let Some(path) = &emit.csv {
        append_rows(path, rows)?;
        info!(path = %path.display(), rows = rows.len(), "CSV written");
    }
    Ok(())
}
