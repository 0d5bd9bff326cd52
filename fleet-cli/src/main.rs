//! Fleet CLI
//!
//! Uploads equipment CSV exports, lists upload history, and renders or
//! deletes stored uploads. Records live in a directory store.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, Level};

use fleet_guard::config::PipelineConfig;
use fleet_guard::error::FleetError;
use fleet_guard::ingest::Upload;
use fleet_guard::logging::setup::{init_logging, LoggingConfig};
use fleet_guard::logging::LogConfig;
use fleet_guard::report::ReportFormat;
use fleet_guard::repository::{FileSystemRepository, HistoryEntry, UploadId, UploadRecord};
use fleet_guard::service::AnalyticsService;

#[derive(Parser, Debug)]
#[command(name = "fleet", author, version, about, long_about = None)]
struct Cli {
    /// Directory holding stored uploads
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    /// Log pipeline internals at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse a CSV export and store the result
    Upload {
        /// Path to the CSV file
        path: PathBuf,
    },
    /// List the most recent uploads
    History {
        /// Number of uploads to show (defaults to the configured window)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print one stored upload as JSON
    Show {
        id: UploadId,
    },
    /// Render the report of a stored upload
    Report {
        id: UploadId,
        #[arg(long, value_enum, default_value_t = FormatArg::Text)]
        format: FormatArg,
        /// Directory to write the report into
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Delete a stored upload
    Delete {
        id: UploadId,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Text => ReportFormat::Text,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let pipeline_log = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::production()
    };
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let logging = LoggingConfig::default()
        .with_level(level)
        .with_pipeline_log(&pipeline_log)
        .with_json_format(cli.json_logs);
    if let Err(e) = init_logging(logging) {
        eprintln!("warning: failed to initialize logging: {e}");
    }

    match run(cli, pipeline_log).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Pipeline errors carry a short user-facing message; anything
            // else is a local problem such as an unreadable input file.
            match e.downcast_ref::<FleetError>() {
                Some(fleet) => eprintln!("error: {}", fleet.user_message()),
                None => eprintln!("error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, pipeline_log: LogConfig) -> Result<()> {
    let config = PipelineConfig::from_env()?.with_log(pipeline_log);
    let store = match cli.store {
        Some(dir) => dir,
        None => default_store_dir(),
    };
    debug!(store = %store.display(), "opening record store");

    let repository = FileSystemRepository::open(&store)
        .await?
        .with_log_config(config.log.clone());
    let service = AnalyticsService::with_config(repository, config);

    match cli.command {
        Command::Upload { path } => upload(&service, &path).await,
        Command::History { limit } => {
            let entries = match limit {
                Some(limit) => service.history_with_limit(limit).await?,
                None => service.history().await?,
            };
            print_history(&entries);
            Ok(())
        }
        Command::Show { id } => {
            let entry = HistoryEntry::from(service.record(id).await?);
            println!("{}", serde_json::to_string_pretty(&entry)?);
            Ok(())
        }
        Command::Report { id, format, out } => {
            let format = ReportFormat::from(format);
            let renderer = format.renderer(&service.config().report);
            let document = service.report(id, renderer.as_ref()).await?;

            tokio::fs::create_dir_all(&out)
                .await
                .with_context(|| format!("cannot create {}", out.display()))?;
            let path = out.join(&document.file_name);
            tokio::fs::write(&path, &document.bytes)
                .await
                .with_context(|| format!("cannot write {}", path.display()))?;

            println!(
                "Wrote {} ({} page(s), {} bytes)",
                path.display(),
                document.page_count,
                document.len()
            );
            Ok(())
        }
        Command::Delete { id, yes } => {
            let record = service.record(id).await?;
            if !yes && !confirm(&format!("Delete record {id} ({})?", record.file_name))? {
                println!("Aborted");
                return Ok(());
            }
            service.delete(id).await?;
            println!("Record deleted successfully");
            Ok(())
        }
    }
}

async fn upload(service: &AnalyticsService<FileSystemRepository>, path: &Path) -> Result<()> {
    let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
        bail!("{} has no usable file name", path.display());
    };
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;

    let record = service.ingest(Some(Upload::new(file_name, bytes))).await?;
    print_dashboard(&record);
    Ok(())
}

fn print_dashboard(record: &UploadRecord) {
    let summary = &record.summary;
    println!(
        "#{} {}  units: {}  health: {}/100",
        record.id, record.file_name, summary.total_count, summary.health_score
    );
    println!(
        "  avg flowrate {:.2}  avg pressure {:.2}  avg temperature {:.2} C",
        summary.avg_flowrate, summary.avg_pressure, summary.avg_temperature
    );
    for alert in &summary.alerts {
        println!("  {alert}");
    }
}

fn print_history(entries: &[HistoryEntry]) {
    if entries.is_empty() {
        println!("No uploads yet");
        return;
    }

    println!("{:>5}  {:<16}  {:>6}  {:>6}  FILE", "ID", "DATE", "UNITS", "HEALTH");
    for entry in entries {
        println!(
            "{:>5}  {:<16}  {:>6}  {:>6}  {}",
            entry.id.to_string(),
            entry.date,
            entry.summary.total_count,
            entry.summary.health_score,
            entry.file_name
        );
        if let Some(alert) = entry.summary.headline_alert() {
            println!("{:>7}{alert}", "");
        }
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
}

/// Per-user data directory, falling back to the working directory.
fn default_store_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("fleet-guard").join("records"))
        .unwrap_or_else(|| PathBuf::from(".fleet-records"))
}
