//! loadbridge - stage freight records and submit them as bulk insert jobs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use loadbridge_bulk::loader::{append_report, load_records};
use loadbridge_bulk::salesforce::SalesforceBulkClient;
use loadbridge_bulk::{payload, BatchSubmitter, ContentType, RecordStager, SubmitOutcome};
use loadbridge_common::config::BulkConfig;
use loadbridge_common::logging::{init_logging, LogConfig, LogLevel};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "loadbridge")]
#[command(author, version, about = "Submit staged freight records as bulk insert jobs")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit records from a JSON Lines file as one bulk insert job
    Submit {
        /// Target object type, e.g. Load__c
        #[arg(short, long)]
        object: String,

        /// JSON Lines file with one flat record per line
        #[arg(short, long)]
        input: PathBuf,

        /// Payload encoding (csv or json)
        #[arg(short, long, default_value = "csv")]
        format: ContentType,

        /// Print the payload instead of submitting it
        #[arg(long)]
        dry_run: bool,

        /// Append a JSON Lines report of the completed job to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Print the payload that would be submitted
    Preview {
        /// JSON Lines file with one flat record per line
        #[arg(short, long)]
        input: PathBuf,

        /// Payload encoding (csv or json)
        #[arg(short, long, default_value = "csv")]
        format: ContentType,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Warn by default; preview writes the payload itself to stdout
    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    };

    // Environment variables take precedence over the flag
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("loadbridge")
        .build()
        .merge_env()?;
    let _guard = init_logging(&log_config)?;

    match cli.command {
        Command::Submit {
            object,
            input,
            format,
            dry_run,
            report,
        } => {
            if dry_run {
                preview(&input, format)?;
            } else {
                submit(&object, &input, format, report.as_deref()).await?;
            }
        },
        Command::Preview { input, format } => preview(&input, format)?,
    }

    Ok(())
}

fn stage_file(input: &Path) -> Result<RecordStager> {
    let records = load_records(input)
        .with_context(|| format!("Failed to load records from {}", input.display()))?;

    let mut stager = RecordStager::new();
    stager.extend(records);
    info!(records = stager.len(), input = %input.display(), "Records staged");
    Ok(stager)
}

fn preview(input: &Path, format: ContentType) -> Result<()> {
    let stager = stage_file(input)?;
    let payload = payload::encode(stager.records(), format)?;

    if payload.is_empty() {
        info!("Nothing to submit");
        return Ok(());
    }

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(payload.as_bytes())?;
    if !payload.as_bytes().ends_with(b"\n") {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}

async fn submit(object: &str, input: &Path, format: ContentType, report_path: Option<&Path>) -> Result<()> {
    let mut stager = stage_file(input)?;

    let config = BulkConfig::from_env().context("Failed to load bulk configuration")?;
    info!(environment = %config.environment, instance = %config.instance_url, "Using bulk endpoint");
    let client = SalesforceBulkClient::new(&config)?;

    let submitter = BatchSubmitter::new(format);
    match stager.submit_with(&submitter, object, &client).await {
        Ok(SubmitOutcome::NoOp) => info!(object, "No data to send"),
        Ok(SubmitOutcome::Completed(report)) => {
            info!(
                object,
                job_id = %report.job_id,
                records = report.records,
                records_failed = report.records_failed,
                "Submission complete"
            );
            if let Some(path) = report_path {
                append_report(path, &report)
                    .with_context(|| format!("Failed to write report to {}", path.display()))?;
            }
        },
        Err(err) => {
            error!(object, job_id = ?err.job_id(), error = %err, "Submission failed");
            return Err(err.into());
        },
    }

    Ok(())
}
