use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use medvault_cli::{
    describe_failure, init_tracing, render_list_table, render_stats_table, OutputFormat,
};
use medvault_core::{AppError, CacheConfig, ErrorMetadata};
use medvault_reports::{format_bytes, ReportCache, ReportCacheConfig};
use medvault_storage::create_storage;

#[derive(Parser, Debug)]
#[command(name = "medvault")]
#[command(about = "Manage locally cached PDF reports")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a PDF under a report number, replacing any previous copy
    Store {
        report_number: String,
        patient_name: String,
        /// Path to the PDF file
        pdf_path: PathBuf,
    },
    /// Fetch a stored report
    Get {
        report_number: String,
        /// Write the PDF to this path instead of printing a summary
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// Delete a stored report
    Delete { report_number: String },
    /// Delete every stored report
    Clear,
    /// Show storage usage
    Stats {
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// List stored reports, newest first
    List {
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config = CacheConfig::from_env()?;
    init_tracing(config.log_format());

    let storage = create_storage(&config)
        .await
        .map_err(|e| AppError::Config(e.to_string()))?;
    let cache = ReportCache::new(storage, ReportCacheConfig::from(&config));

    match run(&cache, args.command).await {
        Ok(code) => Ok(code),
        Err(err) => {
            eprint!("{}", describe_failure(&err, !config.is_production()));
            Ok(ExitCode::from(err.exit_code()))
        }
    }
}

async fn run(cache: &ReportCache, command: Command) -> Result<ExitCode, AppError> {
    match command {
        Command::Store {
            report_number,
            patient_name,
            pdf_path,
        } => {
            let content = tokio::fs::read(&pdf_path)
                .await
                .with_context(|| format!("Failed to read {}", pdf_path.display()))
                .map_err(|e| AppError::InvalidInput(format!("{:#}", e)))?;

            let report = cache.store(&report_number, &patient_name, content).await?;
            println!(
                "Stored {} ({}) as {}",
                report.report_number,
                format_bytes(report.file_size),
                report.filename
            );
        }

        Command::Get { report_number, out } => {
            let Some(report) = cache.get(&report_number).await? else {
                return Err(AppError::NotFound(format!(
                    "Report {} not found",
                    report_number
                )));
            };

            match out {
                Some(path) => {
                    tokio::fs::write(&path, &report.content).await?;
                    println!(
                        "Wrote {} ({}) to {}",
                        report.filename,
                        format_bytes(report.file_size),
                        path.display()
                    );
                }
                None => {
                    println!("{}", serde_json::to_string_pretty(&report.summary())?);
                }
            }
        }

        Command::Delete { report_number } => {
            if cache.delete(&report_number).await? {
                println!("deleted");
            } else {
                println!("not found");
            }
        }

        Command::Clear => {
            let removed = cache.clear().await?;
            println!("Removed {} report(s)", removed);
        }

        Command::Stats { format } => {
            let stats = cache.stats().await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
                OutputFormat::Table => print!("{}", render_stats_table(&stats)),
            }
        }

        Command::List { format } => {
            let reports = cache.list().await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
                OutputFormat::Table => print!("{}", render_list_table(&reports)),
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
