//! Shared helpers for the medvault command line tools: tracing setup, error
//! reporting and table rendering.

use std::fmt::Write as _;

use clap::ValueEnum;
use medvault_core::{AppError, ErrorMetadata, LogFormat, LogLevel, ReportSummary, StorageStats};
use medvault_reports::format_bytes;

/// Output format for listing commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

pub fn render_stats_table(stats: &StorageStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Reports stored:   {}", stats.report_count);
    let _ = writeln!(out, "Total size:       {}", format_bytes(stats.total_size));
    let _ = writeln!(out, "Size cap:         {}", format_bytes(stats.max_size));
    let _ = writeln!(out, "Usage:            {:.1}%", stats.usage_percent_display());
    if stats.corrupt_entries > 0 {
        let _ = writeln!(out, "Corrupt entries:  {}", stats.corrupt_entries);
    }
    if stats.is_over_capacity() {
        let _ = writeln!(out, "Warning: cache exceeds its size cap");
    }
    out
}

pub fn render_list_table(reports: &[ReportSummary]) -> String {
    if reports.is_empty() {
        return "No reports stored\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<16} {:<24} {:>10}  {}",
        "REPORT", "PATIENT", "SIZE", "DOWNLOADED"
    );
    for report in reports {
        let _ = writeln!(
            out,
            "{:<16} {:<24} {:>10}  {}",
            truncate_string(&report.report_number, 16),
            truncate_string(&report.patient_name, 24),
            format_bytes(report.file_size),
            report.download_date.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    out
}

/// Log a failed command at the error's own level and build the text for stderr.
///
/// `show_details` appends the full error chain, which can name paths and
/// other internals.
pub fn describe_failure(err: &AppError, show_details: bool) -> String {
    let details = err.detailed_message();
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(
            error_code = err.error_code(),
            error_type = err.error_type(),
            error = %details,
            "Command failed"
        ),
        LogLevel::Warn => tracing::warn!(
            error_code = err.error_code(),
            error_type = err.error_type(),
            error = %details,
            "Command failed"
        ),
        LogLevel::Error => tracing::error!(
            error_code = err.error_code(),
            error_type = err.error_type(),
            error = %details,
            "Command failed"
        ),
    }

    let mut out = String::new();
    let _ = writeln!(out, "Error: {}", err.client_message());
    if show_details {
        let _ = writeln!(out, "Details: {}", details);
    }
    if let Some(action) = err.suggested_action() {
        if err.is_recoverable() {
            let _ = writeln!(out, "Hint: {} (the operation can be retried)", action);
        } else {
            let _ = writeln!(out, "Hint: {}", action);
        }
    }
    out
}

/// Initialize tracing for CLI binaries. Logs go to stderr so command output
/// on stdout stays machine readable.
pub fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("medvault=info,warn"));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}
