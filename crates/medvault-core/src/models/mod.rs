//! Domain models

pub mod report;

pub use report::{report_filename, ReportSummary, StorageStats, StoredReport};
