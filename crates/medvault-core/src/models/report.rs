//! Report models: a cached PDF report, its content-free summary, and the
//! aggregate statistics computed over the cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A generated report held in the local cache.
///
/// `report_number` is the unique key; storing again under the same number
/// replaces the whole record. `file_size` always equals `content.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredReport {
    pub report_number: String,
    pub patient_name: String,
    pub filename: String,
    pub file_size: u64,
    pub download_date: DateTime<Utc>,
    pub content: Vec<u8>,
}

impl StoredReport {
    /// Build a record captured at `download_date`, deriving the display
    /// filename and size from the inputs.
    pub fn new(
        report_number: impl Into<String>,
        patient_name: impl Into<String>,
        content: Vec<u8>,
        download_date: DateTime<Utc>,
    ) -> Self {
        let report_number = report_number.into();
        let patient_name = patient_name.into();
        let filename = report_filename(&report_number, &patient_name);

        Self {
            file_size: content.len() as u64,
            report_number,
            patient_name,
            filename,
            download_date,
            content,
        }
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            report_number: self.report_number.clone(),
            patient_name: self.patient_name.clone(),
            filename: self.filename.clone(),
            file_size: self.file_size,
            download_date: self.download_date,
        }
    }
}

/// Report metadata without the PDF payload, used for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub report_number: String,
    pub patient_name: String,
    pub filename: String,
    pub file_size: u64,
    pub download_date: DateTime<Utc>,
}

/// Aggregates over the cache, recomputed on every request.
///
/// `usage_percentage` is the ratio `total_size / max_size`: 1.0 means the
/// configured cap is reached. The cap is never enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageStats {
    pub report_count: usize,
    pub total_size: u64,
    pub usage_percentage: f64,
    pub max_size: u64,
    /// Records that could not be decoded and were skipped by the scan
    pub corrupt_entries: usize,
}

impl StorageStats {
    /// Compute statistics from the sizes of every readable record.
    pub fn from_sizes<I>(sizes: I, max_size: u64, corrupt_entries: usize) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        let (report_count, total_size) = sizes
            .into_iter()
            .fold((0usize, 0u64), |(count, total), size| {
                (count + 1, total.saturating_add(size))
            });

        let usage_percentage = if max_size == 0 {
            0.0
        } else {
            total_size as f64 / max_size as f64
        };

        Self {
            report_count,
            total_size,
            usage_percentage,
            max_size,
            corrupt_entries,
        }
    }

    pub fn is_over_capacity(&self) -> bool {
        self.usage_percentage >= 1.0
    }

    pub fn is_near_capacity(&self, threshold: f64) -> bool {
        self.usage_percentage >= threshold
    }

    /// Usage scaled to 0-100 for display.
    pub fn usage_percent_display(&self) -> f64 {
        self.usage_percentage * 100.0
    }
}

/// Display filename for a report: `Discharge_Report_{number}_{patient}.pdf`.
///
/// Characters outside `[A-Za-z0-9._-]` are replaced by `_`.
pub fn report_filename(report_number: &str, patient_name: &str) -> String {
    format!(
        "Discharge_Report_{}_{}.pdf",
        sanitize_component(report_number),
        sanitize_component(patient_name)
    )
}

fn sanitize_component(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_derives_size_and_filename() {
        let report = StoredReport::new("RPT-001", "Jane Doe", vec![0u8; 42], Utc::now());
        assert_eq!(report.file_size, 42);
        assert_eq!(report.filename, "Discharge_Report_RPT-001_Jane_Doe.pdf");
    }

    #[test]
    fn test_filename_sanitizes_separators() {
        assert_eq!(
            report_filename("a/b", " O'Brien, J. "),
            "Discharge_Report_a_b_O_Brien__J..pdf"
        );
    }

    #[test]
    fn test_summary_drops_content() {
        let report = StoredReport::new("RPT-9", "X", b"%PDF-1.4".to_vec(), Utc::now());
        let summary = report.summary();
        assert_eq!(summary.report_number, "RPT-9");
        assert_eq!(summary.file_size, 8);
        assert_eq!(summary.download_date, report.download_date);
    }

    #[test]
    fn test_stats_from_sizes() {
        let stats = StorageStats::from_sizes([5000, 3000], 10_000, 1);
        assert_eq!(stats.report_count, 2);
        assert_eq!(stats.total_size, 8000);
        assert!((stats.usage_percentage - 0.8).abs() < f64::EPSILON);
        assert_eq!(stats.corrupt_entries, 1);
        assert!(stats.is_near_capacity(0.8));
        assert!(!stats.is_over_capacity());
        assert!((stats.usage_percent_display() - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_stats_empty_and_zero_cap() {
        let stats = StorageStats::from_sizes(std::iter::empty(), 0, 0);
        assert_eq!(stats.report_count, 0);
        assert_eq!(stats.total_size, 0);
        assert_eq!(stats.usage_percentage, 0.0);
    }

    #[test]
    fn test_stats_over_capacity_is_reported_not_enforced() {
        let stats = StorageStats::from_sizes([700, 700], 1000, 0);
        assert!(stats.is_over_capacity());
        assert_eq!(stats.total_size, 1400);
    }
}
