//! Record codec
//!
//! A stored report is persisted as a JSON envelope:
//!
//! ```json
//! {
//!   "version": 1,
//!   "report_number": "RPT-001",
//!   "patient_name": "Jane Doe",
//!   "filename": "Discharge_Report_RPT-001_Jane_Doe.pdf",
//!   "file_size": 5000,
//!   "download_date": "2026-01-01T10:00:00Z",
//!   "content": "<base64, standard alphabet, padded>"
//! }
//! ```
//!
//! The version is probed before the rest of the envelope is parsed, so a
//! future layout is reported as `UnsupportedVersion` rather than a JSON error.
//! `file_size` must match the decoded content length.
//!
//! [`decode_summary`] applies the same checks but never materialises the
//! content: the length is computed from the base64 text, which is validated
//! against the alphabet and canonical padding the way the decoder would.

use std::borrow::Cow;

use base64::{engine::general_purpose::STANDARD, DecodeError, Engine as _};
use chrono::{DateTime, Utc};
use medvault_core::{ReportSummary, StoredReport};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current envelope version written by `encode_report`
pub const RECORD_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Malformed record JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed record content: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Unsupported record version: {0}")]
    UnsupportedVersion(u32),

    #[error("Record size mismatch: declared {declared} bytes, content has {actual} bytes")]
    SizeMismatch { declared: u64, actual: u64 },
}

#[derive(Deserialize)]
struct VersionProbe {
    version: u32,
}

#[derive(Serialize, Deserialize)]
struct RecordEnvelope {
    version: u32,
    report_number: String,
    patient_name: String,
    filename: String,
    file_size: u64,
    download_date: DateTime<Utc>,
    content: String,
}

#[derive(Deserialize)]
struct SummaryEnvelope<'a> {
    report_number: String,
    patient_name: String,
    filename: String,
    file_size: u64,
    download_date: DateTime<Utc>,
    #[serde(borrow)]
    content: Cow<'a, str>,
}

fn check_version(bytes: &[u8]) -> Result<(), CodecError> {
    let probe: VersionProbe = serde_json::from_slice(bytes)?;
    if probe.version != RECORD_FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion(probe.version));
    }
    Ok(())
}

fn check_size(declared: u64, actual: u64) -> Result<(), CodecError> {
    if actual != declared {
        return Err(CodecError::SizeMismatch { declared, actual });
    }
    Ok(())
}

fn sextet(byte: u8) -> Option<u8> {
    match byte {
        b'A'..=b'Z' => Some(byte - b'A'),
        b'a'..=b'z' => Some(byte - b'a' + 26),
        b'0'..=b'9' => Some(byte - b'0' + 52),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}

/// Number of bytes a padded standard base64 string decodes to.
///
/// Rejects exactly what `STANDARD.decode` rejects: bad length, bytes outside
/// the alphabet, non-canonical padding and non-zero trailing bits.
fn decoded_len(encoded: &str) -> Result<u64, DecodeError> {
    let bytes = encoded.as_bytes();
    if bytes.len() % 4 != 0 {
        return Err(DecodeError::InvalidLength);
    }

    let padding = bytes.iter().rev().take_while(|&&b| b == b'=').count();
    if padding > 2 {
        return Err(DecodeError::InvalidPadding);
    }

    let data = &bytes[..bytes.len() - padding];
    let mut last = 0;
    for (offset, &byte) in data.iter().enumerate() {
        last = sextet(byte).ok_or(DecodeError::InvalidByte(offset, byte))?;
    }

    let unused_bits = match padding {
        1 => 0b11,
        2 => 0b1111,
        _ => 0,
    };
    if last & unused_bits != 0 {
        let offset = data.len() - 1;
        return Err(DecodeError::InvalidLastSymbol(offset, data[offset]));
    }

    Ok((bytes.len() / 4 * 3 - padding) as u64)
}

pub fn encode_report(report: &StoredReport) -> Result<Vec<u8>, CodecError> {
    let envelope = RecordEnvelope {
        version: RECORD_FORMAT_VERSION,
        report_number: report.report_number.clone(),
        patient_name: report.patient_name.clone(),
        filename: report.filename.clone(),
        file_size: report.file_size,
        download_date: report.download_date,
        content: STANDARD.encode(&report.content),
    };
    Ok(serde_json::to_vec(&envelope)?)
}

pub fn decode_report(bytes: &[u8]) -> Result<StoredReport, CodecError> {
    check_version(bytes)?;

    let envelope: RecordEnvelope = serde_json::from_slice(bytes)?;
    let content = STANDARD.decode(envelope.content.as_bytes())?;
    check_size(envelope.file_size, content.len() as u64)?;

    Ok(StoredReport {
        report_number: envelope.report_number,
        patient_name: envelope.patient_name,
        filename: envelope.filename,
        file_size: envelope.file_size,
        download_date: envelope.download_date,
        content,
    })
}

/// Decode a record's metadata without decoding its content.
///
/// Fails on every record `decode_report` would fail on.
pub fn decode_summary(bytes: &[u8]) -> Result<ReportSummary, CodecError> {
    check_version(bytes)?;

    let envelope: SummaryEnvelope<'_> = serde_json::from_slice(bytes)?;
    check_size(envelope.file_size, decoded_len(&envelope.content)?)?;

    Ok(ReportSummary {
        report_number: envelope.report_number,
        patient_name: envelope.patient_name,
        filename: envelope.filename,
        file_size: envelope.file_size,
        download_date: envelope.download_date,
    })
}
