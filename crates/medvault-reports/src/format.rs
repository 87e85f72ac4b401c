//! Presentation helpers

const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
const STEP: u64 = 1024;

/// Human readable size with base-1024 units and at most two decimals.
///
/// `0` -> `"0 Bytes"`, `1536` -> `"1.5 KB"`, `5242880` -> `"5 MB"`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut divisor = 1u64;
    while unit + 1 < UNITS.len() && bytes / divisor >= STEP {
        divisor *= STEP;
        unit += 1;
    }

    let value = format!("{:.2}", bytes as f64 / divisor as f64);
    let value = value.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", value, UNITS[unit])
}
