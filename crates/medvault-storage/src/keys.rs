//! Shared key generation for report records.
//!
//! Key format: `{prefix}{report_number}`.

/// Storage key for a report number.
pub fn report_key(prefix: &str, report_number: &str) -> String {
    format!("{}{}", prefix, report_number)
}

/// Report number encoded in `key`, or `None` if the key is outside the prefix namespace.
pub fn report_number_from_key<'a>(prefix: &str, key: &'a str) -> Option<&'a str> {
    key.strip_prefix(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_round_trip() {
        let key = report_key("medvault:report:", "RPT-001");
        assert_eq!(key, "medvault:report:RPT-001");
        assert_eq!(report_number_from_key("medvault:report:", &key), Some("RPT-001"));
    }

    #[test]
    fn test_foreign_keys_are_ignored() {
        assert_eq!(report_number_from_key("medvault:report:", "theme"), None);
        assert_eq!(report_number_from_key("medvault:report:", "medvault:other:1"), None);
    }
}
