//! Quota accounting shared by the backends.
//!
//! An entry costs `key.len() + value.len()` bytes.

use crate::traits::{StorageError, StorageResult};

pub(crate) fn entry_cost(key: &str, value_len: u64) -> u64 {
    key.len() as u64 + value_len
}

/// Check that replacing an entry costing `replaced` with one costing
/// `incoming` keeps total usage within `quota`.
pub(crate) fn check_quota(
    quota: Option<u64>,
    used: u64,
    replaced: u64,
    incoming: u64,
) -> StorageResult<()> {
    let Some(quota) = quota else {
        return Ok(());
    };

    let base = used.saturating_sub(replaced);
    if base.saturating_add(incoming) > quota {
        return Err(StorageError::QuotaExceeded {
            required: incoming,
            available: quota.saturating_sub(base),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited_without_quota() {
        assert!(check_quota(None, u64::MAX, 0, u64::MAX).is_ok());
    }

    #[test]
    fn test_replacement_frees_its_own_bytes() {
        // 90 used, of which 40 is the entry being replaced
        assert!(check_quota(Some(100), 90, 40, 50).is_ok());
        assert!(check_quota(Some(100), 90, 40, 51).is_err());
    }

    #[test]
    fn test_reports_available_bytes() {
        match check_quota(Some(100), 70, 0, 50) {
            Err(StorageError::QuotaExceeded {
                required,
                available,
            }) => {
                assert_eq!(required, 50);
                assert_eq!(available, 30);
            }
            other => panic!("expected QuotaExceeded, got {:?}", other),
        }
    }

    #[test]
    fn test_entry_cost_counts_key() {
        assert_eq!(entry_cost("abc", 10), 13);
    }
}
