//! Report cache
//!
//! A flat mapping from report number to [`StoredReport`], persisted through a
//! [`KeyValueStore`]. Aggregates are recomputed from a full scan on every
//! [`ReportCache::stats`] call, so they always reflect the current contents.
//! Scans read record metadata only; PDF content is decoded by `get` alone.
//!
//! A record is readable only if it decodes and names the same report number
//! as the key it is stored under. Anything else counts as corrupt.
//!
//! The cache assumes a single writer. Every mutation is exactly one storage
//! call, which the port guarantees to be atomic.

use chrono::Utc;
use medvault_core::{CacheConfig, ReportSummary, StorageStats, StoredReport};
use medvault_core::{DEFAULT_KEY_PREFIX, DEFAULT_MAX_SIZE_BYTES};
use medvault_storage::keys::{report_key, report_number_from_key};
use medvault_storage::{
    decode_report, decode_summary, encode_report, KeyValueStore, StorageError,
};
use std::sync::Arc;

use crate::error::{CacheError, CacheResult};
use crate::format::format_bytes;

/// Settings for a [`ReportCache`]
#[derive(Debug, Clone)]
pub struct ReportCacheConfig {
    /// Cap used for the usage ratio; never enforced
    pub max_size: u64,
    /// Usage ratio at which a store logs a warning
    pub warn_threshold: f64,
    pub key_prefix: String,
}

impl Default for ReportCacheConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE_BYTES,
            warn_threshold: 0.9,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

impl From<&CacheConfig> for ReportCacheConfig {
    fn from(config: &CacheConfig) -> Self {
        Self {
            max_size: config.max_size_bytes(),
            warn_threshold: config.warn_threshold(),
            key_prefix: config.key_prefix().to_string(),
        }
    }
}

/// Result of scanning every record in the cache namespace
struct Scan {
    reports: Vec<ReportSummary>,
    corrupt: usize,
}

#[derive(Clone)]
pub struct ReportCache {
    store: Arc<dyn KeyValueStore>,
    config: ReportCacheConfig,
}

impl ReportCache {
    pub fn new(store: Arc<dyn KeyValueStore>, config: ReportCacheConfig) -> Self {
        Self { store, config }
    }

    pub fn with_defaults(store: Arc<dyn KeyValueStore>) -> Self {
        Self::new(store, ReportCacheConfig::default())
    }

    pub fn max_size(&self) -> u64 {
        self.config.max_size
    }

    pub fn config(&self) -> &ReportCacheConfig {
        &self.config
    }

    fn key(&self, report_number: &str) -> String {
        report_key(&self.config.key_prefix, report_number)
    }

    /// Store a report, replacing any previous report with the same number.
    ///
    /// On failure nothing is written and a previously stored report under the
    /// same number stays readable.
    pub async fn store(
        &self,
        report_number: &str,
        patient_name: &str,
        content: Vec<u8>,
    ) -> CacheResult<StoredReport> {
        let report = StoredReport::new(report_number, patient_name, content, Utc::now());
        let encoded = encode_report(&report).map_err(|source| CacheError::Encode {
            report_number: report_number.to_string(),
            source,
        })?;

        self.store
            .set(&self.key(report_number), encoded)
            .await
            .map_err(|e| match e {
                StorageError::QuotaExceeded {
                    required,
                    available,
                } => CacheError::QuotaExceeded {
                    report_number: report_number.to_string(),
                    required,
                    available,
                },
                other => CacheError::Storage(other),
            })?;

        tracing::info!(
            report_number = %report.report_number,
            filename = %report.filename,
            size_bytes = report.file_size,
            "Report stored in local cache"
        );

        self.warn_on_usage().await;

        Ok(report)
    }

    /// Look up a report. Missing and unreadable records both yield `None`.
    pub async fn get(&self, report_number: &str) -> CacheResult<Option<StoredReport>> {
        let key = self.key(report_number);
        let Some(bytes) = self.store.get(&key).await? else {
            return Ok(None);
        };

        match decode_report(&bytes) {
            Ok(report) if report.report_number == report_number => Ok(Some(report)),
            Ok(report) => {
                tracing::warn!(
                    report_number = %report_number,
                    key = %key,
                    stored_report_number = %report.report_number,
                    "Ignoring cached report stored under a different key"
                );
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(
                    report_number = %report_number,
                    key = %key,
                    error = %e,
                    "Ignoring corrupt cached report"
                );
                Ok(None)
            }
        }
    }

    pub async fn contains(&self, report_number: &str) -> CacheResult<bool> {
        Ok(self.get(report_number).await?.is_some())
    }

    /// Remove a report, returning whether one was stored.
    pub async fn delete(&self, report_number: &str) -> CacheResult<bool> {
        let removed = self.store.remove(&self.key(report_number)).await?;
        if removed {
            tracing::info!(report_number = %report_number, "Report removed from local cache");
        } else {
            tracing::debug!(report_number = %report_number, "Delete of unknown report ignored");
        }
        Ok(removed)
    }

    /// Remove every record in the cache namespace, corrupt ones included.
    ///
    /// Keys outside the namespace are left alone. Returns how many records
    /// were removed.
    pub async fn clear(&self) -> CacheResult<usize> {
        let mut removed = 0;
        for key in self.namespace_keys().await? {
            if self.store.remove(&key).await? {
                removed += 1;
            }
        }
        tracing::info!(removed, "Local report cache cleared");
        Ok(removed)
    }

    pub async fn stats(&self) -> CacheResult<StorageStats> {
        let scan = self.scan().await?;
        Ok(StorageStats::from_sizes(
            scan.reports.iter().map(|r| r.file_size),
            self.config.max_size,
            scan.corrupt,
        ))
    }

    /// Summaries of every readable report, newest download first.
    pub async fn list(&self) -> CacheResult<Vec<ReportSummary>> {
        let mut summaries = self.scan().await?.reports;
        summaries.sort_by(|a, b| {
            b.download_date
                .cmp(&a.download_date)
                .then_with(|| a.report_number.cmp(&b.report_number))
        });
        Ok(summaries)
    }

    async fn namespace_keys(&self) -> CacheResult<Vec<String>> {
        Ok(self
            .store
            .keys()
            .await?
            .into_iter()
            .filter(|key| report_number_from_key(&self.config.key_prefix, key).is_some())
            .collect())
    }

    async fn scan(&self) -> CacheResult<Scan> {
        let mut scan = Scan {
            reports: Vec::new(),
            corrupt: 0,
        };

        for key in self.store.keys().await? {
            let Some(report_number) = report_number_from_key(&self.config.key_prefix, &key) else {
                continue;
            };
            // Removed between listing and reading
            let Some(bytes) = self.store.get(&key).await? else {
                continue;
            };
            match decode_summary(&bytes) {
                Ok(summary) if summary.report_number == report_number => {
                    scan.reports.push(summary)
                }
                Ok(summary) => {
                    tracing::warn!(
                        key = %key,
                        stored_report_number = %summary.report_number,
                        "Skipping cached report stored under a different key"
                    );
                    scan.corrupt += 1;
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Skipping corrupt cached report");
                    scan.corrupt += 1;
                }
            }
        }

        Ok(scan)
    }

    async fn warn_on_usage(&self) {
        let stats = match self.stats().await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::debug!(error = %e, "Could not compute cache usage after store");
                return;
            }
        };

        if stats.is_over_capacity() {
            tracing::warn!(
                total_size = %format_bytes(stats.total_size),
                max_size = %format_bytes(stats.max_size),
                usage_percent = stats.usage_percent_display(),
                "Local report cache exceeds its size cap; delete old reports"
            );
        } else if stats.is_near_capacity(self.config.warn_threshold) {
            tracing::warn!(
                total_size = %format_bytes(stats.total_size),
                max_size = %format_bytes(stats.max_size),
                usage_percent = stats.usage_percent_display(),
                "Local report cache is nearly full"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medvault_storage::MemoryStore;

    fn cache_with(store: MemoryStore, max_size: u64) -> ReportCache {
        ReportCache::new(
            Arc::new(store),
            ReportCacheConfig {
                max_size,
                ..ReportCacheConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_store_writes_under_prefixed_key() {
        let store = MemoryStore::new();
        let cache = cache_with(store.clone(), 1024);

        cache.store("RPT-7", "Ann", b"pdf".to_vec()).await.unwrap();

        assert_eq!(store.keys().await.unwrap(), vec!["medvault:report:RPT-7"]);
    }

    #[tokio::test]
    async fn test_get_treats_corrupt_record_as_missing() {
        let store = MemoryStore::new();
        let cache = cache_with(store.clone(), 1024);

        store
            .set("medvault:report:BAD", b"{\"version\":1".to_vec())
            .await
            .unwrap();

        assert!(cache.get("BAD").await.unwrap().is_none());
        assert!(!cache.contains("BAD").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_orders_newest_first() {
        let store = MemoryStore::new();
        let cache = cache_with(store.clone(), 1024);

        let older = StoredReport::new(
            "OLD",
            "A",
            b"1".to_vec(),
            Utc::now() - chrono::Duration::days(1),
        );
        store
            .set("medvault:report:OLD", encode_report(&older).unwrap())
            .await
            .unwrap();
        cache.store("NEW", "B", b"2".to_vec()).await.unwrap();

        let numbers: Vec<String> = cache
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.report_number)
            .collect();
        assert_eq!(numbers, vec!["NEW", "OLD"]);
    }

    #[tokio::test]
    async fn test_config_from_cache_config() {
        let config = CacheConfig {
            max_size_bytes: 10,
            warn_threshold: 0.5,
            key_prefix: "r/".to_string(),
            ..CacheConfig::default()
        };
        let cache_config = ReportCacheConfig::from(&config);
        assert_eq!(cache_config.max_size, 10);
        assert_eq!(cache_config.warn_threshold, 0.5);
        assert_eq!(cache_config.key_prefix, "r/");
    }
}
