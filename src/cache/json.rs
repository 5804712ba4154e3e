//! # JSON-file cache backend.
//!
//! Reads result files produced by prior runs. The file format maps job
//! names to record arrays:
//!
//! ```json
//! {
//!   "cylinder-periodic-direction": [
//!     { "surface": { "type": "Ngon", "angles": [1, 1, 1] }, "result": true }
//!   ]
//! }
//! ```
//!
//! All files are loaded at construction; queries afterwards are in-memory
//! and lock-free, so arbitrarily many goals and workers may consult the
//! same cache concurrently.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::{Cache, CacheRecord, RecordPredicate};
use crate::error::PipelineError;

/// In-memory view of one or more JSON result files.
pub struct JsonCache {
    records: HashMap<String, Vec<CacheRecord>>,
    /// Fields substituted into records that lack them, scoped to queries
    /// against this cache instance.
    defaults: serde_json::Map<String, Value>,
}

impl JsonCache {
    /// Creates an empty cache; useful as a base for [`JsonCache::load`].
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            defaults: serde_json::Map::new(),
        }
    }

    /// Loads and merges one result file into the cache.
    pub fn load(&mut self, path: &Path) -> Result<(), PipelineError> {
        let file = std::fs::File::open(path)?;
        self.load_reader(file)
    }

    /// Loads and merges result data from any reader.
    pub fn load_reader<R: Read>(&mut self, reader: R) -> Result<(), PipelineError> {
        let data: HashMap<String, Vec<CacheRecord>> = serde_json::from_reader(reader)
            .map_err(|e| PipelineError::Cache(e.to_string()))?;
        for (job, mut records) in data {
            for record in &mut records {
                record.job = job.clone();
            }
            self.records.entry(job).or_default().extend(records);
        }
        Ok(())
    }

    /// Opens a cache over the given result files.
    pub fn open<P: AsRef<Path>>(paths: &[P]) -> Result<Self, PipelineError> {
        let mut cache = Self::new();
        for path in paths {
            cache.load(path.as_ref())?;
        }
        Ok(cache)
    }

    /// Sets fields substituted into records that do not carry them.
    ///
    /// Prior runs did not always store every field; defaults let newer
    /// goals read older records without special-casing their absence.
    pub fn with_defaults(mut self, defaults: serde_json::Map<String, Value>) -> Self {
        self.defaults = defaults;
        self
    }

    fn apply_defaults(&self, mut record: CacheRecord) -> CacheRecord {
        for (key, value) in &self.defaults {
            record
                .fields
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        record
    }
}

impl Default for JsonCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for JsonCache {
    async fn results(
        &self,
        job: &str,
        predicate: RecordPredicate<'_>,
    ) -> Result<Vec<CacheRecord>, PipelineError> {
        Ok(self
            .records
            .get(job)
            .into_iter()
            .flatten()
            .filter(|record| predicate(record))
            .map(|record| self.apply_defaults(record.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Verdict;

    const DATA: &str = r#"{
        "cylinder-periodic-direction": [
            { "surface": { "type": "Ngon", "angles": [1, 1, 1] }, "result": null },
            { "surface": { "type": "Ngon", "angles": [1, 1, 1] }, "result": true },
            { "surface": { "type": "Ngon", "angles": [1, 2, 2] }, "result": false }
        ]
    }"#;

    fn cache() -> JsonCache {
        let mut cache = JsonCache::new();
        cache.load_reader(DATA.as_bytes()).expect("data parses");
        cache
    }

    #[tokio::test]
    async fn filters_by_job_and_predicate() {
        let cache = cache();
        let records = cache
            .results("cylinder-periodic-direction", &|r| {
                r.surface["angles"] == serde_json::json!([1, 1, 1])
            })
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].verdict(), Verdict::Unknown);
        assert_eq!(records[1].verdict(), Verdict::True);

        let none = cache
            .results("no-such-job", &|_| true)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn records_carry_their_job_name() {
        let cache = cache();
        let records = cache
            .results("cylinder-periodic-direction", &|_| true)
            .await
            .unwrap();
        assert!(records
            .iter()
            .all(|r| r.job == "cylinder-periodic-direction"));
    }

    #[tokio::test]
    async fn defaults_fill_missing_fields_only() {
        let mut defaults = serde_json::Map::new();
        defaults.insert("lot".to_string(), serde_json::json!(0));
        let cache = cache().with_defaults(defaults);

        let records = cache
            .results("cylinder-periodic-direction", &|_| true)
            .await
            .unwrap();
        assert!(records.iter().all(|r| r.fields["lot"] == 0));
    }

    #[test]
    fn malformed_data_is_a_cache_error() {
        let mut cache = JsonCache::new();
        let err = cache.load_reader("not json".as_bytes()).unwrap_err();
        assert_eq!(err.as_label(), "pipeline_cache");
    }
}
