//! A single cached result from a prior run.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pipeline::Verdict;

/// One historic verdict, as stored by a prior run.
///
/// Records are immutable: they are created by prior runs and never mutated
/// in place by the current one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Name of the goal that produced this record.
    #[serde(default)]
    pub job: String,
    /// Descriptor of the surface the record is about.
    pub surface: Value,
    /// The verdict; `null` means the run ended undetermined.
    pub result: Option<bool>,
    /// Additional opaque fields attached by the producing run (lot number,
    /// counters, timings).
    #[serde(flatten)]
    pub fields: serde_json::Map<String, Value>,
}

impl CacheRecord {
    /// The verdict this record carries.
    pub fn verdict(&self) -> Verdict {
        Verdict::from(self.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_record() {
        let record: CacheRecord = serde_json::from_str(
            r#"{"surface": {"type": "Ngon", "angles": [1, 1, 1]}, "result": true}"#,
        )
        .expect("record parses");
        assert_eq!(record.verdict(), Verdict::True);
        assert!(record.fields.is_empty());
    }

    #[test]
    fn null_result_is_unknown() {
        let record: CacheRecord = serde_json::from_str(
            r#"{"surface": {"type": "Ngon", "angles": [1, 2, 3]}, "result": null, "lot": 7}"#,
        )
        .expect("record parses");
        assert_eq!(record.verdict(), Verdict::Unknown);
        assert_eq!(record.fields["lot"], 7);
    }
}
