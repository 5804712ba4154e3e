//! Reporter serializing verdicts to a JSON result file.
//!
//! The output format is the one the JSON cache backend reads back, so
//! finished runs feed later runs directly:
//!
//! ```json
//! {
//!   "cylinder-periodic-direction": [
//!     { "surface": { "type": "Ngon", "angles": [1, 1, 1] }, "result": true, "lot": 7 }
//!   ]
//! }
//! ```

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::command::Command;
use crate::error::PipelineError;
use crate::pipeline::Verdict;
use crate::reporting::reporter::{Fields, Reporter};
use crate::surfaces::SurfaceRef;

/// Accumulates verdicts in memory and writes them out once at `flush`.
///
/// Diagnostic messages and progress ticks are not serialized; only terminal
/// verdicts make it into the result file.
pub struct JsonReporter {
    dir: PathBuf,
    surface: SurfaceRef,
    results: Mutex<serde_json::Map<String, Value>>,
}

impl JsonReporter {
    /// Creates a reporter writing to `<dir>/<surface basename>.json`.
    pub fn new(dir: impl Into<PathBuf>, surface: SurfaceRef) -> Self {
        Self {
            dir: dir.into(),
            surface,
            results: Mutex::new(serde_json::Map::new()),
        }
    }

    /// The file this reporter will write at flush time.
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.surface.basename()))
    }
}

impl Command for JsonReporter {
    fn command(&self) -> Vec<String> {
        let mut command = vec!["json".to_string()];
        if self.dir != PathBuf::from(".") {
            command.push("--dir".to_string());
            command.push(self.dir.display().to_string());
        }
        command
    }
}

#[async_trait]
impl Reporter for JsonReporter {
    fn name(&self) -> &'static str {
        "json"
    }

    async fn log(&self, _source: &str, _message: &str) -> Result<(), PipelineError> {
        Ok(())
    }

    async fn result(
        &self,
        source: &str,
        verdict: Verdict,
        fields: Fields,
    ) -> Result<(), PipelineError> {
        let mut entry = serde_json::Map::new();
        entry.insert("surface".to_string(), self.surface.descriptor());
        entry.insert("result".to_string(), serde_json::json!(verdict.as_bool()));
        for (key, value) in fields {
            entry.insert(key, value);
        }

        let mut results = self.results.lock().expect("results poisoned");
        results
            .entry(source.to_string())
            .or_insert_with(|| Value::Array(Vec::new()))
            .as_array_mut()
            .expect("result entries are arrays")
            .push(Value::Object(entry));
        Ok(())
    }

    async fn progress(
        &self,
        _source: &str,
        _count: u64,
        _what: &str,
        _total: Option<u64>,
    ) -> Result<(), PipelineError> {
        Ok(())
    }

    async fn flush(&self) -> Result<(), PipelineError> {
        let results = self.results.lock().expect("results poisoned").clone();
        std::fs::create_dir_all(&self.dir)?;
        let data = serde_json::to_vec_pretty(&Value::Object(results))
            .map_err(|e| PipelineError::Cache(e.to_string()))?;
        std::fs::write(self.path(), data)?;
        Ok(())
    }
}
