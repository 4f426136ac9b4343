use std::path::{Path, PathBuf};

use ollabench_core::{BenchmarkRun, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

const FILE_PREFIX: &str = "ollama_concurrency_benchmark";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    /// Unix seconds at which the run finished
    pub timestamp: i64,
    #[serde(flatten)]
    pub run: BenchmarkRun,
}

/// Completed runs of the current session, in completion order.
#[derive(Debug, Default)]
pub struct SessionHistory {
    entries: Vec<HistoryEntry>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, run: BenchmarkRun) -> &HistoryEntry {
        let entry = HistoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().timestamp(),
            run,
        };
        info!("Recorded benchmark result: {}", entry.id);
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write all entries to a timestamped JSON file under `dir`.
    ///
    /// Returns `None` without touching the filesystem when there is nothing to save.
    pub fn save_to(&self, dir: &Path) -> Result<Option<PathBuf>> {
        if self.entries.is_empty() {
            return Ok(None);
        }

        std::fs::create_dir_all(dir)?;
        let path = dir.join(file_name(chrono::Local::now()));
        write_json(&path, &self.entries)?;

        info!("Saved {} benchmark result(s) to {}", self.entries.len(), path.display());
        Ok(Some(path))
    }

    pub fn load(path: &Path) -> Result<Vec<HistoryEntry>> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

pub fn file_name<Tz: chrono::TimeZone>(at: chrono::DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}_{}.json", FILE_PREFIX, at.format("%Y%m%d-%H%M%S"))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}
