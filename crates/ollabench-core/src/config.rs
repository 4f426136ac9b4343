use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{BenchError, Result};

pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_WARMUP_PROMPT: &str = "Reply with the single word: ready";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchConfig {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub host: String,
    pub request_timeout_secs: u64,
    pub list_timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_OLLAMA_HOST.to_string(),
            request_timeout_secs: 60,
            list_timeout_secs: 5,
        }
    }
}

impl OllamaConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }
}

/// Knobs for a single benchmark run. All of them are static for the run's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Ceiling on in-flight inference requests
    pub concurrency: usize,
    pub warmup_runs: u32,
    pub warmup_prompt: String,
    /// Upper bound accepted by `start`, independent of the pool size
    pub max_tasks: usize,
    /// Capacity of the progress event channel
    pub event_buffer: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            warmup_runs: 1,
            warmup_prompt: DEFAULT_WARMUP_PROMPT.to_string(),
            max_tasks: 200,
            event_buffer: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub results_dir: String,
    pub save_on_exit: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: ".".to_string(),
            save_on_exit: true,
        }
    }
}

impl BenchConfig {
    /// Parse a TOML file, falling back to defaults for missing sections. Not validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| BenchError::Config(format!("{}: {}", path.display(), e)))
    }

    /// File (or defaults), then `OLLAMA_HOST`, then `host_override`. Validated once, last.
    pub fn load(path: Option<&Path>, host_override: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env();
        if let Some(host) = host_override {
            config.ollama.host = normalize_host(host);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            if !host.trim().is_empty() {
                tracing::debug!("Using OLLAMA_HOST from environment: {}", host);
                self.ollama.host = normalize_host(&host);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ollama.host.trim().is_empty() {
            return Err(BenchError::Config("ollama.host must not be empty".into()));
        }
        if self.ollama.request_timeout_secs == 0 {
            return Err(BenchError::Config(
                "ollama.request_timeout_secs must be positive".into(),
            ));
        }
        self.runner.validate()
    }
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(BenchError::Config("runner.concurrency must be at least 1".into()));
        }
        if self.max_tasks == 0 {
            return Err(BenchError::Config("runner.max_tasks must be at least 1".into()));
        }
        if self.event_buffer == 0 {
            return Err(BenchError::Config("runner.event_buffer must be at least 1".into()));
        }
        Ok(())
    }
}

/// Ollama accepts `OLLAMA_HOST=127.0.0.1:11434` without a scheme; reqwest does not.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    match host.starts_with("http://") || host.starts_with("https://") {
        true => host.to_string(),
        false => format!("http://{}", host),
    }
}
