pub mod config;
pub mod error;
pub mod prompt_pool;
pub mod prompts;
pub mod run;

pub use config::{BenchConfig, OllamaConfig, OutputConfig, RunnerConfig};
pub use error::{BenchError, Result};
pub use prompt_pool::PromptPool;
pub use run::{aggregate, BenchmarkRun, RunState, RunStatus, TaskResult};
