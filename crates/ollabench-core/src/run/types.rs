use serde::{Deserialize, Serialize};

/// Metrics for one successful generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub prompt: String,
    /// Client-side wall clock, includes network and server queueing
    pub latency_secs: f64,
    /// Server-reported decode time
    pub eval_duration_secs: f64,
    pub eval_count: u64,
    pub tokens_per_sec: f64,
}

impl TaskResult {
    pub fn new(prompt: impl Into<String>, latency_secs: f64, eval_duration_ns: u64, eval_count: u64) -> Self {
        let eval_duration_secs = eval_duration_ns as f64 / 1_000_000_000.0;
        let tokens_per_sec = match eval_duration_secs > 0.0 {
            true => eval_count as f64 / eval_duration_secs,
            false => 0.0,
        };

        Self {
            prompt: prompt.into(),
            latency_secs,
            eval_duration_secs,
            eval_count,
            tokens_per_sec,
        }
    }
}

/// Summary of a finished run plus the raw per-task results in completion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRun {
    pub model: String,
    pub task_count: u32,
    pub failed_count: u32,
    pub total_time_secs: f64,
    /// Attempted tasks per second of wall time
    pub throughput: f64,
    pub avg_latency_secs: f64,
    pub avg_tps: f64,
    pub results: Vec<TaskResult>,
}

impl BenchmarkRun {
    pub fn succeeded_count(&self) -> u32 {
        self.results.len() as u32
    }
}
