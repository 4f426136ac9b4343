use std::time::Duration;

use super::{BenchmarkRun, TaskResult};
use crate::{BenchError, Result};

/// Reduce the successful results of a run into a [`BenchmarkRun`].
///
/// Throughput is computed over every attempted task, means over successes only.
/// Means are zero when nothing succeeded.
pub fn aggregate(
    model: &str,
    task_count: u32,
    total_wall_time: Duration,
    results: Vec<TaskResult>,
) -> Result<BenchmarkRun> {
    if task_count == 0 {
        return Err(BenchError::Aggregation("task count must be positive".into()));
    }
    if results.len() > task_count as usize {
        return Err(BenchError::Aggregation(format!(
            "{} results for {} attempted tasks",
            results.len(),
            task_count
        )));
    }

    let total_time_secs = total_wall_time.as_secs_f64();
    if total_time_secs <= 0.0 {
        return Err(BenchError::Aggregation("wall time must be positive".into()));
    }

    let throughput = task_count as f64 / total_time_secs;

    let n = results.len() as f64;
    let avg_latency_secs = match results.is_empty() {
        true => 0.0,
        false => results.iter().map(|r| r.latency_secs).sum::<f64>() / n,
    };
    let avg_tps = match results.is_empty() {
        true => 0.0,
        false => results.iter().map(|r| r.tokens_per_sec).sum::<f64>() / n,
    };

    Ok(BenchmarkRun {
        model: model.to_string(),
        task_count,
        failed_count: task_count - results.len() as u32,
        total_time_secs,
        throughput,
        avg_latency_secs,
        avg_tps,
        results,
    })
}
