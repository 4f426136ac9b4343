use ollabench_benchmark::HistoryEntry;
use ollabench_core::BenchmarkRun;

const PROMPT_WIDTH: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Fast,
    Moderate,
    Slow,
}

impl Tier {
    pub fn label(&self) -> &'static str {
        match self {
            Tier::Fast => "fast",
            Tier::Moderate => "moderate",
            Tier::Slow => "slow",
        }
    }

    /// Tasks per second.
    pub fn for_throughput(throughput: f64) -> Self {
        match throughput {
            t if t > 5.0 => Tier::Fast,
            t if t > 2.0 => Tier::Moderate,
            _ => Tier::Slow,
        }
    }

    pub fn for_tokens_per_sec(tps: f64) -> Self {
        match tps {
            t if t > 60.0 => Tier::Fast,
            t if t > 30.0 => Tier::Moderate,
            _ => Tier::Slow,
        }
    }
}

pub fn truncate_prompt(prompt: &str) -> String {
    if prompt.chars().count() <= PROMPT_WIDTH {
        return prompt.to_string();
    }
    let head: String = prompt.chars().take(PROMPT_WIDTH - 3).collect();
    format!("{}...", head)
}

pub fn summary_table(run: &BenchmarkRun) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  {:<28} {:>7} {:>7} {:>12} {:>22}\n",
        "Model", "Tasks", "Failed", "Total Time", "Throughput (tasks/s)"
    ));
    out.push_str(&format!("{:-<82}\n", ""));
    out.push_str(&format!(
        "  {:<28} {:>7} {:>7} {:>11.2}s {:>13.2} ({})\n",
        run.model,
        run.task_count,
        run.failed_count,
        run.total_time_secs,
        run.throughput,
        Tier::for_throughput(run.throughput).label()
    ));
    out
}

/// Per-task rows in completion order, preceded by an AVERAGE row.
pub fn task_table(run: &BenchmarkRun) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  {:<60} {:>12} {:>20} {:>10}\n",
        "Prompt", "Latency (s)", "Tokens/s", "Status"
    ));
    out.push_str(&format!("{:-<108}\n", ""));

    if run.results.is_empty() {
        out.push_str("  (no successful tasks)\n");
        return out;
    }

    out.push_str(&format!(
        "  {:<60} {:>12.4} {:>20.2} {:>10}\n",
        "AVERAGE", run.avg_latency_secs, run.avg_tps, "Aggregate"
    ));

    for r in &run.results {
        let tps = format!(
            "{:.2} ({})",
            r.tokens_per_sec,
            Tier::for_tokens_per_sec(r.tokens_per_sec).label()
        );
        out.push_str(&format!(
            "  {:<60} {:>12.4} {:>20} {:>10}\n",
            truncate_prompt(&r.prompt),
            r.latency_secs,
            tps,
            "Success"
        ));
    }

    out
}

pub fn csv(run: &BenchmarkRun) -> String {
    let mut out = String::from("prompt,latency_secs,eval_count,eval_duration_secs,tokens_per_sec\n");
    for r in &run.results {
        out.push_str(&format!(
            "{},{:.4},{},{:.4},{:.2}\n",
            csv_field(&r.prompt),
            r.latency_secs,
            r.eval_count,
            r.eval_duration_secs,
            r.tokens_per_sec
        ));
    }
    out
}

fn csv_field(value: &str) -> String {
    match value.contains([',', '"', '\n']) {
        true => format!("\"{}\"", value.replace('"', "\"\"")),
        false => value.to_string(),
    }
}

pub fn history_table(entries: &[HistoryEntry]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  {:<4} {:<28} {:>7} {:>12} {:>14} {:>12}\n",
        "#", "Model", "Tasks", "Total Time", "Throughput", "Avg Tok/s"
    ));
    out.push_str(&format!("{:-<84}\n", ""));
    for (i, e) in entries.iter().enumerate() {
        out.push_str(&format!(
            "  {:<4} {:<28} {:>7} {:>11.2}s {:>14.2} {:>12.2}\n",
            i + 1,
            e.run.model,
            e.run.task_count,
            e.run.total_time_secs,
            e.run.throughput,
            e.run.avg_tps
        ));
    }
    out
}
