use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use ollabench_core::{
    aggregate, BenchConfig, BenchError, BenchmarkRun, PromptPool, Result, RunState, RunStatus,
    RunnerConfig,
};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{Id, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::client::InferenceClient;
use crate::ollama::OllamaClient;
use crate::progress::{BenchmarkEvent, ProgressReporter};

/// Concurrent benchmark runner. Holds at most one active run at a time.
pub struct BenchmarkRunner {
    ctx: RunContext,
    active: Arc<AtomicBool>,
}

#[derive(Clone)]
struct RunContext {
    client: Arc<dyn InferenceClient>,
    pool: Arc<PromptPool>,
    config: RunnerConfig,
    state: Arc<Mutex<RunState>>,
}

enum TaskOutcome {
    Succeeded(ollabench_core::TaskResult),
    Failed { prompt: String, message: String },
    /// Never reached the client because the run was cancelled
    Skipped,
}

/// Observer side of a run started with [`BenchmarkRunner::start`].
pub struct RunHandle {
    events: mpsc::Receiver<BenchmarkEvent>,
    cancel: CancellationToken,
    task: JoinHandle<RunStatus>,
}

/// Clears the runner's active flag when the run ends, however it ends.
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl BenchmarkRunner {
    pub fn new(
        client: Arc<dyn InferenceClient>,
        pool: PromptPool,
        config: RunnerConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            ctx: RunContext {
                client,
                pool: Arc::new(pool),
                config,
                state: Arc::new(Mutex::new(RunState::new())),
            },
            active: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Runner backed by the Ollama HTTP client described by `config`.
    pub fn ollama(config: &BenchConfig, pool: PromptPool) -> Result<Self> {
        let client = OllamaClient::from_config(&config.ollama)?;
        Self::new(Arc::new(client), pool, config.runner.clone())
    }

    pub fn pool(&self) -> &PromptPool {
        &self.ctx.pool
    }

    pub fn state(&self) -> RunState {
        self.ctx.snapshot()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Validate and launch a run on its own task. Must be called from within a
    /// Tokio runtime.
    pub fn start(&self, model: &str, task_count: usize) -> Result<RunHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| BenchError::Config(format!("benchmark requires a Tokio runtime: {}", e)))?;

        let guard = self.begin(model, task_count)?;
        let cancel = CancellationToken::new();
        let (reporter, events) =
            ProgressReporter::channel(self.ctx.config.event_buffer, cancel.clone());

        let ctx = self.ctx.clone();
        let model = model.to_string();
        let run_cancel = cancel.clone();
        let task = runtime.spawn(async move {
            ctx.execute(guard, &model, task_count as u32, &run_cancel, reporter)
                .await
        });

        Ok(RunHandle {
            events,
            cancel,
            task,
        })
    }

    /// Run to completion on the caller's task, streaming events into `tx`.
    ///
    /// Validation failures are returned before any event is sent.
    pub async fn run_streaming(
        &self,
        model: &str,
        task_count: usize,
        cancel: CancellationToken,
        tx: mpsc::Sender<BenchmarkEvent>,
    ) -> Result<RunStatus> {
        let guard = self.begin(model, task_count)?;
        let reporter = ProgressReporter::new(tx, cancel.clone());
        let status = self
            .ctx
            .execute(guard, model, task_count as u32, &cancel, reporter)
            .await;
        Ok(status)
    }

    fn begin(&self, model: &str, task_count: usize) -> Result<ActiveGuard> {
        if model.trim().is_empty() {
            return Err(BenchError::EmptyModel);
        }

        let max = self.ctx.config.max_tasks;
        if task_count == 0 || task_count > max {
            return Err(BenchError::InvalidTaskCount {
                requested: task_count,
                max,
            });
        }

        if task_count > self.ctx.pool.len() {
            return Err(BenchError::InsufficientPool {
                requested: task_count,
                available: self.ctx.pool.len(),
            });
        }

        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(BenchError::RunAlreadyActive);
        }

        self.ctx.lock_state().begin(task_count as u32);
        Ok(ActiveGuard(self.active.clone()))
    }
}

impl RunContext {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn snapshot(&self) -> RunState {
        self.lock_state().clone()
    }

    fn set_status(&self, status: RunStatus) {
        debug!("Run status -> {}", status.label());
        self.lock_state().transition(status);
    }

    /// Returns (completed, percentage).
    fn record_completion(&self) -> (u32, u8) {
        let mut state = self.lock_state();
        let completed = state.record_completion();
        (completed, state.percentage())
    }

    #[instrument(skip_all, fields(model = %model, tasks = task_count))]
    async fn execute(
        &self,
        guard: ActiveGuard,
        model: &str,
        task_count: u32,
        cancel: &CancellationToken,
        reporter: ProgressReporter,
    ) -> RunStatus {
        info!("Starting benchmark");

        let outcome = self.drive(model, task_count, cancel, &reporter).await;

        let (status, event) = match outcome {
            Ok(run) => {
                info!(
                    throughput = run.throughput,
                    avg_latency_secs = run.avg_latency_secs,
                    avg_tps = run.avg_tps,
                    failed = run.failed_count,
                    "Benchmark complete"
                );
                (RunStatus::Completed, BenchmarkEvent::Done { run })
            }
            Err(BenchError::Cancelled) => {
                let completed = self.snapshot().completed_count;
                info!(completed, "Benchmark cancelled");
                (RunStatus::Cancelled, BenchmarkEvent::Cancelled { completed })
            }
            Err(e) => {
                error!("Benchmark failed: {}", e);
                (
                    RunStatus::Failed,
                    BenchmarkEvent::Error {
                        message: e.to_string(),
                    },
                )
            }
        };

        // Active flag must be clear before the terminal event goes out.
        self.set_status(status);
        drop(guard);
        reporter.send(event).await;
        status
    }

    async fn drive(
        &self,
        model: &str,
        task_count: u32,
        cancel: &CancellationToken,
        reporter: &ProgressReporter,
    ) -> Result<BenchmarkRun> {
        self.warm_up(model, cancel, reporter).await?;

        if cancel.is_cancelled() {
            return Err(BenchError::Cancelled);
        }
        self.set_status(RunStatus::Preparing);
        reporter
            .progress(0, format!("Preparing {} tasks...", task_count))
            .await;
        let prompts = self.pool.sample(task_count as usize)?;

        if cancel.is_cancelled() {
            return Err(BenchError::Cancelled);
        }
        self.set_status(RunStatus::Running);
        let started = Instant::now();

        let (mut tasks, mut task_prompts) = self.dispatch(model, prompts, cancel);
        let mut results = Vec::with_capacity(task_count as usize);

        loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    return Err(BenchError::Cancelled);
                }
                joined = tasks.join_next() => joined,
            };

            let Some(joined) = joined else { break };

            let outcome = joined.unwrap_or_else(|e| TaskOutcome::Failed {
                prompt: task_prompts.remove(&e.id()).unwrap_or_default(),
                message: format!("task did not complete: {}", e),
            });

            match outcome {
                TaskOutcome::Skipped => continue,
                TaskOutcome::Succeeded(result) => {
                    debug!(
                        latency_secs = result.latency_secs,
                        tokens_per_sec = result.tokens_per_sec,
                        "Task complete"
                    );
                    results.push(result);
                }
                TaskOutcome::Failed { prompt, message } => {
                    warn!("Task failed: {}", message);
                    reporter.task_failed(&prompt, &message).await;
                }
            }

            let (completed, percentage) = self.record_completion();
            reporter
                .progress(
                    percentage,
                    format!("Completed {}/{} tasks", completed, task_count),
                )
                .await;
        }

        let total_wall_time = started.elapsed();
        if cancel.is_cancelled() {
            return Err(BenchError::Cancelled);
        }

        aggregate(model, task_count, total_wall_time, results)
    }

    async fn warm_up(
        &self,
        model: &str,
        cancel: &CancellationToken,
        reporter: &ProgressReporter,
    ) -> Result<()> {
        let total = self.config.warmup_runs;

        for i in 0..total {
            if cancel.is_cancelled() {
                return Err(BenchError::Cancelled);
            }

            debug!("Warmup run {}/{}", i + 1, total);
            reporter
                .progress(0, format!("Warming up model ({}/{})...", i + 1, total))
                .await;

            if let Err(e) = self
                .client
                .execute(model, &self.config.warmup_prompt, cancel)
                .await
            {
                if !matches!(e, BenchError::Cancelled) {
                    warn!("Warm-up request failed: {}", e);
                }
                return Err(e);
            }
        }

        Ok(())
    }

    /// Spawn one unit of work per prompt, gated by the concurrency ceiling.
    /// Also returns each task's prompt keyed by task id, for tasks that panic.
    fn dispatch(
        &self,
        model: &str,
        prompts: Vec<String>,
        cancel: &CancellationToken,
    ) -> (JoinSet<TaskOutcome>, HashMap<Id, String>) {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut tasks = JoinSet::new();
        let mut task_prompts = HashMap::with_capacity(prompts.len());

        for prompt in prompts {
            let client = self.client.clone();
            let semaphore = semaphore.clone();
            let cancel = cancel.clone();
            let model = model.to_string();
            let label = prompt.clone();

            let handle = tasks.spawn(async move {
                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return TaskOutcome::Skipped,
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return TaskOutcome::Skipped,
                    },
                };

                let outcome = match client.execute(&model, &prompt, &cancel).await {
                    Ok(result) => TaskOutcome::Succeeded(result),
                    Err(BenchError::Cancelled) if cancel.is_cancelled() => TaskOutcome::Skipped,
                    Err(e) => TaskOutcome::Failed {
                        prompt,
                        message: e.to_string(),
                    },
                };

                drop(permit);
                outcome
            });
            task_prompts.insert(handle.id(), label);
        }

        (tasks, task_prompts)
    }
}

impl RunHandle {
    /// Next event; `None` once the run has finished and every event was read.
    pub async fn recv(&mut self) -> Option<BenchmarkEvent> {
        self.events.recv().await
    }

    pub fn cancel(&self) {
        info!("Cancelling benchmark");
        self.cancel.cancel();
    }

    /// Wait for the run task to exit. Unread events are discarded.
    pub async fn wait(self) -> RunStatus {
        let RunHandle { events, task, .. } = self;
        // Closing the receiver unblocks a run stuck on a full channel.
        drop(events);

        match task.await {
            Ok(status) => status,
            Err(e) => {
                error!("Benchmark task panicked: {}", e);
                RunStatus::Failed
            }
        }
    }

    /// Read every remaining event, then wait for the run task.
    pub async fn collect(mut self) -> (Vec<BenchmarkEvent>, RunStatus) {
        let mut events = Vec::new();
        while let Some(event) = self.recv().await {
            events.push(event);
        }
        let status = self.wait().await;
        (events, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ollabench_core::TaskResult;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    const WARMUP: &str = "warm up";

    /// Succeeds instantly unless the prompt is listed in `fail_on` or is `panic_on`.
    #[derive(Default)]
    struct ScriptedClient {
        fail_on: HashSet<String>,
        panic_on: Option<String>,
        delays: Vec<(String, Duration)>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn failing(prompts: &[&str]) -> Self {
            Self {
                fail_on: prompts.iter().map(|p| p.to_string()).collect(),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl InferenceClient for ScriptedClient {
        async fn execute(
            &self,
            _model: &str,
            prompt: &str,
            _cancel: &CancellationToken,
        ) -> Result<TaskResult> {
            self.calls.lock().unwrap().push(prompt.to_string());

            if let Some((_, delay)) = self.delays.iter().find(|(p, _)| p == prompt) {
                tokio::time::sleep(*delay).await;
            }
            if self.panic_on.as_deref() == Some(prompt) {
                panic!("client crashed on {}", prompt);
            }
            if self.fail_on.contains(prompt) {
                return Err(BenchError::InferenceRequest("API error 500: simulated".into()));
            }
            Ok(TaskResult::new(prompt, 0.25, 1_000_000_000, 40))
        }
    }

    /// Blocks every call until the test hands out permits on `gate`.
    struct GatedClient {
        gate: Semaphore,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        started: AtomicUsize,
    }

    impl GatedClient {
        fn new() -> Self {
            Self {
                gate: Semaphore::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                started: AtomicUsize::new(0),
            }
        }

        fn in_flight(&self) -> usize {
            self.in_flight.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl InferenceClient for GatedClient {
        async fn execute(
            &self,
            _model: &str,
            prompt: &str,
            cancel: &CancellationToken,
        ) -> Result<TaskResult> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let outcome = tokio::select! {
                _ = cancel.cancelled() => Err(BenchError::Cancelled),
                permit = self.gate.acquire() => {
                    permit.unwrap().forget();
                    Ok(TaskResult::new(prompt, 0.5, 500_000_000, 25))
                }
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            outcome
        }
    }

    fn pool(n: usize) -> PromptPool {
        PromptPool::new((0..n).map(|i| format!("prompt {}", i)))
    }

    fn config(concurrency: usize, warmup_runs: u32) -> RunnerConfig {
        RunnerConfig {
            concurrency,
            warmup_runs,
            warmup_prompt: WARMUP.to_string(),
            ..RunnerConfig::default()
        }
    }

    async fn finish(handle: RunHandle) -> (Vec<BenchmarkEvent>, RunStatus) {
        tokio::time::timeout(Duration::from_secs(10), handle.collect())
            .await
            .expect("run did not finish")
    }

    async fn wait_for_in_flight(client: &GatedClient, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while client.in_flight() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("requests never reached the client");
    }

    fn done_run(events: &[BenchmarkEvent]) -> &BenchmarkRun {
        match events.last() {
            Some(BenchmarkEvent::Done { run }) => run,
            other => panic!("expected Done, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_all_tasks_succeed() {
        let client = Arc::new(ScriptedClient::default());
        let runner = BenchmarkRunner::new(client.clone(), pool(20), config(3, 1)).unwrap();

        let handle = runner.start("llama3", 8).unwrap();
        let (events, status) = finish(handle).await;

        assert_eq!(status, RunStatus::Completed);
        let run = done_run(&events);
        assert_eq!(run.model, "llama3");
        assert_eq!(run.task_count, 8);
        assert_eq!(run.results.len(), 8);
        assert_eq!(run.failed_count, 0);
        assert_eq!(run.throughput, 8.0 / run.total_time_secs);
        assert_eq!(run.avg_tps, 40.0);

        let prompts: HashSet<_> = run.results.iter().map(|r| r.prompt.as_str()).collect();
        assert_eq!(prompts.len(), 8);
        assert!(prompts.iter().all(|p| runner.pool().contains(p)));

        let calls = client.calls();
        assert_eq!(calls[0], WARMUP);
        assert_eq!(calls.len(), 9);
        assert!(!prompts.contains(WARMUP));

        let state = runner.state();
        assert_eq!(state.status, RunStatus::Completed);
        assert_eq!(state.completed_count, 8);
        assert_eq!(state.total_count, 8);
        assert!(!runner.is_active());
    }

    #[tokio::test]
    async fn test_progress_reaches_one_hundred() {
        let client = Arc::new(ScriptedClient::default());
        let runner = BenchmarkRunner::new(client, pool(10), config(2, 1)).unwrap();

        let (events, _) = finish(runner.start("llama3", 4).unwrap()).await;

        let progress: Vec<(u8, String)> = events
            .iter()
            .filter_map(|e| match e {
                BenchmarkEvent::Progress { percentage, message } => {
                    Some((*percentage, message.clone()))
                }
                _ => None,
            })
            .collect();

        assert_eq!(progress[0].1, "Warming up model (1/1)...");
        assert_eq!(progress[1].1, "Preparing 4 tasks...");
        let completions: Vec<u8> = progress[2..].iter().map(|(p, _)| *p).collect();
        assert_eq!(completions, vec![25, 50, 75, 100]);
        assert_eq!(progress.last().unwrap().1, "Completed 4/4 tasks");
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    }

    #[tokio::test]
    async fn test_failed_tasks_are_excluded() {
        let client = Arc::new(ScriptedClient::failing(&["prompt 3", "prompt 7"]));
        let runner = BenchmarkRunner::new(client, pool(10), config(4, 1)).unwrap();

        let (events, status) = finish(runner.start("llama3", 10).unwrap()).await;

        assert_eq!(status, RunStatus::Completed);
        let run = done_run(&events);
        assert_eq!(run.results.len(), 8);
        assert_eq!(run.failed_count, 2);
        assert_eq!(run.throughput, 10.0 / run.total_time_secs);
        assert!(run
            .results
            .iter()
            .all(|r| r.prompt != "prompt 3" && r.prompt != "prompt 7"));

        let mut failed: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                BenchmarkEvent::TaskFailed { prompt, .. } => Some(prompt.as_str()),
                _ => None,
            })
            .collect();
        failed.sort();
        assert_eq!(failed, vec!["prompt 3", "prompt 7"]);
        assert_eq!(runner.state().completed_count, 10);
    }

    #[tokio::test]
    async fn test_all_tasks_fail_still_completes() {
        let names: Vec<String> = (0..3).map(|i| format!("prompt {}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let client = Arc::new(ScriptedClient::failing(&refs));
        let runner = BenchmarkRunner::new(client, pool(3), config(2, 0)).unwrap();

        let (events, status) = finish(runner.start("llama3", 3).unwrap()).await;

        assert_eq!(status, RunStatus::Completed);
        let run = done_run(&events);
        assert!(run.results.is_empty());
        assert_eq!(run.avg_latency_secs, 0.0);
        assert_eq!(run.avg_tps, 0.0);
        assert!(run.throughput > 0.0);
    }

    #[tokio::test]
    async fn test_results_arrive_in_completion_order() {
        let client = Arc::new(ScriptedClient {
            delays: vec![("slow".to_string(), Duration::from_millis(200))],
            ..Default::default()
        });
        let runner =
            BenchmarkRunner::new(client, PromptPool::new(["slow", "fast"]), config(2, 0)).unwrap();

        let (events, _) = finish(runner.start("llama3", 2).unwrap()).await;

        let run = done_run(&events);
        let order: Vec<&str> = run.results.iter().map(|r| r.prompt.as_str()).collect();
        assert_eq!(order, vec!["fast", "slow"]);
    }

    #[tokio::test]
    async fn test_panicked_task_reports_its_prompt() {
        let client = Arc::new(ScriptedClient {
            panic_on: Some("b".to_string()),
            ..Default::default()
        });
        let runner =
            BenchmarkRunner::new(client, PromptPool::new(["a", "b", "c"]), config(2, 0)).unwrap();

        let (events, status) = finish(runner.start("llama3", 3).unwrap()).await;

        assert_eq!(status, RunStatus::Completed);
        let run = done_run(&events);
        assert_eq!(run.results.len(), 2);
        assert_eq!(run.failed_count, 1);
        assert!(run.results.iter().all(|r| r.prompt != "b"));

        let failures: Vec<(&str, &str)> = events
            .iter()
            .filter_map(|e| match e {
                BenchmarkEvent::TaskFailed { prompt, message } => {
                    Some((prompt.as_str(), message.as_str()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "b");
        assert!(failures[0].1.contains("panicked"));
        assert_eq!(runner.state().completed_count, 3);
    }

    #[tokio::test]
    async fn test_wait_without_reading_events() {
        let client = Arc::new(ScriptedClient::default());
        let runner = BenchmarkRunner::new(client, pool(150), config(10, 1)).unwrap();
        assert!(150 > RunnerConfig::default().event_buffer);

        let handle = runner.start("llama3", 150).unwrap();
        let status = tokio::time::timeout(Duration::from_secs(5), handle.wait())
            .await
            .expect("run blocked on an unread event channel");

        assert_eq!(status, RunStatus::Completed);
        assert!(!runner.is_active());
        assert_eq!(runner.state().completed_count, 150);

        let (_, status) = finish(runner.start("llama3", 2).unwrap()).await;
        assert_eq!(status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_cancel_with_stalled_observer() {
        let client = Arc::new(ScriptedClient::default());
        let runner = BenchmarkRunner::new(
            client,
            pool(20),
            RunnerConfig {
                event_buffer: 1,
                ..config(4, 0)
            },
        )
        .unwrap();

        let handle = runner.start("llama3", 20).unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while runner.state().completed_count == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("no task completed");
        tokio::time::sleep(Duration::from_millis(50)).await;

        let stalled = runner.state();
        assert_eq!(stalled.status, RunStatus::Running);
        assert_eq!(stalled.completed_count, 1);

        handle.cancel();
        let (events, status) = finish(handle).await;

        assert_eq!(status, RunStatus::Cancelled);
        assert!(matches!(
            events.last(),
            Some(BenchmarkEvent::Cancelled { completed: 1 })
        ));
        assert!(!runner.is_active());
    }

    #[tokio::test]
    async fn test_cancel_before_dispatch() {
        let client = Arc::new(ScriptedClient::default());
        let runner = BenchmarkRunner::new(client.clone(), pool(10), config(2, 1)).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let (tx, mut rx) = mpsc::channel(16);

        let status = runner
            .run_streaming("llama3", 5, cancel, tx)
            .await
            .unwrap();

        assert_eq!(status, RunStatus::Cancelled);
        let mut events = Vec::new();
        while let Some(e) = rx.recv().await {
            events.push(e);
        }
        assert!(matches!(
            events.as_slice(),
            [BenchmarkEvent::Cancelled { completed: 0 }]
        ));
        assert!(client.calls().is_empty());

        let state = runner.state();
        assert_eq!(state.status, RunStatus::Cancelled);
        assert_eq!(state.completed_count, 0);
    }

    #[tokio::test]
    async fn test_cancel_during_warmup() {
        let client = Arc::new(GatedClient::new());
        let runner = BenchmarkRunner::new(client.clone(), pool(10), config(4, 1)).unwrap();

        let handle = runner.start("llama3", 5).unwrap();
        wait_for_in_flight(&client, 1).await;
        assert_eq!(runner.state().status, RunStatus::WarmingUp);
        handle.cancel();

        let (events, status) = finish(handle).await;

        assert_eq!(status, RunStatus::Cancelled);
        assert!(matches!(
            events.last(),
            Some(BenchmarkEvent::Cancelled { completed: 0 })
        ));
        assert!(!events.iter().any(|e| matches!(e, BenchmarkEvent::Done { .. })));
        assert_eq!(client.started.load(Ordering::SeqCst), 1);
        assert_eq!(runner.state().completed_count, 0);
    }

    #[tokio::test]
    async fn test_cancel_mid_run_skips_unstarted_work() {
        let client = Arc::new(GatedClient::new());
        let runner = BenchmarkRunner::new(client.clone(), pool(10), config(2, 0)).unwrap();

        let handle = runner.start("llama3", 6).unwrap();
        wait_for_in_flight(&client, 2).await;
        handle.cancel();

        let (events, status) = finish(handle).await;

        assert_eq!(status, RunStatus::Cancelled);
        assert!(matches!(events.last(), Some(BenchmarkEvent::Cancelled { .. })));
        assert!(!events.iter().any(|e| matches!(e, BenchmarkEvent::Done { .. })));
        assert_eq!(client.started.load(Ordering::SeqCst), 2);
        assert_eq!(runner.state().status, RunStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_concurrency_ceiling_respected() {
        let client = Arc::new(GatedClient::new());
        let runner = BenchmarkRunner::new(client.clone(), pool(20), config(3, 0)).unwrap();

        let handle = runner.start("llama3", 12).unwrap();
        wait_for_in_flight(&client, 3).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(client.in_flight(), 3);

        client.gate.add_permits(12);
        let (events, status) = finish(handle).await;

        assert_eq!(status, RunStatus::Completed);
        assert_eq!(done_run(&events).results.len(), 12);
        assert_eq!(client.max_in_flight.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_second_start_rejected_while_active() {
        let client = Arc::new(GatedClient::new());
        let runner = BenchmarkRunner::new(client.clone(), pool(10), config(2, 0)).unwrap();

        let first = runner.start("llama3", 2).unwrap();
        wait_for_in_flight(&client, 2).await;

        let err = runner.start("qwen2", 3).err().expect("second start must fail");
        assert!(matches!(err, BenchError::RunAlreadyActive));
        assert_eq!(runner.state().total_count, 2);
        assert_eq!(runner.state().status, RunStatus::Running);

        first.cancel();
        let (_, status) = finish(first).await;
        assert_eq!(status, RunStatus::Cancelled);
        assert!(!runner.is_active());

        client.gate.add_permits(3);
        let (events, status) = finish(runner.start("qwen2", 3).unwrap()).await;
        assert_eq!(status, RunStatus::Completed);
        assert_eq!(done_run(&events).model, "qwen2");
    }

    #[tokio::test]
    async fn test_start_validation() {
        let client = Arc::new(ScriptedClient::default());
        let runner = BenchmarkRunner::new(
            client,
            pool(5),
            RunnerConfig {
                max_tasks: 4,
                ..config(2, 0)
            },
        )
        .unwrap();

        assert!(matches!(
            runner.start("llama3", 0).err(),
            Some(BenchError::InvalidTaskCount { requested: 0, max: 4 })
        ));
        assert!(matches!(
            runner.start("llama3", 5).err(),
            Some(BenchError::InvalidTaskCount { requested: 5, max: 4 })
        ));
        assert!(matches!(runner.start("", 2).err(), Some(BenchError::EmptyModel)));
        assert_eq!(runner.state().status, RunStatus::Idle);
        assert!(!runner.is_active());

        let small = BenchmarkRunner::new(
            Arc::new(ScriptedClient::default()),
            pool(3),
            config(2, 0),
        )
        .unwrap();
        assert!(matches!(
            small.start("llama3", 4).err(),
            Some(BenchError::InsufficientPool {
                requested: 4,
                available: 3
            })
        ));
    }

    #[tokio::test]
    async fn test_warmup_failure_fails_run() {
        let client = Arc::new(ScriptedClient::failing(&[WARMUP]));
        let runner = BenchmarkRunner::new(client.clone(), pool(5), config(2, 1)).unwrap();

        let (events, status) = finish(runner.start("llama3", 3).unwrap()).await;

        assert_eq!(status, RunStatus::Failed);
        assert!(matches!(events.last(), Some(BenchmarkEvent::Error { .. })));
        assert_eq!(client.calls(), vec![WARMUP]);
        assert_eq!(runner.state().status, RunStatus::Failed);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let result = BenchmarkRunner::new(
            Arc::new(ScriptedClient::default()),
            pool(3),
            config(0, 0),
        );
        assert!(matches!(result.err(), Some(BenchError::Config(_))));
    }
}
