use ollabench_core::BenchmarkRun;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Notifications from a run to its observer. Every run ends with exactly one
/// of `Done`, `Cancelled` or `Error`, after which the channel closes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BenchmarkEvent {
    Progress { percentage: u8, message: String },
    TaskFailed { prompt: String, message: String },
    Done { run: BenchmarkRun },
    Cancelled { completed: u32 },
    Error { message: String },
}

impl BenchmarkEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BenchmarkEvent::Done { .. } | BenchmarkEvent::Cancelled { .. } | BenchmarkEvent::Error { .. }
        )
    }
}

/// Sending half of the event channel. A dropped receiver is not an error:
/// the run keeps going without an audience.
///
/// Intermediate events wait for channel capacity only until the run is
/// cancelled, so a stalled observer cannot hold up cancellation.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: mpsc::Sender<BenchmarkEvent>,
    cancel: CancellationToken,
}

impl ProgressReporter {
    pub fn new(tx: mpsc::Sender<BenchmarkEvent>, cancel: CancellationToken) -> Self {
        Self { tx, cancel }
    }

    pub fn channel(
        capacity: usize,
        cancel: CancellationToken,
    ) -> (Self, mpsc::Receiver<BenchmarkEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx, cancel), rx)
    }

    pub async fn progress(&self, percentage: u8, message: impl Into<String>) {
        self.notify(BenchmarkEvent::Progress {
            percentage: percentage.min(100),
            message: message.into(),
        })
        .await;
    }

    pub async fn task_failed(&self, prompt: &str, message: &str) {
        self.notify(BenchmarkEvent::TaskFailed {
            prompt: prompt.to_string(),
            message: message.to_string(),
        })
        .await;
    }

    /// Deliver a terminal event. Waits for capacity even after cancellation.
    pub async fn send(&self, event: BenchmarkEvent) {
        if self.tx.send(event).await.is_err() {
            trace!("Benchmark event receiver dropped");
        }
    }

    async fn notify(&self, event: BenchmarkEvent) {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => trace!("Run cancelled, dropping event"),
            sent = self.tx.send(event) => {
                if sent.is_err() {
                    trace!("Benchmark event receiver dropped");
                }
            }
        }
    }
}
