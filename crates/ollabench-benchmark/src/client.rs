use async_trait::async_trait;
use ollabench_core::{Result, TaskResult};
use tokio_util::sync::CancellationToken;

/// A single-shot generation request against an inference endpoint.
///
/// Implementations must not retry. When `cancel` fires they should abandon the
/// request and return `BenchError::Cancelled`.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn execute(
        &self,
        model: &str,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<TaskResult>;
}
