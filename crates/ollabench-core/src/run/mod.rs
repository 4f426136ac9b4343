mod aggregate;
mod state;
mod types;

pub use aggregate::aggregate;
pub use state::{RunState, RunStatus};
pub use types::{BenchmarkRun, TaskResult};
