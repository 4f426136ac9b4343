pub mod client;
pub mod history;
pub mod ollama;
pub mod progress;
pub mod runner;

pub use client::InferenceClient;
pub use history::{HistoryEntry, SessionHistory};
pub use ollama::OllamaClient;
pub use progress::{BenchmarkEvent, ProgressReporter};
pub use runner::{BenchmarkRunner, RunHandle};
