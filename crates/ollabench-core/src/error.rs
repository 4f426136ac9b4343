use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Requested {requested} prompts but the pool only holds {available}")]
    InsufficientPool { requested: usize, available: usize },

    #[error("Inference request failed: {0}")]
    InferenceRequest(String),

    #[error("A benchmark run is already active")]
    RunAlreadyActive,

    #[error("Aggregation failed: {0}")]
    Aggregation(String),

    #[error("Invalid task count {requested}: must be between 1 and {max}")]
    InvalidTaskCount { requested: usize, max: usize },

    #[error("Model identifier must not be empty")]
    EmptyModel,

    #[error("Benchmark cancelled")]
    Cancelled,

    #[error("Ollama error: {0}")]
    OllamaError(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BenchError>;
