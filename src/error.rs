use crate::llm::LlmError;

/// Faults the library surfaces to its host.
///
/// In-loop failures never reach the caller as errors: the decision
/// client converts model faults into a `TASK_FAILED` directive and the
/// executor converts page faults into an `ERROR` step status. What
/// remains here is setup (browser launch, configuration) and the
/// one-shot scrape flow, where failing loudly is the right call.
#[derive(thiserror::Error, Debug)]
pub enum AgentError {
    #[error("model call failed: {0}")]
    Model(#[from] LlmError),

    #[error("browser fault: {0}")]
    Browser(#[from] anyhow::Error),

    #[error("malformed extraction payload: {0}")]
    Extraction(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;
