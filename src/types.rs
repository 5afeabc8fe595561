use serde::{Deserialize, Serialize};

/// Outcome of one executed step, also the session's running status.
///
/// `Continue` keeps the loop alive; the other three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Continue,
    Complete,
    Failed,
    Error,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StepStatus::Continue => "CONTINUE",
            StepStatus::Complete => "COMPLETE",
            StepStatus::Failed => "FAILED",
            StepStatus::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// One interactive element as seen by the page introspector.
///
/// Serializes with exactly the keys the decision prompt embeds
/// (`tag`, `text`, `type`, `name`, `id`, `href`); visibility is
/// internal bookkeeping and never reaches the model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementDescriptor {
    pub tag: String,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub href: String,
    #[serde(skip_serializing, default)]
    pub visible: bool,
}

/// Bounded snapshot of the current page, recomputed every iteration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageContext {
    pub visible_text: String,
    pub elements: Vec<ElementDescriptor>,
}

/// Immutable record of one loop iteration. Appended to the session
/// trace and never mutated afterwards. The screenshot is a base64 PNG
/// taken after the action executed; empty when capture failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step_number: usize,
    pub action: String,
    pub status: StepStatus,
    pub screenshot: String,
    pub message: String,
}

/// Everything the host gets back from one task run.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub task: String,
    pub url: String,
    pub steps: Vec<StepRecord>,
    pub final_status: StepStatus,
    pub total_steps: usize,
}

/// Truncate to at most `max` characters on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}
