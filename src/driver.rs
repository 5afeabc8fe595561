use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::anyhow;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tokio::task;

use crate::brain::{DecisionEngine, DecisionRequest};
use crate::browser::Page;
use crate::config::AgentConfig;
use crate::grammar::{self, Directive};
use crate::types::{StepRecord, StepStatus, TaskReport};
use crate::{dom, hands};

/// Where a session is in its lifecycle. The four rightmost states are
/// terminal; `StepLimitReached` is reported to callers as a trace that
/// simply ends with `CONTINUE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Running,
    Complete,
    Failed,
    Error,
    StepLimitReached,
}

/// One browser context bound to one goal. Exclusively owned by the
/// driver that created it; the backing browser is released when the
/// session is dropped, on every exit path.
pub struct Session {
    id: String,
    page: Arc<dyn Page>,
    current_url: String,
    state: SessionState,
    trace: Vec<StepRecord>,
    step_count: usize,
    last_directive: String,
    repeats: u32,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_url(&self) -> &str {
        &self.current_url
    }

    pub fn trace(&self) -> &[StepRecord] {
        &self.trace
    }

    /// Release the browser resources. Dropping the session does the
    /// same; this exists so call sites can be explicit about it.
    pub fn close(self) {}
}

/// Runs the observe/decide/act loop for one session at a time.
pub struct SessionDriver {
    config: AgentConfig,
    engine: Arc<dyn DecisionEngine>,
}

impl SessionDriver {
    pub fn new(config: AgentConfig, engine: Arc<dyn DecisionEngine>) -> Self {
        Self { config, engine }
    }

    /// Open a session on `url`: navigate, let the page settle, and
    /// record the initial trace entry.
    pub async fn start_session(
        &self,
        page: Arc<dyn Page>,
        url: &str,
    ) -> crate::Result<Session> {
        let nav_page = page.clone();
        let target = url.to_string();
        task::spawn_blocking(move || nav_page.navigate(&target))
            .await
            .map_err(|e| anyhow!("navigation task panicked: {e}"))??;
        tokio::time::sleep(self.config.session_settle).await;

        let (screenshot, current_url) = observe_page(&page).await;
        let id = format!(
            "session_{}",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default()
        );
        tracing::info!(session = %id, %url, "session started");

        let mut session = Session {
            id,
            page,
            current_url: current_url.unwrap_or_else(|| url.to_string()),
            state: SessionState::Init,
            trace: Vec::new(),
            step_count: 0,
            last_directive: String::new(),
            repeats: 0,
        };
        session.trace.push(StepRecord {
            step_number: 0,
            action: format!("Started session on {url}"),
            status: StepStatus::Continue,
            screenshot,
            message: "Session initialized".to_string(),
        });
        Ok(session)
    }

    /// Drive the loop until a terminal status or the step budget runs
    /// out. Never fails: in-loop faults end the trace with an `ERROR`
    /// record instead of propagating.
    pub async fn run_task(
        &self,
        session: &mut Session,
        task: &str,
        max_steps: usize,
    ) -> TaskReport {
        session.state = SessionState::Running;
        let mut status = StepStatus::Continue;

        while status == StepStatus::Continue && session.step_count < max_steps {
            status = match self.run_step(session, task).await {
                Ok(step_status) => step_status,
                Err(fault) => {
                    tracing::error!(error = %fault, "step raised an unrecoverable fault");
                    session.step_count += 1;
                    session.trace.push(StepRecord {
                        step_number: session.step_count,
                        action: "ERROR".to_string(),
                        status: StepStatus::Error,
                        screenshot: String::new(),
                        message: format!("Error: {fault:#}"),
                    });
                    StepStatus::Error
                }
            };

            if status == StepStatus::Continue && session.step_count < max_steps {
                tokio::time::sleep(self.config.inter_step_delay).await;
            }
        }

        session.state = match status {
            StepStatus::Continue => SessionState::StepLimitReached,
            StepStatus::Complete => SessionState::Complete,
            StepStatus::Failed => SessionState::Failed,
            StepStatus::Error => SessionState::Error,
        };
        tracing::info!(
            session = %session.id,
            state = ?session.state,
            steps = session.step_count,
            "task finished"
        );

        TaskReport {
            task: task.to_string(),
            url: session.current_url.clone(),
            steps: session.trace.clone(),
            final_status: status,
            total_steps: session.trace.len().saturating_sub(1),
        }
    }

    async fn run_step(
        &self,
        session: &mut Session,
        task: &str,
    ) -> anyhow::Result<StepStatus> {
        // Fresh context every step: the page may have changed under us.
        let context_page = session.page.clone();
        let config = self.config.clone();
        let context = task::spawn_blocking(move || dom::capture_context(context_page.as_ref(), &config))
            .await
            .map_err(|e| anyhow!("context capture panicked: {e}"))??;

        let directive_text = self
            .engine
            .decide(DecisionRequest {
                task,
                step_count: session.step_count,
                current_url: &session.current_url,
                context: &context,
            })
            .await;
        tracing::debug!(directive = %directive_text, "model directive");

        let directive = grammar::parse(&directive_text);

        if directive_text == session.last_directive {
            session.repeats += 1;
        } else {
            session.repeats = 1;
            session.last_directive = directive_text.clone();
        }

        let is_scroll = matches!(directive, Directive::Scroll);
        let policy_message = if !is_scroll && session.repeats >= self.config.repeat_limit {
            Some("Stopping due to repeated actions")
        } else if is_scroll && session.repeats >= self.config.scroll_repeat_limit {
            Some("Finished exploring page content")
        } else {
            None
        };

        let (status, message) = if let Some(note) = policy_message {
            // Policy termination: no page interaction for this step.
            tracing::info!(repeats = session.repeats, "repetition policy ended the task");
            (StepStatus::Complete, note.to_string())
        } else {
            let exec_page = session.page.clone();
            let config = self.config.clone();
            let step_count = session.step_count;
            let to_run = directive.clone();
            task::spawn_blocking(move || {
                hands::execute(exec_page.as_ref(), &to_run, step_count, &config)
            })
            .await
            .map_err(|e| anyhow!("action execution panicked: {e}"))?
        };

        let (screenshot, current_url) = observe_page(&session.page).await;
        if let Some(url) = current_url {
            session.current_url = url;
        }

        session.step_count += 1;
        session.trace.push(StepRecord {
            step_number: session.step_count,
            action: directive_text,
            status,
            screenshot,
            message,
        });
        tracing::info!(step = session.step_count, %status, "step finished");
        Ok(status)
    }
}

/// Post-action observation: screenshot plus the (possibly new) URL.
/// Both are best-effort; capture failures never fail the step.
async fn observe_page(page: &Arc<dyn Page>) -> (String, Option<String>) {
    let page = page.clone();
    task::spawn_blocking(move || {
        let screenshot = match page.screenshot() {
            Ok(bytes) => STANDARD.encode(bytes),
            Err(error) => {
                tracing::warn!(%error, "screenshot capture failed");
                String::new()
            }
        };
        (screenshot, page.current_url().ok())
    })
    .await
    .unwrap_or((String::new(), None))
}
