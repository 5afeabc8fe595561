use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::task;

use crate::brain::Brain;
use crate::browser::{ChromePage, Page};
use crate::config::AgentConfig;
use crate::driver::SessionDriver;
use crate::llm::LlmClient;
use crate::scrape::{self, ScrapeReport};
use crate::types::TaskReport;

#[derive(Clone)]
struct AppState {
    config: AgentConfig,
    llm: Arc<dyn LlmClient>,
}

#[derive(Deserialize)]
struct AutonomousRequest {
    #[serde(default)]
    url: String,
    #[serde(default)]
    task: String,
    #[serde(default)]
    max_steps: Option<usize>,
}

#[derive(Serialize)]
struct AutonomousResponse {
    success: bool,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    report: TaskReport,
}

#[derive(Deserialize)]
struct ScrapeRequest {
    #[serde(default)]
    url: String,
    #[serde(default)]
    instructions: Option<String>,
}

#[derive(Serialize)]
struct ScrapeResponse {
    success: bool,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    report: ScrapeReport,
}

/// Start the web console. Tries `port` first, then the next nine.
pub async fn serve(
    host: &str,
    port: u16,
    config: AgentConfig,
    llm: Arc<dyn LlmClient>,
) -> anyhow::Result<()> {
    let state = Arc::new(AppState { config, llm });

    let app = Router::new()
        .route("/", get(index_handler))
        .route("/autonomous", post(autonomous_handler))
        .route("/scrape", post(scrape_handler))
        .route(
            "/favicon.ico",
            get(|| async { StatusCode::NO_CONTENT }),
        )
        .with_state(state);

    let mut listener = None;
    for candidate in port..port.saturating_add(10) {
        match tokio::net::TcpListener::bind((host, candidate)).await {
            Ok(bound) => {
                tracing::info!("web console at http://{host}:{candidate}");
                listener = Some(bound);
                break;
            }
            Err(_) => continue,
        }
    }
    let listener = listener.ok_or_else(|| {
        anyhow::anyhow!(
            "could not bind any port in {port}..{}",
            port.saturating_add(10)
        )
    })?;

    axum::serve(listener, app).await?;
    Ok(())
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn autonomous_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AutonomousRequest>,
) -> Response {
    if payload.url.trim().is_empty() || payload.task.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "URL and task are required");
    }
    let url = normalize_url(payload.url.trim());
    let max_steps = payload.max_steps.unwrap_or(state.config.default_max_steps);
    tracing::info!(%url, task = %payload.task, max_steps, "autonomous task accepted");

    let page = match launch_page(&state.config).await {
        Ok(page) => page,
        Err(error) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Autonomous task failed: {error:#}"),
            );
        }
    };

    let brain = Brain::new(state.llm.clone(), state.config.clone());
    let driver = SessionDriver::new(state.config.clone(), Arc::new(brain));

    let mut session = match driver.start_session(page, &url).await {
        Ok(session) => session,
        Err(error) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Autonomous task failed: {error}"),
            );
        }
    };

    let report = driver.run_task(&mut session, &payload.task, max_steps).await;
    session.close();

    Json(AutonomousResponse {
        success: true,
        kind: "autonomous",
        report,
    })
    .into_response()
}

async fn scrape_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ScrapeRequest>,
) -> Response {
    if payload.url.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "URL is required");
    }
    let url = normalize_url(payload.url.trim());
    let instructions = payload
        .instructions
        .unwrap_or_else(|| "Extract all relevant data from this webpage".to_string());
    tracing::info!(%url, "scrape accepted");

    let page = match launch_page(&state.config).await {
        Ok(page) => page,
        Err(error) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Scraping failed: {error:#}"),
            );
        }
    };

    match scrape::scrape_and_extract(page, state.llm.as_ref(), &url, &instructions, &state.config)
        .await
    {
        Ok(report) => Json(ScrapeResponse {
            success: true,
            kind: "scraping",
            report,
        })
        .into_response(),
        Err(error) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("Scraping failed: {error}"),
        ),
    }
}

async fn launch_page(config: &AgentConfig) -> anyhow::Result<Arc<dyn Page>> {
    let launch_config = config.clone();
    let chrome = task::spawn_blocking(move || ChromePage::launch(&launch_config))
        .await
        .map_err(|e| anyhow::anyhow!("browser launch panicked: {e}"))??;
    Ok(Arc::new(chrome))
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn normalize_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>webpilot</title>
<style>
  * { margin: 0; padding: 0; box-sizing: border-box; }
  body {
    background: #0a0a0f;
    color: #e0e0e0;
    font-family: 'Segoe UI', system-ui, -apple-system, sans-serif;
    min-height: 100vh;
  }
  header {
    padding: 24px 32px;
    border-bottom: 1px solid #1a1a2e;
    display: flex;
    align-items: center;
    gap: 12px;
  }
  header h1 { font-size: 20px; font-weight: 600; color: #fff; }
  header .dot {
    width: 8px; height: 8px;
    border-radius: 50%;
    background: #22c55e;
  }
  header .dot.busy { background: #f59e0b; animation: pulse 1.2s infinite; }
  @keyframes pulse { 0%, 100% { opacity: 1; } 50% { opacity: 0.4; } }
  .main {
    max-width: 860px;
    margin: 0 auto;
    padding: 24px 32px;
    display: flex;
    flex-direction: column;
    gap: 24px;
  }
  .card {
    background: #111118;
    border: 1px solid #222;
    border-radius: 10px;
    padding: 20px;
    display: flex;
    flex-direction: column;
    gap: 10px;
  }
  .card h2 { font-size: 15px; color: #a5b4fc; }
  input, textarea {
    background: #0a0a0f;
    border: 1px solid #222;
    border-radius: 8px;
    padding: 10px 14px;
    color: #fff;
    font-size: 14px;
    outline: none;
  }
  input:focus, textarea:focus { border-color: #6366f1; }
  .row { display: flex; gap: 8px; }
  .row input:first-child { flex: 1; }
  .row input.steps { width: 90px; }
  button {
    background: #6366f1;
    color: #fff;
    border: none;
    border-radius: 8px;
    padding: 10px 24px;
    font-size: 14px;
    font-weight: 600;
    cursor: pointer;
    align-self: flex-start;
  }
  button:hover { background: #4f46e5; }
  button:disabled { background: #333; cursor: not-allowed; }
  #results { display: flex; flex-direction: column; gap: 10px; }
  .step {
    background: #111118;
    border-left: 3px solid #3b82f6;
    border-radius: 8px;
    padding: 10px 14px;
    font-size: 13px;
    font-family: 'Cascadia Code', 'Fira Code', monospace;
  }
  .step.COMPLETE { border-left-color: #22c55e; }
  .step.FAILED, .step.ERROR { border-left-color: #ef4444; }
  .step .num { color: #6366f1; font-weight: 700; margin-right: 8px; }
  .step .msg { color: #9ca3af; display: block; margin-top: 4px; }
  .step img { max-width: 100%; border-radius: 6px; margin-top: 8px; border: 1px solid #222; }
  .error-box {
    background: #1a0a0a;
    border-left: 3px solid #ef4444;
    border-radius: 8px;
    padding: 10px 14px;
    color: #fca5a5;
    font-size: 13px;
  }
  pre { white-space: pre-wrap; font-size: 12px; color: #86efac; }
</style>
</head>
<body>
  <header>
    <div class="dot" id="dot"></div>
    <h1>webpilot</h1>
  </header>
  <div class="main">
    <div class="card">
      <h2>Autonomous task</h2>
      <input type="text" id="auto-url" placeholder="Starting URL (example.com)" />
      <div class="row">
        <input type="text" id="auto-task" placeholder="What should the agent do?" />
        <input type="number" class="steps" id="auto-steps" placeholder="steps" value="5" min="1" />
      </div>
      <button id="auto-run" onclick="runAutonomous()">Run</button>
    </div>
    <div class="card">
      <h2>Scrape &amp; extract</h2>
      <input type="text" id="scrape-url" placeholder="URL to scrape" />
      <input type="text" id="scrape-instructions" placeholder="Extraction instructions (optional)" />
      <button id="scrape-run" onclick="runScrape()">Scrape</button>
    </div>
    <div id="results"></div>
  </div>
<script>
  const results = document.getElementById('results');
  const dot = document.getElementById('dot');

  function setBusy(busy) {
    dot.className = busy ? 'dot busy' : 'dot';
    document.getElementById('auto-run').disabled = busy;
    document.getElementById('scrape-run').disabled = busy;
  }

  function showError(message) {
    const div = document.createElement('div');
    div.className = 'error-box';
    div.textContent = message;
    results.prepend(div);
  }

  function esc(text) {
    return (text || '').replace(/</g, '&lt;');
  }

  async function runAutonomous() {
    const url = document.getElementById('auto-url').value.trim();
    const task = document.getElementById('auto-task').value.trim();
    const maxSteps = parseInt(document.getElementById('auto-steps').value, 10) || 5;
    if (!url || !task) return showError('URL and task are required');
    results.innerHTML = '';
    setBusy(true);
    try {
      const resp = await fetch('/autonomous', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({ url, task, max_steps: maxSteps }),
      });
      const data = await resp.json();
      if (!resp.ok) return showError(data.error || 'Request failed');
      for (const step of data.steps) {
        const div = document.createElement('div');
        div.className = 'step ' + step.status;
        div.innerHTML = '<span class="num">Step ' + step.step_number + '</span>'
          + esc(step.action)
          + '<span class="msg">' + esc(step.message) + ' [' + step.status + ']</span>'
          + (step.screenshot ? '<img src="data:image/png;base64,' + step.screenshot + '" />' : '');
        results.appendChild(div);
      }
    } catch (e) {
      showError(String(e));
    } finally {
      setBusy(false);
    }
  }

  async function runScrape() {
    const url = document.getElementById('scrape-url').value.trim();
    const instructions = document.getElementById('scrape-instructions').value.trim();
    if (!url) return showError('URL is required');
    results.innerHTML = '';
    setBusy(true);
    try {
      const resp = await fetch('/scrape', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({ url, instructions: instructions || undefined }),
      });
      const data = await resp.json();
      if (!resp.ok) return showError(data.error || 'Request failed');
      const div = document.createElement('div');
      div.className = 'step COMPLETE';
      div.innerHTML = '<span class="num">' + data.raw_count + ' items</span>'
        + '<pre>' + esc(JSON.stringify(data.data.items, null, 2)) + '</pre>'
        + (data.screenshot ? '<img src="data:image/png;base64,' + data.screenshot + '" />' : '');
      results.appendChild(div);
    } catch (e) {
      showError(String(e));
    } finally {
      setBusy(false);
    }
  }
</script>
</body>
</html>
"##;
