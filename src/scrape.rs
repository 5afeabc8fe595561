use std::sync::Arc;

use anyhow::anyhow;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tokio::task;

use crate::browser::Page;
use crate::config::AgentConfig;
use crate::llm::LlmClient;
use crate::types::truncate_chars;

/// One structured item pulled out of a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedItem {
    pub title: String,
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub items: Vec<ExtractedItem>,
}

/// Result of one scrape-and-extract run.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeReport {
    pub url: String,
    pub screenshot: String,
    pub data: ExtractionResult,
    pub raw_count: usize,
}

/// One-shot flow: load the page, hand its HTML to the model, and parse
/// the typed JSON reply. Unlike the action loop this is allowed to
/// fail loudly; there is no policy to fall back on.
pub async fn scrape_and_extract(
    page: Arc<dyn Page>,
    llm: &dyn LlmClient,
    url: &str,
    instructions: &str,
    config: &AgentConfig,
) -> crate::Result<ScrapeReport> {
    let nav_page = page.clone();
    let target = url.to_string();
    task::spawn_blocking(move || nav_page.navigate(&target))
        .await
        .map_err(|e| anyhow!("navigation task panicked: {e}"))??;
    tokio::time::sleep(config.navigation_settle).await;

    let capture_page = page.clone();
    let (html, screenshot) = task::spawn_blocking(move || -> anyhow::Result<(String, String)> {
        let html = capture_page.content()?;
        let screenshot = capture_page
            .screenshot()
            .map(|bytes| STANDARD.encode(bytes))
            .unwrap_or_default();
        Ok((html, screenshot))
    })
    .await
    .map_err(|e| anyhow!("page capture panicked: {e}"))??;

    let html = truncate_chars(&html, config.extraction_html_limit);
    let system = format!(
        r#"You are an expert web scraping agent. Extract relevant information
from this HTML content to JSON format.

Instructions: {instructions}

Extract structured data including titles, descriptions, URLs, and any relevant information.
Return ONLY valid JSON matching {{"items": [{{"title": "...", "description": "...", "url": "...", "image_url": "..."}}]}}.
No markdown or extra text."#
    );

    let reply = llm
        .generate(
            &html,
            Some(&system),
            config.max_extraction_tokens,
            config.temperature,
        )
        .await?;

    let data: ExtractionResult = serde_json::from_str(strip_code_fences(&reply))?;
    tracing::info!(%url, items = data.items.len(), "extraction finished");

    Ok(ScrapeReport {
        url: url.to_string(),
        screenshot,
        raw_count: data.items.len(),
        data,
    })
}

/// Models wrap JSON in markdown fences often enough that stripping
/// them beats arguing with the prompt.
pub fn strip_code_fences(text: &str) -> &str {
    text.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}
