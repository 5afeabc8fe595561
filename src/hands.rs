use std::thread;
use std::time::Duration;

use anyhow::Result;

use crate::browser::Page;
use crate::config::AgentConfig;
use crate::grammar::Directive;
use crate::types::{ElementDescriptor, StepStatus};

/// Selector heuristics for a search box, tried as one group.
const SEARCH_INPUT_SELECTOR: &str =
    "input[type='search'], input[name*='search'], input[placeholder*='search']";

/// Last-resort selector when a FILL names no locatable field.
const GENERIC_INPUT_SELECTOR: &str = "input[type='text'], input[type='email'], textarea";

/// How a click resolved its target. Named so callers and tests can
/// tell "matched by text" from "took the first element anyway".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// An element's visible text contained the requested target.
    MatchedText(usize),
    /// No target given or no text match; the first element stands in.
    FallbackFirst,
    /// The page has no element of that tag at all.
    NoElement,
}

/// Decide which element of a tag a click directive lands on.
pub fn resolve_click(elements: &[ElementDescriptor], target: Option<&str>) -> ClickOutcome {
    if elements.is_empty() {
        return ClickOutcome::NoElement;
    }
    if let Some(wanted) = target {
        let needle = wanted.to_lowercase();
        if let Some(index) = elements
            .iter()
            .position(|el| el.text.to_lowercase().contains(&needle))
        {
            return ClickOutcome::MatchedText(index);
        }
    }
    ClickOutcome::FallbackFirst
}

/// Execute one directive against the page.
///
/// Always returns a status/message pair; any page-interaction fault is
/// caught here and reported as `ERROR` rather than propagated. Missing
/// elements are not faults: they come back as `CONTINUE` with an
/// explanatory message so the loop keeps exploring.
pub fn execute(
    page: &dyn Page,
    directive: &Directive,
    step_count: usize,
    config: &AgentConfig,
) -> (StepStatus, String) {
    match directive {
        Directive::Complete => (
            StepStatus::Complete,
            "Task completed successfully".to_string(),
        ),
        Directive::Failed => (
            StepStatus::Failed,
            "Task failed - could not complete".to_string(),
        ),
        Directive::ClickButton { target } => caught(
            "Click failed",
            click_tagged(page, "button", "button", target.as_deref(), config.button_settle),
        ),
        Directive::ClickLink { target } => caught(
            "Click failed",
            click_tagged(page, "a", "link", target.as_deref(), config.link_settle),
        ),
        Directive::Fill { field, value } => {
            caught("Fill failed", fill_field(page, field, value, config))
        }
        Directive::Scroll => caught("Scroll failed", scroll_page(page, config)),
        Directive::Navigate { url } => caught(
            "Navigation failed",
            navigate_to(page, url.as_deref(), config),
        ),
        Directive::Search { query } => caught("Search failed", search_page(page, query, config)),
        Directive::Unknown { raw } => caught(
            "Action execution failed",
            explore(page, raw, step_count, config),
        ),
    }
}

fn caught(
    prefix: &str,
    result: Result<(StepStatus, String)>,
) -> (StepStatus, String) {
    match result {
        Ok(outcome) => outcome,
        Err(error) => (StepStatus::Error, format!("{prefix}: {error:#}")),
    }
}

fn click_tagged(
    page: &dyn Page,
    tag: &str,
    noun: &str,
    target: Option<&str>,
    settle: Duration,
) -> Result<(StepStatus, String)> {
    let elements = page.list_elements(tag)?;
    match resolve_click(&elements, target) {
        ClickOutcome::NoElement => Ok((
            StepStatus::Continue,
            "No suitable element found to click".to_string(),
        )),
        ClickOutcome::MatchedText(index) => {
            page.click(tag, index)?;
            thread::sleep(settle);
            Ok((
                StepStatus::Continue,
                format!("Clicked {noun}: {}", target.unwrap_or_default()),
            ))
        }
        ClickOutcome::FallbackFirst => {
            page.click(tag, 0)?;
            thread::sleep(settle);
            Ok((StepStatus::Continue, format!("Clicked first {noun}")))
        }
    }
}

fn fill_field(
    page: &dyn Page,
    field: &str,
    value: &str,
    config: &AgentConfig,
) -> Result<(StepStatus, String)> {
    if field.is_empty() || value.is_empty() {
        return Ok((
            StepStatus::Continue,
            "Could not parse fill command".to_string(),
        ));
    }

    // Exact attribute matches first, then the type-specific defaults.
    let mut selectors = vec![
        format!("input[name='{field}']"),
        format!("input[id='{field}']"),
        format!("input[type='{field}']"),
    ];
    if field == "email" {
        selectors.push("input[type='email']".to_string());
    }
    if field == "text" || field == "name" {
        selectors.push("input[type='text']".to_string());
    }

    for selector in &selectors {
        if page.fill(selector, value)? {
            thread::sleep(config.fill_settle);
            return Ok((
                StepStatus::Continue,
                format!("Filled {field} with {value}"),
            ));
        }
    }

    if page.fill(GENERIC_INPUT_SELECTOR, value)? {
        thread::sleep(config.fill_settle);
        return Ok((StepStatus::Continue, format!("Filled field with {value}")));
    }

    Ok((
        StepStatus::Continue,
        "No matching input field found".to_string(),
    ))
}

fn scroll_page(page: &dyn Page, config: &AgentConfig) -> Result<(StepStatus, String)> {
    page.scroll_by(config.scroll_offset)?;
    thread::sleep(config.scroll_settle);
    Ok((
        StepStatus::Continue,
        "Scrolled down to explore more content".to_string(),
    ))
}

fn navigate_to(
    page: &dyn Page,
    url: Option<&str>,
    config: &AgentConfig,
) -> Result<(StepStatus, String)> {
    let Some(url) = url else {
        return Ok((
            StepStatus::Continue,
            "Invalid navigation URL".to_string(),
        ));
    };
    page.navigate(url)?;
    thread::sleep(config.navigation_settle);
    Ok((StepStatus::Continue, format!("Navigated to {url}")))
}

fn search_page(
    page: &dyn Page,
    query: &str,
    config: &AgentConfig,
) -> Result<(StepStatus, String)> {
    if page.fill(SEARCH_INPUT_SELECTOR, query)? {
        page.press_key("Enter")?;
        thread::sleep(config.search_settle);
        Ok((StepStatus::Continue, format!("Searched for: {query}")))
    } else {
        // No search box anywhere; a small scroll is the best we can do.
        page.scroll_by(config.search_scroll_offset)?;
        thread::sleep(config.idle_settle);
        Ok((StepStatus::Continue, format!("Looking for: {query}")))
    }
}

fn explore(
    page: &dyn Page,
    raw: &str,
    step_count: usize,
    config: &AgentConfig,
) -> Result<(StepStatus, String)> {
    if step_count <= config.exploration_step_threshold {
        page.scroll_by(config.exploration_scroll_offset)?;
        thread::sleep(config.exploration_settle);
        Ok((StepStatus::Continue, format!("Exploring page: {raw}")))
    } else {
        thread::sleep(config.idle_settle);
        Ok((StepStatus::Continue, format!("Executed: {raw}")))
    }
}
