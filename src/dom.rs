use anyhow::Result;

use crate::browser::Page;
use crate::config::AgentConfig;
use crate::types::{PageContext, truncate_chars};

/// Tags the introspector considers interactive.
pub const INTERACTIVE_TAGS: [&str; 5] = ["button", "a", "input", "select", "textarea"];

/// Capture a bounded snapshot of the current page: visible text plus
/// the visible interactive elements, capped per tag.
///
/// Read-only. An empty page yields empty containers, not an error;
/// only a real page fault (lost handle) propagates, and the session
/// driver converts that at its boundary.
pub fn capture_context(page: &dyn Page, config: &AgentConfig) -> Result<PageContext> {
    let visible_text = truncate_chars(
        &page.visible_text(config.text_capture_limit)?,
        config.text_capture_limit,
    );

    let mut elements = Vec::new();
    for tag in INTERACTIVE_TAGS {
        let found = page.list_elements(tag)?;
        elements.extend(
            found
                .into_iter()
                .filter(|el| el.visible)
                .take(config.elements_per_tag),
        );
    }

    Ok(PageContext {
        visible_text,
        elements,
    })
}
