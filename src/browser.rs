use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::config::AgentConfig;
use crate::types::ElementDescriptor;

/// The explicitly-owned browser-page resource the loop runs against.
///
/// One implementor per backend; one instance per session, never shared
/// between sessions. Dropping the last handle releases the backing
/// browser. Every method is a fallible remote call.
pub trait Page: Send + Sync {
    fn navigate(&self, url: &str) -> Result<()>;
    fn current_url(&self) -> Result<String>;
    /// Concatenated visible text, bounded to `max_chars`.
    fn visible_text(&self, max_chars: usize) -> Result<String>;
    /// Raw HTML of the current document.
    fn content(&self) -> Result<String>;
    /// Every element of `tag` in document order, visible or not.
    fn list_elements(&self, tag: &str) -> Result<Vec<ElementDescriptor>>;
    /// Click the `index`-th element of `tag` in document order.
    fn click(&self, tag: &str, index: usize) -> Result<()>;
    /// Fill the first element matching a CSS selector. `Ok(false)`
    /// means nothing matched; faults are real errors.
    fn fill(&self, selector: &str, value: &str) -> Result<bool>;
    fn press_key(&self, key: &str) -> Result<()>;
    fn scroll_by(&self, pixels: i64) -> Result<()>;
    /// PNG of the current viewport.
    fn screenshot(&self) -> Result<Vec<u8>>;
}

const VISIBLE_TEXT_JS: &str = r#"
(() => {
  if (!document.body) return '';
  const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_TEXT, null, false);
  let text = '';
  let node;
  while ((node = walker.nextNode())) {
    if (node.parentElement && node.parentElement.offsetParent !== null) {
      text += node.textContent.trim() + ' ';
    }
  }
  return text.slice(0, __MAX_CHARS__);
})()
"#;

const LIST_ELEMENTS_JS: &str = r#"
(() => {
  const out = [];
  document.querySelectorAll('__TAG__').forEach((el) => {
    out.push({
      tag: el.tagName.toLowerCase(),
      text: ((el.textContent || '').trim() || el.value || el.placeholder || '').slice(0, 120),
      type: el.type || '',
      name: el.name || '',
      id: el.id || '',
      href: el.href || '',
      visible: el.offsetParent !== null,
    });
  });
  return JSON.stringify(out);
})()
"#;

const CLICK_JS: &str = r#"
(() => {
  const el = document.querySelectorAll('__TAG__')[__INDEX__];
  if (!el) return false;
  el.click();
  return true;
})()
"#;

const FILL_JS: &str = r#"
(() => {
  const el = document.querySelector(__SELECTOR__);
  if (!el) return false;
  el.focus();
  el.value = __VALUE__;
  el.dispatchEvent(new Event('input', { bubbles: true }));
  el.dispatchEvent(new Event('change', { bubbles: true }));
  return true;
})()
"#;

/// A Chrome tab that owns its browser process. The process dies with
/// the last clone of the handle.
pub struct ChromePage {
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromePage {
    /// Launch a fresh Chrome and open one tab.
    pub fn launch(config: &AgentConfig) -> Result<Self> {
        let options = LaunchOptions {
            headless: config.headless,
            args: vec![
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-setuid-sandbox"),
            ],
            idle_browser_timeout: Duration::from_secs(120),
            ..Default::default()
        };

        let browser = Browser::new(options).context("browser launch failed")?;
        let tab = browser.new_tab().context("could not open a tab")?;
        tab.set_default_timeout(config.navigation_timeout);

        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    fn eval(&self, js: &str) -> Result<Option<serde_json::Value>> {
        let result = self.tab.evaluate(js, false)?;
        Ok(result.value)
    }

    fn eval_string(&self, js: &str) -> Result<String> {
        Ok(self
            .eval(js)?
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default())
    }

    fn eval_bool(&self, js: &str) -> Result<bool> {
        Ok(self
            .eval(js)?
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }
}

impl Page for ChromePage {
    fn navigate(&self, url: &str) -> Result<()> {
        self.tab.navigate_to(url)?;
        self.tab.wait_until_navigated()?;
        Ok(())
    }

    fn current_url(&self) -> Result<String> {
        Ok(self.tab.get_url())
    }

    fn visible_text(&self, max_chars: usize) -> Result<String> {
        let js = VISIBLE_TEXT_JS.replace("__MAX_CHARS__", &max_chars.to_string());
        self.eval_string(&js)
    }

    fn content(&self) -> Result<String> {
        self.eval_string("document.documentElement.outerHTML")
    }

    fn list_elements(&self, tag: &str) -> Result<Vec<ElementDescriptor>> {
        let js = LIST_ELEMENTS_JS.replace("__TAG__", tag);
        let raw = self.eval_string(&js)?;
        if raw.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).context("element snapshot was not valid JSON")
    }

    fn click(&self, tag: &str, index: usize) -> Result<()> {
        let js = CLICK_JS
            .replace("__TAG__", tag)
            .replace("__INDEX__", &index.to_string());
        if self.eval_bool(&js)? {
            Ok(())
        } else {
            Err(anyhow!("element <{tag}>[{index}] is no longer present"))
        }
    }

    fn fill(&self, selector: &str, value: &str) -> Result<bool> {
        let js = FILL_JS
            .replace("__SELECTOR__", &js_literal(selector))
            .replace("__VALUE__", &js_literal(value));
        self.eval_bool(&js)
    }

    fn press_key(&self, key: &str) -> Result<()> {
        self.tab.press_key(key)?;
        Ok(())
    }

    fn scroll_by(&self, pixels: i64) -> Result<()> {
        self.eval(&format!("window.scrollBy(0, {pixels})"))?;
        Ok(())
    }

    fn screenshot(&self) -> Result<Vec<u8>> {
        self.tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, false)
            .context("screenshot capture failed")
    }
}

/// Encode a Rust string as a JS string literal. JSON string syntax is
/// a subset of JS, so serde does the escaping.
fn js_literal(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}
