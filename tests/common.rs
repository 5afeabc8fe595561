//! Shared fakes for exercising the loop without a browser or a model.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use webpilot::brain::{DecisionEngine, DecisionRequest};
use webpilot::browser::Page;
use webpilot::config::AgentConfig;
use webpilot::types::ElementDescriptor;

#[derive(Default)]
pub struct FakeState {
    pub url: String,
    pub visible_text: String,
    pub html: String,
    pub elements: HashMap<String, Vec<ElementDescriptor>>,
    pub fillable: HashSet<String>,
    pub click_navigates_to: Option<String>,
    pub fail_clicks: bool,
    pub fail_visible_text: bool,

    pub clicks: Vec<(String, usize)>,
    pub fills: Vec<(String, String)>,
    pub keys: Vec<String>,
    pub scrolls: Vec<i64>,
    pub navigations: Vec<String>,
}

/// In-memory stand-in for a browser page. Records every interaction
/// and counts releases through its `Drop` impl.
pub struct FakePage {
    state: Mutex<FakeState>,
    releases: Arc<AtomicUsize>,
}

impl FakePage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                url: "https://example.com".to_string(),
                ..Default::default()
            }),
            releases: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn release_counter(&self) -> Arc<AtomicUsize> {
        self.releases.clone()
    }

    pub fn set_text(&self, text: &str) {
        self.state.lock().unwrap().visible_text = text.to_string();
    }

    pub fn set_elements(&self, tag: &str, elements: Vec<ElementDescriptor>) {
        self.state
            .lock()
            .unwrap()
            .elements
            .insert(tag.to_string(), elements);
    }

    pub fn set_fillable(&self, selector: &str) {
        self.state
            .lock()
            .unwrap()
            .fillable
            .insert(selector.to_string());
    }

    pub fn set_click_navigates_to(&self, url: &str) {
        self.state.lock().unwrap().click_navigates_to = Some(url.to_string());
    }

    pub fn fail_clicks(&self) {
        self.state.lock().unwrap().fail_clicks = true;
    }

    pub fn fail_visible_text(&self) {
        self.state.lock().unwrap().fail_visible_text = true;
    }

    pub fn clicks(&self) -> Vec<(String, usize)> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().fills.clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.state.lock().unwrap().keys.clone()
    }

    pub fn scrolls(&self) -> Vec<i64> {
        self.state.lock().unwrap().scrolls.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }
}

impl Drop for FakePage {
    fn drop(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

impl Page for FakePage {
    fn navigate(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.navigations.push(url.to_string());
        state.url = url.to_string();
        Ok(())
    }

    fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    fn visible_text(&self, _max_chars: usize) -> Result<String> {
        let state = self.state.lock().unwrap();
        if state.fail_visible_text {
            return Err(anyhow!("page handle lost"));
        }
        Ok(state.visible_text.clone())
    }

    fn content(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().html.clone())
    }

    fn list_elements(&self, tag: &str) -> Result<Vec<ElementDescriptor>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .elements
            .get(tag)
            .cloned()
            .unwrap_or_default())
    }

    fn click(&self, tag: &str, index: usize) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_clicks {
            return Err(anyhow!("element detached"));
        }
        state.clicks.push((tag.to_string(), index));
        if let Some(destination) = state.click_navigates_to.clone() {
            state.url = destination;
        }
        Ok(())
    }

    fn fill(&self, selector: &str, value: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        if state.fillable.contains(selector) {
            state.fills.push((selector.to_string(), value.to_string()));
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn press_key(&self, key: &str) -> Result<()> {
        self.state.lock().unwrap().keys.push(key.to_string());
        Ok(())
    }

    fn scroll_by(&self, pixels: i64) -> Result<()> {
        self.state.lock().unwrap().scrolls.push(pixels);
        Ok(())
    }

    fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(b"png".to_vec())
    }
}

/// Decision engine that replays a fixed sequence, then scrolls.
pub struct ScriptedEngine {
    directives: Mutex<VecDeque<String>>,
}

impl ScriptedEngine {
    pub fn new<I, S>(directives: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            directives: Mutex::new(directives.into_iter().map(Into::into).collect()),
        })
    }
}

#[async_trait]
impl DecisionEngine for ScriptedEngine {
    async fn decide(&self, _request: DecisionRequest<'_>) -> String {
        self.directives
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "SCROLL".to_string())
    }
}

pub fn test_config() -> AgentConfig {
    AgentConfig::immediate()
}

pub fn element(tag: &str, text: &str) -> ElementDescriptor {
    ElementDescriptor {
        tag: tag.into(),
        text: text.into(),
        visible: true,
        ..Default::default()
    }
}

pub fn button(text: &str) -> ElementDescriptor {
    element("button", text)
}

pub fn link(text: &str) -> ElementDescriptor {
    element("a", text)
}
