use std::time::Duration;

/// Every bound, threshold and pause the loop uses, in one place.
///
/// The defaults are the empirically-chosen values the agent shipped
/// with; none of them is assumed optimal, which is why they are fields
/// rather than constants.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Characters of visible text captured from the page.
    pub text_capture_limit: usize,
    /// Characters of visible text forwarded to the decision prompt.
    pub prompt_text_limit: usize,
    /// Interactive elements kept per tag at capture.
    pub elements_per_tag: usize,
    /// Interactive elements forwarded to the decision prompt in total.
    pub prompt_element_limit: usize,
    /// Characters of raw HTML forwarded to the extraction prompt.
    pub extraction_html_limit: usize,

    /// Steps executed per task unless the caller overrides.
    pub default_max_steps: usize,
    /// Step count at which the decision client forces `TASK_COMPLETE`
    /// when the model signals neither completion nor failure.
    pub decision_step_ceiling: usize,
    /// Consecutive identical non-scroll directives before the driver
    /// declares the task complete.
    pub repeat_limit: u32,
    /// Consecutive identical scroll directives before the driver calls
    /// exploration finished. Higher than `repeat_limit`: repeated
    /// scrolling is legitimate exploration, not a stall.
    pub scroll_repeat_limit: u32,
    /// Steps during which an unparseable directive still triggers an
    /// exploratory scroll instead of a plain wait.
    pub exploration_step_threshold: usize,

    /// Pixels scrolled by a SCROLL directive.
    pub scroll_offset: i64,
    /// Pixels scrolled when SEARCH finds no search box.
    pub search_scroll_offset: i64,
    /// Pixels scrolled for an unknown directive in the early steps.
    pub exploration_scroll_offset: i64,

    pub navigation_timeout: Duration,
    pub button_settle: Duration,
    pub link_settle: Duration,
    pub fill_settle: Duration,
    pub scroll_settle: Duration,
    pub navigation_settle: Duration,
    pub search_settle: Duration,
    pub exploration_settle: Duration,
    pub idle_settle: Duration,
    pub inter_step_delay: Duration,
    pub session_settle: Duration,

    /// Response cap for one decision round trip.
    pub max_decision_tokens: u32,
    /// Response cap for the scrape-extraction round trip.
    pub max_extraction_tokens: u32,
    /// Near-deterministic sampling for decisions and extraction.
    pub temperature: f32,

    pub headless: bool,
    pub model: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            text_capture_limit: 2000,
            prompt_text_limit: 1500,
            elements_per_tag: 10,
            prompt_element_limit: 15,
            extraction_html_limit: 150_000,

            default_max_steps: 5,
            decision_step_ceiling: 8,
            repeat_limit: 3,
            scroll_repeat_limit: 4,
            exploration_step_threshold: 3,

            scroll_offset: 500,
            search_scroll_offset: 300,
            exploration_scroll_offset: 400,

            navigation_timeout: Duration::from_secs(30),
            button_settle: Duration::from_secs(2),
            link_settle: Duration::from_secs(3),
            fill_settle: Duration::from_secs(1),
            scroll_settle: Duration::from_secs(2),
            navigation_settle: Duration::from_secs(3),
            search_settle: Duration::from_secs(3),
            exploration_settle: Duration::from_millis(1500),
            idle_settle: Duration::from_secs(1),
            inter_step_delay: Duration::from_secs(2),
            session_settle: Duration::from_secs(2),

            max_decision_tokens: 100,
            max_extraction_tokens: 1500,
            temperature: 0.1,

            headless: true,
            model: "gpt-4o-mini".to_string(),
        }
    }
}

impl AgentConfig {
    /// Defaults with every settle pause and delay zeroed. The policy
    /// thresholds, bounds and the navigation timeout are untouched.
    pub fn immediate() -> Self {
        Self {
            button_settle: Duration::ZERO,
            link_settle: Duration::ZERO,
            fill_settle: Duration::ZERO,
            scroll_settle: Duration::ZERO,
            navigation_settle: Duration::ZERO,
            search_settle: Duration::ZERO,
            exploration_settle: Duration::ZERO,
            idle_settle: Duration::ZERO,
            inter_step_delay: Duration::ZERO,
            session_settle: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Defaults overlaid with `WEBPILOT_*` environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(model) = std::env::var("WEBPILOT_MODEL") {
            if !model.trim().is_empty() {
                cfg.model = model;
            }
        }
        if let Ok(headless) = std::env::var("WEBPILOT_HEADLESS") {
            cfg.headless = !matches!(headless.trim(), "0" | "false" | "no");
        }
        if let Ok(steps) = std::env::var("WEBPILOT_MAX_STEPS") {
            if let Ok(parsed) = steps.trim().parse() {
                cfg.default_max_steps = parsed;
            }
        }
        cfg
    }
}
