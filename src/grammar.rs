/// A parsed, typed action the agent will take this step.
///
/// Constructed fresh from the model's free-text reply each iteration.
/// Parsing is deliberately permissive: anything the vocabulary does not
/// cover becomes [`Directive::Unknown`], which the executor treats as a
/// cue to explore rather than a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    ClickButton { target: Option<String> },
    ClickLink { target: Option<String> },
    Fill { field: String, value: String },
    Scroll,
    Navigate { url: Option<String> },
    Search { query: String },
    Complete,
    Failed,
    Unknown { raw: String },
}

/// Parse one directive out of a free-text model reply.
///
/// Matching is case-insensitive substring/prefix matching, not strict
/// tokenization, because the model's phrasing drifts. Never fails.
pub fn parse(text: &str) -> Directive {
    let trimmed = text.trim();
    let upper = trimmed.to_uppercase();

    if upper.contains("TASK_COMPLETE") {
        return Directive::Complete;
    }
    if upper.contains("TASK_FAILED") {
        return Directive::Failed;
    }

    if upper.starts_with("CLICK") {
        let lower = trimmed.to_lowercase();
        let target = quoted_target(trimmed);
        if lower.contains("button") {
            return Directive::ClickButton { target };
        }
        if lower.contains("link") {
            return Directive::ClickLink { target };
        }
        // A bare CLICK names neither tag; let the executor explore.
        return Directive::Unknown {
            raw: trimmed.to_string(),
        };
    }

    if upper.starts_with("FILL") {
        let mut tokens = trimmed.split_whitespace();
        tokens.next();
        let field = tokens.next().unwrap_or_default().to_string();
        let value = tokens.collect::<Vec<_>>().join(" ");
        return Directive::Fill { field, value };
    }

    if upper.starts_with("SCROLL") {
        return Directive::Scroll;
    }

    if upper.starts_with("NAVIGATE") {
        let url = trimmed
            .find("http")
            .map(|at| trimmed[at..].trim().to_string());
        return Directive::Navigate { url };
    }

    if upper.starts_with("SEARCH") {
        let query = trimmed.get(6..).unwrap_or_default().trim().to_string();
        return Directive::Search { query };
    }

    Directive::Unknown {
        raw: trimmed.to_string(),
    }
}

/// Substring between the first pair of single quotes, if both exist
/// and the span is non-empty.
fn quoted_target(text: &str) -> Option<String> {
    let open = text.find('\'')?;
    let rest = &text[open + 1..];
    let close = rest.find('\'')?;
    let target = &rest[..close];
    (!target.is_empty()).then(|| target.to_string())
}
