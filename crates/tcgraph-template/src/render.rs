//! Placeholder rendering.

use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;
use tcgraph_core::TemplateVariables;

/// `{{ name }}` or `{{{ name }}}`.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\{?\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*\}?\}\}").expect("placeholder pattern")
});

/// Replace every placeholder in `input` with its variable's text.
///
/// Unknown names render as the empty string. No escaping is applied.
pub fn render(input: &str, variables: &TemplateVariables) -> String {
    PLACEHOLDER
        .replace_all(input, |caps: &Captures| {
            let name = caps.get(1).map_or("", |m| m.as_str());
            variables.get(name).map(value_text).unwrap_or_default()
        })
        .into_owned()
}

/// If `input` is exactly one placeholder, the name it refers to.
pub(crate) fn sole_placeholder(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    let caps = PLACEHOLDER.captures(trimmed)?;
    let whole = caps.get(0)?;
    if whole.start() == 0 && whole.end() == trimmed.len() {
        caps.get(1).map(|m| m.as_str())
    } else {
        None
    }
}

/// Text form of a variable value.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
