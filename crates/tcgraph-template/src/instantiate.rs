//! YAML graph instantiation.
//!
//! The template is parsed before any substitution happens, so variable text
//! (including multi-line error diagnostics) only ever lands inside string
//! scalars and cannot change the shape of the document.
//!
//! Besides plain placeholders two helper sections are understood:
//!
//! - `{{#as_slugid}}label{{/as_slugid}}`: a fresh slug id, the same one for
//!   every use of `label` within one instantiation.
//! - `{{#from_now}}3 hours{{/from_now}}`: an RFC 3339 timestamp relative to
//!   the moment of instantiation.

use crate::render::{render, sole_placeholder};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::sync::LazyLock;
use tcgraph_core::ids::slugid;
use tcgraph_core::ports::GraphInstantiator;
use tcgraph_core::{GraphDocument, TemplateError, TemplateVariables};
use tracing::debug;

static SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{#\s*(\w+)\s*\}\}(.*?)\{\{/\s*(\w+)\s*\}\}").expect("section pattern")
});

/// Instantiates YAML graph templates.
#[derive(Debug, Clone, Default)]
pub struct YamlInstantiator;

impl YamlInstantiator {
    pub fn new() -> Self {
        Self
    }
}

impl GraphInstantiator for YamlInstantiator {
    fn instantiate(
        &self,
        template: &str,
        variables: &TemplateVariables,
    ) -> Result<GraphDocument, TemplateError> {
        let parsed: serde_yaml::Value =
            serde_yaml::from_str(template).map_err(|e| TemplateError::Syntax(e.to_string()))?;

        let mut scope = Instantiation {
            variables,
            slugs: HashMap::new(),
            now: Utc::now(),
        };

        match scope.value(parsed)? {
            Value::Object(map) => {
                debug!(keys = map.len(), slugs = scope.slugs.len(), "Instantiated graph");
                Ok(GraphDocument::from_map(map))
            }
            _ => Err(TemplateError::NotAMapping),
        }
    }
}

/// State of a single instantiation.
struct Instantiation<'a> {
    variables: &'a TemplateVariables,
    slugs: HashMap<String, String>,
    now: DateTime<Utc>,
}

impl Instantiation<'_> {
    fn value(&mut self, value: serde_yaml::Value) -> Result<Value, TemplateError> {
        Ok(match value {
            serde_yaml::Value::Null => Value::Null,
            serde_yaml::Value::Bool(b) => Value::Bool(b),
            serde_yaml::Value::Number(n) => Value::Number(number(&n)?),
            serde_yaml::Value::String(s) => self.scalar(&s)?,
            serde_yaml::Value::Sequence(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.value(item))
                    .collect::<Result<_, _>>()?,
            ),
            serde_yaml::Value::Mapping(mapping) => {
                let mut map = Map::new();
                for (key, value) in mapping {
                    let key = self.key(key)?;
                    map.insert(key, self.value(value)?);
                }
                Value::Object(map)
            }
            serde_yaml::Value::Tagged(tagged) => self.value(tagged.value)?,
        })
    }

    fn key(&mut self, key: serde_yaml::Value) -> Result<String, TemplateError> {
        let raw = match key {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Bool(b) => b.to_string(),
            serde_yaml::Value::Number(n) => n.to_string(),
            other => {
                return Err(TemplateError::Render(format!(
                    "unsupported mapping key {other:?}"
                )));
            }
        };
        self.text(&raw)
    }

    fn scalar(&mut self, raw: &str) -> Result<Value, TemplateError> {
        if let Some(name) = sole_placeholder(raw)
            && let Some(value) = self.variables.get(name)
        {
            return Ok(value.clone());
        }
        Ok(Value::String(self.text(raw)?))
    }

    fn text(&mut self, raw: &str) -> Result<String, TemplateError> {
        let mut expanded = String::with_capacity(raw.len());
        let mut last = 0;
        for caps in SECTION.captures_iter(raw) {
            let (Some(whole), Some(open), Some(body), Some(close)) =
                (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
            else {
                continue;
            };
            if open.as_str() != close.as_str() {
                return Err(TemplateError::Render(format!(
                    "section {{{{#{}}}}} closed by {{{{/{}}}}}",
                    open.as_str(),
                    close.as_str()
                )));
            }
            expanded.push_str(&raw[last..whole.start()]);
            let body = render(body.as_str(), self.variables);
            expanded.push_str(&self.helper(open.as_str(), body.trim())?);
            last = whole.end();
        }
        expanded.push_str(&raw[last..]);
        Ok(render(&expanded, self.variables))
    }

    fn helper(&mut self, name: &str, body: &str) -> Result<String, TemplateError> {
        match name {
            "as_slugid" => Ok(self
                .slugs
                .entry(body.to_string())
                .or_insert_with(slugid)
                .clone()),
            "from_now" => {
                let at = self
                    .now
                    .checked_add_signed(parse_offset(body)?)
                    .ok_or_else(|| TemplateError::Render(format!("time offset {body:?} overflows")))?;
                Ok(at.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            other => Err(TemplateError::Render(format!("unknown helper {other}"))),
        }
    }
}

fn number(n: &serde_yaml::Number) -> Result<Number, TemplateError> {
    if let Some(i) = n.as_i64() {
        Ok(Number::from(i))
    } else if let Some(u) = n.as_u64() {
        Ok(Number::from(u))
    } else {
        n.as_f64()
            .and_then(Number::from_f64)
            .ok_or_else(|| TemplateError::Render(format!("number {n} is not representable")))
    }
}

/// Parse `<n> <unit>`, e.g. `2 hours` or `30 minutes`.
fn parse_offset(body: &str) -> Result<TimeDelta, TemplateError> {
    let invalid = || TemplateError::Render(format!("invalid time offset {body:?}"));

    let mut parts = body.split_whitespace();
    let amount: i64 = parts
        .next()
        .and_then(|n| n.parse().ok())
        .ok_or_else(invalid)?;
    let unit = parts.next().ok_or_else(invalid)?;
    if parts.next().is_some() {
        return Err(invalid());
    }

    let delta = match unit.trim_end_matches('s') {
        "second" | "sec" => TimeDelta::try_seconds(amount),
        "minute" | "min" => TimeDelta::try_minutes(amount),
        "hour" => TimeDelta::try_hours(amount),
        "day" => TimeDelta::try_days(amount),
        _ => None,
    };
    delta.ok_or_else(invalid)
}
