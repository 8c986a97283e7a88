//! Template variables, graph documents and scope lists.

use crate::error::ConfigError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Named values substituted into URL patterns and graph templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateVariables(BTreeMap<String, Value>);

impl TemplateVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// String value of a variable, if it is a string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An instantiated task graph, before scopes are attached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphDocument(Map<String, Value>);

impl GraphDocument {
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Combine the document with the scopes it will be submitted under.
    pub fn with_scopes(self, scopes: ScopeList) -> SubmittedGraph {
        SubmittedGraph { body: self, scopes }
    }
}

/// Non-empty, ordered list of authorization scopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ScopeList(Vec<String>);

impl ScopeList {
    pub fn new(scopes: Vec<String>) -> Result<Self, ConfigError> {
        if scopes.is_empty() {
            return Err(ConfigError::EmptyScopes("scope list".to_string()));
        }
        Ok(Self(scopes))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    /// Scopes joined with `", "` for log lines.
    pub fn joined(&self) -> String {
        self.0.join(", ")
    }
}

impl TryFrom<Vec<String>> for ScopeList {
    type Error = ConfigError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ScopeList> for Vec<String> {
    fn from(scopes: ScopeList) -> Self {
        scopes.0
    }
}

/// The document actually handed to the scheduler: the instantiated body with
/// `scopes` set to the resolved scope list.
///
/// Any `scopes` key the template produced is replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedGraph {
    body: GraphDocument,
    scopes: ScopeList,
}

impl SubmittedGraph {
    pub fn body(&self) -> &GraphDocument {
        &self.body
    }

    pub fn scopes(&self) -> &ScopeList {
        &self.scopes
    }

    pub fn to_value(&self) -> Value {
        let mut map = self.body.as_map().clone();
        map.insert(
            "scopes".to_string(),
            Value::Array(self.scopes.iter().cloned().map(Value::String).collect()),
        );
        Value::Object(map)
    }
}

impl Serialize for SubmittedGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in self.body.as_map() {
            if key != "scopes" {
                map.serialize_entry(key, value)?;
            }
        }
        map.serialize_entry("scopes", &self.scopes)?;
        map.end()
    }
}
