//! Per-project graph locations and scopes.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tcgraph_core::ports::ProjectConfig;
use tcgraph_core::{ConfigError, ScopeList, TemplateVariables};
use tcgraph_template::render;

/// Graph configuration for try-style projects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TryConfig {
    /// URL pattern of the graph template, used unless a project overrides it.
    pub default_url: String,
    /// Scopes granted unless a project overrides them.
    pub default_scopes: Vec<String>,
    /// URL pattern of the graph that reports a broken template.
    pub error_task_url: String,
    #[serde(default)]
    pub projects: HashMap<String, ProjectOverride>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectOverride {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
}

impl TryConfig {
    /// Check the invariants the job relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_url.trim().is_empty() {
            return Err(ConfigError::Invalid("default_url is empty".to_string()));
        }
        if self.error_task_url.trim().is_empty() {
            return Err(ConfigError::Invalid("error_task_url is empty".to_string()));
        }
        if self.default_scopes.is_empty() {
            return Err(ConfigError::EmptyScopes("default_scopes".to_string()));
        }
        let mut seen = HashSet::new();
        for (alias, project) in &self.projects {
            if !seen.insert(alias.to_ascii_lowercase()) {
                return Err(ConfigError::Invalid(format!(
                    "project {alias} is configured more than once"
                )));
            }
            if project.url.as_deref().is_some_and(|u| u.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!("url of project {alias} is empty")));
            }
            if project.scopes.as_ref().is_some_and(Vec::is_empty) {
                return Err(ConfigError::EmptyScopes(alias.clone()));
            }
        }
        Ok(())
    }

    /// Override for `alias`. Aliases match case-insensitively, since layered
    /// configuration sources lowercase map keys.
    fn project(&self, alias: &str) -> Option<&ProjectOverride> {
        self.projects.get(alias).or_else(|| {
            self.projects
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(alias))
                .map(|(_, project)| project)
        })
    }

    fn url_pattern(&self, alias: &str) -> &str {
        self.project(alias)
            .and_then(|p| p.url.as_deref())
            .unwrap_or(&self.default_url)
    }

    fn scope_strings(&self, alias: &str) -> &[String] {
        self.project(alias)
            .and_then(|p| p.scopes.as_deref())
            .unwrap_or(&self.default_scopes)
    }
}

impl ProjectConfig for TryConfig {
    fn url(&self, alias: &str, variables: &TemplateVariables) -> String {
        render(self.url_pattern(alias), variables)
    }

    fn error_task_url(&self, variables: &TemplateVariables) -> String {
        render(&self.error_task_url, variables)
    }

    fn scopes(&self, alias: &str) -> Result<ScopeList, ConfigError> {
        ScopeList::new(self.scope_strings(alias).to_vec())
            .map_err(|_| ConfigError::EmptyScopes(alias.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CONFIG: &str = r#"
default_url: "{{host}}{{path}}/raw-file/{{revision}}/testing/taskcluster/graph.yml"
error_task_url: "https://tasks.example.com/error.yml?project={{alias}}"
default_scopes:
  - "queue:define-task:aws-provisioner/build"
  - "scheduler:create-task-graph"
projects:
  try:
    scopes:
      - "queue:*"
  gaia:
    url: "https://github.example.com/gaia/{{revision}}/graph.yml"
"#;

    fn config() -> TryConfig {
        serde_yaml::from_str(CONFIG).unwrap()
    }

    fn vars() -> TemplateVariables {
        TemplateVariables::new()
            .with("alias", "try")
            .with("revision", "deadbeef")
            .with("path", "/try")
            .with("host", "https://hg.mozilla.org")
    }

    #[test]
    fn test_default_url_pattern() {
        assert_eq!(
            config().url("try", &vars()),
            "https://hg.mozilla.org/try/raw-file/deadbeef/testing/taskcluster/graph.yml"
        );
    }

    #[test]
    fn test_project_url_override() {
        assert_eq!(
            config().url("gaia", &vars()),
            "https://github.example.com/gaia/deadbeef/graph.yml"
        );
    }

    #[test]
    fn test_error_task_url() {
        assert_eq!(
            config().error_task_url(&vars()),
            "https://tasks.example.com/error.yml?project=try"
        );
    }

    #[test]
    fn test_scopes_override_and_default() {
        let config = config();
        assert_eq!(config.scopes("try").unwrap().as_slice(), ["queue:*"]);
        assert_eq!(
            config.scopes("unknown").unwrap().as_slice(),
            [
                "queue:define-task:aws-provisioner/build",
                "scheduler:create-task-graph"
            ]
        );
    }

    #[test]
    fn test_validate() {
        assert!(config().validate().is_ok());

        let mut empty_default = config();
        empty_default.default_scopes.clear();
        assert_eq!(
            empty_default.validate().unwrap_err(),
            ConfigError::EmptyScopes("default_scopes".to_string())
        );

        let mut empty_project = config();
        empty_project.projects.insert(
            "central".to_string(),
            ProjectOverride {
                url: None,
                scopes: Some(vec![]),
            },
        );
        assert_eq!(
            empty_project.validate().unwrap_err(),
            ConfigError::EmptyScopes("central".to_string())
        );
    }

    #[test]
    fn test_alias_lookup_ignores_case() {
        let config = config();
        assert_eq!(config.scopes("TRY").unwrap().as_slice(), ["queue:*"]);
        assert_eq!(
            config.url("Gaia", &vars()),
            "https://github.example.com/gaia/deadbeef/graph.yml"
        );
    }

    #[test]
    fn test_aliases_differing_only_in_case_are_rejected() {
        let mut config = config();
        config.projects.insert(
            "Try".to_string(),
            ProjectOverride {
                url: None,
                scopes: Some(vec!["queue:other".to_string()]),
            },
        );
        assert!(matches!(config.validate().unwrap_err(), ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unvalidated_empty_scopes_are_an_error() {
        let mut config = config();
        config.default_scopes.clear();
        assert!(config.scopes("unknown").is_err());
    }
}
