//! Variables handed to URL patterns and graph templates.
//!
//! Names match the ones existing graph templates are written against.

use tcgraph_core::{Changeset, GraphJobInput, Push, TemplateVariables, UrlParts};

/// Variables for rendering graph URL patterns.
pub fn url_variables(alias: &str, changeset: &Changeset, parts: &UrlParts) -> TemplateVariables {
    TemplateVariables::new()
        .with("alias", alias)
        .with("revision", changeset.node.as_str())
        .with("path", parts.path.as_str())
        .with("host", parts.host.as_str())
}

/// Variables for instantiating a graph template fetched from `source`.
pub fn graph_variables(
    job: &GraphJobInput,
    push: &Push,
    changeset: &Changeset,
    source: &str,
) -> TemplateVariables {
    TemplateVariables::new()
        .with("owner", push.user.as_str())
        .with("source", source)
        .with("revision", changeset.node.as_str())
        .with("project", job.repo.alias.as_str())
        .with("revision_hash", job.revision_hash.as_str())
        .with("comment", changeset.desc.as_str())
        .with("pushlog_id", push.id.to_string())
        .with("url", job.repo.url.as_str())
        .with("importScopes", true)
}
