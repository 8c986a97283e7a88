//! Sample pushes and graph templates.

use serde_json::{Value, json};

pub const ALIAS: &str = "try";
pub const PUSH_ID: u64 = 42;
pub const REVISION: &str = "deadbeef";
pub const REVISION_HASH: &str = "abc123";
pub const USER: &str = "dev@example.com";

/// Scopes configured for the `try` project.
pub const TRY_SCOPES: [&str; 2] = [
    "queue:define-task:aws-provisioner/build",
    "scheduler:create-task-graph",
];

/// Pushlog responses.
pub struct PushFixture;

impl PushFixture {
    /// One push whose tip is [`REVISION`].
    pub fn single() -> Value {
        json!({
            "lastpushid": PUSH_ID,
            "pushes": {
                "42": {
                    "date": 1700000000,
                    "user": USER,
                    "changesets": [
                        { "node": "0123abcd", "desc": "prepare", "author": USER },
                        { "node": REVISION, "desc": "Bug 1 - fix it; try: -b o", "author": USER }
                    ]
                }
            }
        })
    }

    pub fn missing() -> Value {
        json!({ "lastpushid": PUSH_ID - 1, "pushes": {} })
    }
}

/// Graph templates as served from the repository.
pub struct TemplateFixture;

impl TemplateFixture {
    pub fn graph() -> &'static str {
        r#"
metadata:
  name: "{{project}} push {{pushlog_id}}"
  owner: "{{owner}}"
  source: "{{source}}"
  description: "{{comment}}"
tasks:
  - taskId: "{{#as_slugid}}build{{/as_slugid}}"
    task:
      created: "{{#from_now}}0 seconds{{/from_now}}"
      deadline: "{{#from_now}}1 day{{/from_now}}"
      payload:
        revision: "{{revision}}"
        revision_hash: "{{revision_hash}}"
  - taskId: "{{#as_slugid}}test{{/as_slugid}}"
    requires:
      - "{{#as_slugid}}build{{/as_slugid}}"
    task:
      payload:
        importScopes: "{{importScopes}}"
"#
    }

    /// Not YAML at all.
    pub fn broken() -> &'static str {
        "tasks:\n  - taskId: [unclosed\n    task: {\n"
    }

    pub fn error_graph() -> &'static str {
        r#"
metadata:
  name: "Broken graph for {{project}}"
  owner: "{{owner}}"
tasks:
  - taskId: "{{#as_slugid}}report{{/as_slugid}}"
    task:
      payload:
        error: "{{error}}"
        revision: "{{revision}}"
"#
    }
}
