//! Template rendering for tcgraph.
//!
//! Two consumers share the same `{{ name }}` placeholder syntax: the
//! project configuration, which renders graph URLs, and the YAML graph
//! instantiator.

pub mod instantiate;
pub mod render;

pub use instantiate::YamlInstantiator;
pub use render::{render, value_text};
