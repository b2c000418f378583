//! Strongly typed handbook definitions shared by the Parsify engine and CLI.
//!
//! A handbook is the declarative description of what to fetch: a list of
//! parsers (one per result scope), each made of steps grouped into chains.
//! The types here only describe and validate that shape; executing it is the
//! engine's job.

pub mod handbook;
pub mod request;

pub use handbook::{
    CursorSpec, DynamicVariables, Handbook, IterableDimension, IterableFieldSpec, IterableTargets, OutputSpec, ParserDefinition,
    PayloadType, RequestTarget, StandardBinding, StepDefinition,
};
pub use request::{BodyEncoding, PreparedRequest};

use std::path::PathBuf;

use thiserror::Error;

/// Configuration error raised while loading or validating a handbook.
///
/// Every variant is fatal and is reported before any network activity.
#[derive(Debug, Error)]
pub enum HandbookError {
    #[error("could not read handbook file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid handbook: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid handbook YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("parser #{index} has an empty scope")]
    EmptyScope { index: usize },
    #[error("parser scope '{scope}' is declared more than once")]
    DuplicateScope { scope: String },
    #[error("parser '{scope}' contains a step with an empty name")]
    EmptyStepName { scope: String },
    #[error("parser '{scope}' declares step '{step}' more than once")]
    DuplicateStep { scope: String, step: String },
    #[error("step '{step}' in parser '{scope}' has an invalid method '{method}'")]
    InvalidMethod { scope: String, step: String, method: String },
    #[error("step '{step}' in parser '{scope}' binds unknown target '{target}' (expected url, headers, parameters or payload)")]
    UnknownTarget { scope: String, step: String, target: String },
    #[error("step '{step}' in parser '{scope}' binds the whole '{target}' target; only 'payload' accepts a whole-value binding")]
    WholeTargetBinding { scope: String, step: String, target: String },
    #[error("step '{step}' in parser '{scope}' has an empty iterables_order entry")]
    EmptyDimension { scope: String, step: String },
}
