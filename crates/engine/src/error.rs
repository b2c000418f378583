//! Engine error taxonomy.
//!
//! Only fatal conditions live here. "No data at this combination of counters"
//! is not an error: it is [`StepOutcome::Exhausted`](crate::executor::StepOutcome::Exhausted)
//! and never leaves chain traversal.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("step '{step}' not found in parser '{scope}'")]
    StepNotFound { scope: String, step: String },
    #[error("parser with scope '{0}' not found")]
    ParserNotFound(String),
    #[error("no active parser; the handbook declares no parsers")]
    NoActiveParser,
    #[error("chain {chain_id} not found in parser '{scope}'")]
    ChainNotFound { scope: String, chain_id: i64 },
    /// No step of the parser is marked `is_parser_final`.
    #[error("parser '{scope}' produced no result; no step is marked is_parser_final")]
    MissingResult { scope: String },
    /// A binding names a step that has no cached output in the current scope.
    #[error("step '{step}' binds the output of step '{reference}', which has no cached output")]
    UnresolvedReference { step: String, reference: String },
    #[error("could not build HTTP transport: {0}")]
    TransportSetup(String),
}
