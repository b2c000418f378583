//! Single-step execution.
//!
//! One invocation of a step moves its iteration counters, binds cached values
//! into a fresh request, sends it through a [`Transport`], extracts the output
//! sequence and merges it into the [`ExtractionCache`].
//!
//! - `binding` builds the request from the step template
//! - `extract` walks `output_path` and applies key projection
//! - `runner::Transport` abstracts how a request is sent
//! - `runner::HttpTransport` sends it over HTTP

use std::fmt;

use parsify_types::StepDefinition;
use parsify_util::{is_empty_json, redact_sensitive};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{Directives, EngineError, ExtractionCache, IterationState};

mod binding;
mod extract;
pub mod runner;

pub use runner::{HttpTransport, Transport};

use binding::{Binding, bind_request};
use extract::{project, resolve_output_path};

/// Why an invocation produced no data.
///
/// A stop is a normal signal during traversal: it tells the odometer that the
/// current dimension has run out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// An indexed iterable points past the end of the referenced sequence.
    IndexOutOfRange {
        field: String,
        reference: String,
        index: i64,
        available: usize,
    },
    /// A binding could not be written into the request.
    Binding(String),
    /// The transport failed (network, status, decoding).
    Transport(String),
    /// Advancing an iterable counter would overflow.
    CounterOverflow { field: String, value: i64, increment: i64 },
    /// The decoded response was empty.
    EmptyResponse,
    PathNotFound { path: String, segment: String },
    /// `output_path` resolved to an empty value.
    EmptyOutput { path: String },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfRange {
                field,
                reference,
                index,
                available,
            } => write!(f, "index {index} of '{field}' is outside the {available} values cached for '{reference}'"),
            Self::CounterOverflow { field, value, increment } => {
                write!(f, "advancing '{field}' from {value} by {increment} overflows")
            }
            Self::Binding(message) => write!(f, "binding failed: {message}"),
            Self::Transport(message) => write!(f, "transport failed: {message}"),
            Self::EmptyResponse => f.write_str("empty response"),
            Self::PathNotFound { path, segment } => write!(f, "segment '{segment}' of output path '{path}' not found"),
            Self::EmptyOutput { path } => write!(f, "output path '{path}' selected an empty value"),
        }
    }
}

/// Result of one step invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The extracted (and projected) sequence of this invocation.
    Data(Vec<Value>),
    Exhausted(StopReason),
}

impl StepOutcome {
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data(_))
    }

    pub fn data(&self) -> Option<&[Value]> {
        match self {
            Self::Data(values) => Some(values),
            Self::Exhausted(_) => None,
        }
    }

    pub fn stop_reason(&self) -> Option<&StopReason> {
        match self {
            Self::Data(_) => None,
            Self::Exhausted(reason) => Some(reason),
        }
    }
}

/// Runs one invocation of `step`.
///
/// Iteration counters move before binding. Data is merged into `cache` under
/// the step name, appended when the step is chain-final and replaced
/// otherwise. Stops leave the cache untouched.
///
/// # Errors
/// Only fatal binding errors propagate, see [`EngineError::UnresolvedReference`].
pub fn execute_step(
    step: &StepDefinition,
    directives: &Directives,
    iteration: &mut IterationState,
    cache: &mut ExtractionCache,
    transport: &dyn Transport,
) -> Result<StepOutcome, EngineError> {
    if let Some(iterables) = step.iterables()
        && let Err(reason) = iteration.apply(iterables, directives)
    {
        return Ok(exhausted(step, reason));
    }

    let request = match bind_request(step, iteration, cache)? {
        Binding::Ready(request) => request,
        Binding::Exhausted(reason) => return Ok(exhausted(step, reason)),
    };

    let response = match transport.send(&request) {
        Ok(response) => response,
        Err(error) => {
            let message = redact_sensitive(&error.to_string());
            warn!(step = %step.name, error = %message, "step request failed");
            return Ok(exhausted(step, StopReason::Transport(message)));
        }
    };
    if is_empty_json(&response) {
        return Ok(exhausted(step, StopReason::EmptyResponse));
    }

    let selected = match resolve_output_path(&response, &step.output_path) {
        Ok(selected) => selected,
        Err(reason) => return Ok(exhausted(step, reason)),
    };
    if is_empty_json(selected) {
        return Ok(exhausted(
            step,
            StopReason::EmptyOutput {
                path: step.output_path.clone(),
            },
        ));
    }

    let values = project(selected, step.output.key.as_deref());
    cache.merge(&step.name, values.clone(), step.output.is_chain_final);
    debug!(
        step = %step.name,
        extracted = values.len(),
        accumulate = step.output.is_chain_final,
        "step produced data"
    );
    Ok(StepOutcome::Data(values))
}

fn exhausted(step: &StepDefinition, reason: StopReason) -> StepOutcome {
    debug!(step = %step.name, reason = %reason, "step exhausted");
    StepOutcome::Exhausted(reason)
}
