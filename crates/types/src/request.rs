//! Resolved request handed to the transport.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{PayloadType, StepDefinition};

/// How `PreparedRequest::body` is put on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BodyEncoding {
    #[default]
    Json,
    Form,
}

impl From<PayloadType> for BodyEncoding {
    fn from(payload_type: PayloadType) -> Self {
        match payload_type {
            PayloadType::Json => Self::Json,
            PayloadType::Data => Self::Form,
        }
    }
}

/// A fully bound request for one step invocation.
///
/// Built fresh from the step template every time the step runs, so binding
/// never leaks values into the handbook or into later invocations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PreparedRequest {
    pub method: String,
    pub url: String,
    pub headers: Map<String, Value>,
    /// Query parameters. Array values repeat the key.
    pub query: Map<String, Value>,
    pub body: Option<Value>,
    pub body_encoding: BodyEncoding,
}

impl PreparedRequest {
    /// Copies the static request parts of a step.
    pub fn from_step(step: &StepDefinition) -> Self {
        Self {
            method: step.method.to_ascii_uppercase(),
            url: step.url.clone(),
            headers: step.headers.clone().unwrap_or_default(),
            query: step.parameters.clone().unwrap_or_default(),
            body: step.payload.clone(),
            body_encoding: step.payload_type.map(BodyEncoding::from).unwrap_or_default(),
        }
    }
}
