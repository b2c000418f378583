//! Handbook schema definitions.
//!
//! The models mirror the authored handbook document: `parsers`, each with a
//! `scope` and an ordered list of `steps`. Mappings use `IndexMap` so binding
//! targets and iterable fields keep their authoring order.

pub mod validation;

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::HandbookError;

/// Iterable bindings keyed by request target, then by field name.
pub type IterableTargets = IndexMap<String, IndexMap<String, IterableFieldSpec>>;

/// Top-level handbook document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Handbook {
    /// Parsers executed in declaration order.
    pub parsers: Vec<ParserDefinition>,
}

impl Handbook {
    /// Builds a validated handbook from an already decoded JSON tree.
    pub fn from_value(value: Value) -> Result<Self, HandbookError> {
        let handbook: Handbook = serde_json::from_value(value)?;
        handbook.validate()?;
        Ok(handbook)
    }

    /// Parses and validates a JSON handbook document.
    pub fn from_json_str(text: &str) -> Result<Self, HandbookError> {
        let handbook: Handbook = serde_json::from_str(text)?;
        handbook.validate()?;
        Ok(handbook)
    }

    /// Parses and validates a YAML handbook document.
    pub fn from_yaml_str(text: &str) -> Result<Self, HandbookError> {
        let handbook: Handbook = serde_yaml::from_str(text)?;
        handbook.validate()?;
        Ok(handbook)
    }

    /// Parses a handbook document, choosing the decoder from the file extension.
    ///
    /// `.json` files use the JSON decoder; everything else is read as YAML.
    pub fn from_str_for_path(text: &str, path: &Path) -> Result<Self, HandbookError> {
        let is_json = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
        if is_json { Self::from_json_str(text) } else { Self::from_yaml_str(text) }
    }

    /// Runs the semantic checks that serde cannot express.
    pub fn validate(&self) -> Result<(), HandbookError> {
        validation::validate_handbook(self)
    }

    /// Finds a parser by scope name.
    pub fn parser(&self, scope: &str) -> Option<&ParserDefinition> {
        self.parsers.iter().find(|parser| parser.scope == scope)
    }

    /// Scope names in declaration order.
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.parsers.iter().map(|parser| parser.scope.as_str())
    }
}

/// One independent extraction task producing one named result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParserDefinition {
    /// Result key this parser publishes under.
    pub scope: String,
    /// Steps of every chain, in authoring order.
    pub steps: Vec<StepDefinition>,
}

impl ParserDefinition {
    /// Finds a step by name.
    pub fn step(&self, name: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|step| step.name == name)
    }

    /// Distinct chain identifiers in ascending order.
    pub fn chain_ids(&self) -> Vec<i64> {
        let mut chain_ids: Vec<i64> = self.steps.iter().map(|step| step.chain_id).collect();
        chain_ids.sort_unstable();
        chain_ids.dedup();
        chain_ids
    }

    /// Steps sharing `chain_id`, in authoring order.
    pub fn chain_steps(&self, chain_id: i64) -> Vec<&StepDefinition> {
        self.steps.iter().filter(|step| step.chain_id == chain_id).collect()
    }
}

/// One HTTP call template plus its extraction and accumulation rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepDefinition {
    /// Unique name within the parser; also the extraction cache key.
    pub name: String,
    /// Chain this step belongs to.
    pub chain_id: i64,
    /// Absolute request URL. May contain `{field}` placeholders for url bindings.
    pub url: String,
    /// HTTP method, e.g. `GET`.
    pub method: String,
    #[serde(default)]
    pub headers: Option<Map<String, Value>>,
    /// Query parameters.
    #[serde(default)]
    pub parameters: Option<Map<String, Value>>,
    /// Request body.
    #[serde(default)]
    pub payload: Option<Value>,
    /// How `payload` is encoded on the wire.
    #[serde(default)]
    pub payload_type: Option<PayloadType>,
    /// Dot-separated path to the sequence inside the decoded response.
    pub output_path: String,
    pub output: OutputSpec,
    #[serde(default)]
    pub dynamic_variables: Option<DynamicVariables>,
    /// Pagination dimensions, fastest-varying first.
    #[serde(default)]
    pub iterables_order: Option<Vec<IterableDimension>>,
}

impl StepDefinition {
    /// Iterable bindings declared by this step, if any.
    pub fn iterables(&self) -> Option<&IterableTargets> {
        self.dynamic_variables
            .as_ref()
            .and_then(|variables| variables.iterables.as_ref())
            .filter(|iterables| !iterables.is_empty())
    }

    /// Standard bindings declared by this step, if any.
    pub fn standard(&self) -> Option<&IndexMap<String, StandardBinding>> {
        self.dynamic_variables
            .as_ref()
            .and_then(|variables| variables.standard.as_ref())
            .filter(|standard| !standard.is_empty())
    }
}

/// Extraction and accumulation rule of a step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct OutputSpec {
    /// Projects every extracted object down to this field.
    #[serde(default)]
    pub key: Option<String>,
    /// Append to the cached sequence instead of replacing it.
    #[serde(default)]
    pub is_chain_final: bool,
    /// The cached sequence of this step becomes the parser's result.
    #[serde(default)]
    pub is_parser_final: bool,
}

/// Body encodings understood by the transport.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PayloadType {
    #[default]
    Json,
    /// `application/x-www-form-urlencoded`.
    #[serde(alias = "form")]
    Data,
}

/// Values injected into the request on every invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DynamicVariables {
    /// Target → cached step whose whole sequence is injected.
    #[serde(default)]
    pub standard: Option<IndexMap<String, StandardBinding>>,
    /// Target → field → cursor.
    #[serde(default)]
    pub iterables: Option<IterableTargets>,
}

/// A standard binding either replaces a whole target or a set of its fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StandardBinding {
    /// Replace the target with the cached sequence of the named step.
    Whole(String),
    /// Field → cached step name.
    Fields(IndexMap<String, String>),
}

/// Cursor of one iterable field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum IterableFieldSpec {
    /// Index into the cached sequence of the named step.
    Indexed(String),
    /// Plain numeric counter.
    Cursor(CursorSpec),
}

impl IterableFieldSpec {
    pub fn start(&self) -> i64 {
        match self {
            Self::Indexed(_) => 0,
            Self::Cursor(cursor) => cursor.start,
        }
    }

    pub fn increment(&self) -> i64 {
        match self {
            Self::Indexed(_) => 1,
            Self::Cursor(cursor) => cursor.increment,
        }
    }
}

/// Numeric cursor configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CursorSpec {
    #[serde(default)]
    pub start: i64,
    #[serde(default = "default_increment")]
    pub increment: i64,
}

impl Default for CursorSpec {
    fn default() -> Self {
        Self {
            start: 0,
            increment: default_increment(),
        }
    }
}

fn default_increment() -> i64 {
    1
}

/// One odometer digit: a single iterable field or a group advancing together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum IterableDimension {
    Field(String),
    Group(Vec<String>),
}

impl IterableDimension {
    /// Field names covered by this dimension.
    pub fn fields(&self) -> &[String] {
        match self {
            Self::Field(field) => std::slice::from_ref(field),
            Self::Group(fields) => fields,
        }
    }
}

/// The part of a request a binding writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestTarget {
    Url,
    Headers,
    Parameters,
    Payload,
}

impl RequestTarget {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "url" => Some(Self::Url),
            "headers" => Some(Self::Headers),
            "parameters" => Some(Self::Parameters),
            "payload" => Some(Self::Payload),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Headers => "headers",
            Self::Parameters => "parameters",
            Self::Payload => "payload",
        }
    }
}
