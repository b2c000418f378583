//! The engine facade: parser selection, scope runs and result collection.

use indexmap::IndexMap;
use parsify_types::{Handbook, ParserDefinition, StepDefinition};
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    Directives, EngineError, EngineSettings, ExtractionCache, IterationState,
    executor::{HttpTransport, StepOutcome, Transport, execute_step},
    traversal::{ChainReport, traverse_chain},
};

/// Picks a step or parser either by name or by passing the definition itself.
#[derive(Debug, Clone)]
pub enum Selector<'a, T> {
    Name(&'a str),
    Value(&'a T),
}

pub type StepSelector<'a> = Selector<'a, StepDefinition>;
pub type ParserSelector<'a> = Selector<'a, ParserDefinition>;

impl<'a> From<&'a str> for StepSelector<'a> {
    fn from(name: &'a str) -> Self {
        Selector::Name(name)
    }
}

impl<'a> From<&'a StepDefinition> for StepSelector<'a> {
    fn from(step: &'a StepDefinition) -> Self {
        Selector::Value(step)
    }
}

impl<'a> From<&'a str> for ParserSelector<'a> {
    fn from(scope: &'a str) -> Self {
        Selector::Name(scope)
    }
}

impl<'a> From<&'a ParserDefinition> for ParserSelector<'a> {
    fn from(parser: &'a ParserDefinition) -> Self {
        Selector::Value(parser)
    }
}

/// Runs the parsers of a handbook and collects one result sequence per scope.
///
/// The engine owns the extraction cache and the results map. Steps of the
/// active parser are addressed by name; the active parser starts as the first
/// parser of the handbook and changes whenever a scope is run.
pub struct Engine {
    handbook: Handbook,
    transport: Box<dyn Transport>,
    settings: EngineSettings,
    active_parser: Option<ParserDefinition>,
    cache: ExtractionCache,
    standalone_iteration: IterationState,
    results: IndexMap<String, Vec<Value>>,
}

impl Engine {
    pub fn new(handbook: Handbook, transport: impl Transport + 'static) -> Self {
        Self::with_settings(handbook, transport, EngineSettings::default())
    }

    pub fn with_settings(handbook: Handbook, transport: impl Transport + 'static, settings: EngineSettings) -> Self {
        let active_parser = handbook.parsers.first().cloned();
        if active_parser.is_none() {
            warn!("handbook declares no parsers");
        }
        Self {
            handbook,
            transport: Box::new(transport),
            settings,
            active_parser,
            cache: ExtractionCache::new(),
            standalone_iteration: IterationState::new(),
            results: IndexMap::new(),
        }
    }

    /// Builds an engine that sends requests over HTTP.
    pub fn http(handbook: Handbook, settings: EngineSettings) -> Result<Self, EngineError> {
        let transport = HttpTransport::new(&settings).map_err(|error| EngineError::TransportSetup(error.to_string()))?;
        Ok(Self::with_settings(handbook, transport, settings))
    }

    pub fn active_scope(&self) -> Option<&str> {
        self.active_parser.as_ref().map(|parser| parser.scope.as_str())
    }

    pub fn cache(&self) -> &ExtractionCache {
        &self.cache
    }

    /// Scope → result sequence, in the order scopes finished.
    pub fn results(&self) -> &IndexMap<String, Vec<Value>> {
        &self.results
    }

    /// Runs a single invocation of one step outside of chain traversal.
    ///
    /// Counters moved here persist across `run_step` calls but are never seen
    /// by chain traversals, which start from fresh counters.
    ///
    /// # Errors
    /// - [`EngineError::StepNotFound`] when a name does not match a step of the active parser
    /// - [`EngineError::NoActiveParser`] when selecting by name without an active parser
    /// - [`EngineError::UnresolvedReference`] when a binding names an uncached step
    pub fn run_step<'a>(&mut self, selector: impl Into<StepSelector<'a>>, directives: &Directives) -> Result<StepOutcome, EngineError> {
        let step = match selector.into() {
            Selector::Name(name) => {
                let parser = self.active_parser.as_ref().ok_or(EngineError::NoActiveParser)?;
                parser.step(name).ok_or_else(|| EngineError::StepNotFound {
                    scope: parser.scope.clone(),
                    step: name.to_string(),
                })?
            }
            Selector::Value(step) => step,
        };
        execute_step(
            step,
            directives,
            &mut self.standalone_iteration,
            &mut self.cache,
            self.transport.as_ref(),
        )
    }

    /// Traverses every step of `chain_id` in the active parser, then publishes
    /// the cache entries of its parser-final steps as the scope result.
    pub fn run_chain(&mut self, chain_id: i64) -> Result<ChainReport, EngineError> {
        let parser = self.active_parser.as_ref().ok_or(EngineError::NoActiveParser)?;
        let steps = parser.chain_steps(chain_id);
        if steps.is_empty() {
            return Err(EngineError::ChainNotFound {
                scope: parser.scope.clone(),
                chain_id,
            });
        }

        let report = traverse_chain(chain_id, &steps, &mut self.cache, self.transport.as_ref(), &self.settings)?;

        for step in steps.iter().filter(|step| step.output.is_parser_final) {
            let values = self.cache.get(&step.name).map(<[Value]>::to_vec).unwrap_or_default();
            self.results.insert(parser.scope.clone(), values);
        }
        Ok(report)
    }

    /// Runs every chain of a parser in ascending chain id order.
    ///
    /// `None` reuses the active parser. The extraction cache is cleared first
    /// and any earlier result for the same scope is discarded.
    ///
    /// # Errors
    /// Returns [`EngineError::MissingResult`] if no step of the parser is
    /// parser-final, plus any lookup or binding error raised on the way.
    pub fn run_scope(&mut self, selector: Option<ParserSelector<'_>>) -> Result<Vec<Value>, EngineError> {
        if let Some(selector) = selector {
            let parser = match selector {
                Selector::Name(scope) => self
                    .handbook
                    .parser(scope)
                    .cloned()
                    .ok_or_else(|| EngineError::ParserNotFound(scope.to_string()))?,
                Selector::Value(parser) => parser.clone(),
            };
            self.active_parser = Some(parser);
        }
        let parser = self.active_parser.as_ref().ok_or(EngineError::NoActiveParser)?;
        let scope = parser.scope.clone();
        let chain_ids = parser.chain_ids();

        self.cache.clear();
        self.results.shift_remove(&scope);
        info!(scope = %scope, chains = chain_ids.len(), "scope started");

        let mut invocations = 0;
        for chain_id in chain_ids {
            invocations += self.run_chain(chain_id)?.invocations;
        }

        let result = self
            .results
            .get(&scope)
            .cloned()
            .ok_or_else(|| EngineError::MissingResult { scope: scope.clone() })?;
        info!(scope = %scope, invocations, values = result.len(), "scope finished");
        Ok(result)
    }

    /// Runs every parser of the handbook in declaration order.
    pub fn run_all(&mut self) -> Result<IndexMap<String, Vec<Value>>, EngineError> {
        let scopes = self.handbook.scopes().map(str::to_string).collect::<Vec<_>>();
        for scope in &scopes {
            self.run_scope(Some(Selector::Name(scope.as_str())))?;
        }
        Ok(self.results.clone())
    }
}
