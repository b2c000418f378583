//! Odometer traversal of one chain.
//!
//! The chain's `iterables_order` lists its dimensions, fastest first. Steps
//! run in order and wrap around for as long as they produce data. When a step
//! stops, the traversal restarts at the first step and advances the next
//! slower dimension while resetting the faster ones, exactly like the digits
//! of an odometer. Once every dimension has been exhausted in a row the chain
//! is done.

use parsify_types::{IterableDimension, StepDefinition};
use tracing::{debug, info, warn};

use crate::{
    Directives, EngineError, EngineSettings, ExtractionCache, IterationState,
    executor::{StepOutcome, Transport, execute_step},
};

/// Counters describing one chain traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainReport {
    pub chain_id: i64,
    pub invocations: u32,
    pub data_hits: u32,
    pub stops: u32,
    /// The traversal ended because `max_invocations_per_chain` was reached.
    pub guard_tripped: bool,
}

impl ChainReport {
    fn new(chain_id: i64) -> Self {
        Self {
            chain_id,
            ..Self::default()
        }
    }

    fn record(&mut self, outcome: &StepOutcome) {
        self.invocations += 1;
        if outcome.is_data() {
            self.data_hits += 1;
        } else {
            self.stops += 1;
        }
    }

    fn guard_reached(&mut self, limit: Option<u32>) -> bool {
        match limit {
            Some(limit) if self.invocations >= limit => {
                warn!(
                    chain_id = self.chain_id,
                    invocations = self.invocations,
                    limit,
                    "chain invocation limit reached"
                );
                self.guard_tripped = true;
                true
            }
            _ => false,
        }
    }
}

/// Runs every step of a chain to exhaustion.
///
/// Iteration counters start fresh for each traversal. Without an
/// `iterables_order` the chain gets one linear pass in which stops are
/// recorded but do not end the pass.
pub(crate) fn traverse_chain(
    chain_id: i64,
    steps: &[&StepDefinition],
    cache: &mut ExtractionCache,
    transport: &dyn Transport,
    settings: &EngineSettings,
) -> Result<ChainReport, EngineError> {
    let mut iteration = IterationState::new();
    let mut report = ChainReport::new(chain_id);
    let order = steps
        .iter()
        .find_map(|step| step.iterables_order.as_deref())
        .filter(|order| !order.is_empty());

    match order {
        None => {
            debug!(chain_id, steps = steps.len(), "linear chain pass");
            for step in steps {
                if report.guard_reached(settings.max_invocations_per_chain) {
                    break;
                }
                let outcome = execute_step(step, &Directives::none(), &mut iteration, cache, transport)?;
                report.record(&outcome);
            }
        }
        Some(order) => {
            debug!(chain_id, steps = steps.len(), dimensions = order.len(), "odometer chain traversal");
            run_odometer(steps, order, &mut iteration, cache, transport, settings, &mut report)?;
        }
    }

    info!(
        chain_id,
        invocations = report.invocations,
        data_hits = report.data_hits,
        stops = report.stops,
        guard_tripped = report.guard_tripped,
        "chain finished"
    );
    Ok(report)
}

fn run_odometer(
    steps: &[&StepDefinition],
    order: &[IterableDimension],
    iteration: &mut IterationState,
    cache: &mut ExtractionCache,
    transport: &dyn Transport,
    settings: &EngineSettings,
    report: &mut ChainReport,
) -> Result<(), EngineError> {
    let mut step_index = 0;
    let mut dimension = 0;
    let mut directives = Directives::none();

    while dimension < order.len() {
        if report.guard_reached(settings.max_invocations_per_chain) {
            break;
        }
        let outcome = execute_step(steps[step_index], &directives, iteration, cache, transport)?;
        report.record(&outcome);

        if outcome.is_data() {
            dimension = 0;
            step_index = (step_index + 1) % steps.len();
        } else {
            step_index = 0;
            dimension += 1;
        }
        directives = Directives::odometer(order, dimension);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedTransport, query_i64};
    use serde_json::{Value, json};

    fn step(value: Value) -> StepDefinition {
        serde_json::from_value(value).expect("step definition")
    }

    fn traverse(steps: &[StepDefinition], transport: &ScriptedTransport, settings: &EngineSettings) -> (ChainReport, ExtractionCache) {
        let mut cache = ExtractionCache::new();
        let steps = steps.iter().collect::<Vec<_>>();
        let report = traverse_chain(1, &steps, &mut cache, transport, settings).expect("traversal");
        (report, cache)
    }

    fn paged_step() -> StepDefinition {
        step(json!({
            "name": "pages",
            "chain_id": 1,
            "url": "https://api.example.com/items",
            "method": "GET",
            "output_path": "items",
            "output": {"is_chain_final": true, "is_parser_final": true},
            "dynamic_variables": {"iterables": {"parameters": {"page": {"start": 0, "increment": 1}}}},
            "iterables_order": ["page"]
        }))
    }

    #[test]
    fn single_dimension_stops_after_first_empty_page() {
        let transport = ScriptedTransport::new(|request| {
            let page = query_i64(request, "page").unwrap_or_default();
            let items = if page < 5 { json!([page * 10, page * 10 + 1]) } else { json!([]) };
            Ok(json!({ "items": items }))
        });

        let (report, cache) = traverse(&[paged_step()], &transport, &EngineSettings::default());

        let pages = transport.calls().iter().filter_map(|request| query_i64(request, "page")).collect::<Vec<_>>();
        assert_eq!(pages, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(report.invocations, 6);
        assert_eq!(report.data_hits, 5);
        assert_eq!(report.stops, 1);
        let expected = (0..5).flat_map(|page| [json!(page * 10), json!(page * 10 + 1)]).collect::<Vec<_>>();
        assert_eq!(cache.get("pages"), Some(expected.as_slice()));
    }

    fn category_pages_transport(pages_per_category: &'static [i64]) -> ScriptedTransport {
        ScriptedTransport::new(move |request| {
            let category = query_i64(request, "category").unwrap_or_default();
            let page = query_i64(request, "page").unwrap_or_default();
            let available = usize::try_from(category)
                .ok()
                .and_then(|index| pages_per_category.get(index))
                .copied()
                .unwrap_or_default();
            let items = if page < available { json!([format!("c{category}p{page}")]) } else { json!([]) };
            Ok(json!({ "items": items }))
        })
    }

    fn category_step() -> StepDefinition {
        step(json!({
            "name": "listing",
            "chain_id": 1,
            "url": "https://api.example.com/items",
            "method": "GET",
            "output_path": "items",
            "output": {"is_chain_final": true, "is_parser_final": true},
            "dynamic_variables": {"iterables": {"parameters": {"page": {}, "category": {}}}},
            "iterables_order": ["page", "category"]
        }))
    }

    fn visited(transport: &ScriptedTransport) -> Vec<(i64, i64)> {
        transport
            .calls()
            .iter()
            .map(|request| (query_i64(request, "category").unwrap_or(-1), query_i64(request, "page").unwrap_or(-1)))
            .collect()
    }

    #[test]
    fn odometer_carries_into_the_slower_dimension() {
        let transport = category_pages_transport(&[2, 1, 3]);

        let (report, cache) = traverse(&[category_step()], &transport, &EngineSettings::default());

        assert_eq!(
            visited(&transport),
            vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (2, 0), (2, 1), (2, 2), (2, 3), (3, 0)]
        );
        assert_eq!(
            cache.get("listing"),
            Some(&[json!("c0p0"), json!("c0p1"), json!("c1p0"), json!("c2p0"), json!("c2p1"), json!("c2p2")][..])
        );
        assert_eq!(report.data_hits, 6);
        assert_eq!(report.stops, 4);
        assert!(!report.guard_tripped);
    }

    #[test]
    fn empty_slower_dimension_value_ends_the_traversal() {
        let transport = category_pages_transport(&[2, 0, 1]);

        traverse(&[category_step()], &transport, &EngineSettings::default());

        assert_eq!(visited(&transport), vec![(0, 0), (0, 1), (0, 2), (1, 0)]);
    }

    #[test]
    fn invocation_guard_bounds_an_endless_api() {
        let transport = ScriptedTransport::always(json!({"items": [1]}));
        let settings = EngineSettings {
            max_invocations_per_chain: Some(3),
            ..EngineSettings::default()
        };

        let (report, cache) = traverse(&[paged_step()], &transport, &settings);

        assert!(report.guard_tripped);
        assert_eq!(transport.call_count(), 3);
        assert_eq!(cache.get("pages").map(<[Value]>::len), Some(3));
    }

    #[test]
    fn linear_pass_runs_every_step_once_even_after_a_stop() {
        let first = step(json!({
            "name": "broken",
            "chain_id": 1,
            "url": "https://api.example.com/broken",
            "method": "GET",
            "output_path": "missing",
            "output": {}
        }));
        let second = step(json!({
            "name": "status",
            "chain_id": 1,
            "url": "https://api.example.com/status",
            "method": "GET",
            "output_path": "",
            "output": {"is_parser_final": true}
        }));
        let transport = ScriptedTransport::always(json!({"ok": true}));

        let (report, cache) = traverse(&[first, second], &transport, &EngineSettings::default());

        assert_eq!(report.invocations, 2);
        assert_eq!(report.stops, 1);
        assert_eq!(cache.get("broken"), None);
        assert_eq!(cache.get("status"), Some(&[json!({"ok": true})][..]));
    }
}
