//! Binds cached outputs and iteration counters into a step's request.
//!
//! Each invocation starts from a fresh [`PreparedRequest`] copied out of the
//! step template, so nothing written here survives into the next call.
//! Standard bindings are applied first, iterables second, which lets an
//! iterable field override a standard one on the same target.

use parsify_types::{IterableFieldSpec, PreparedRequest, RequestTarget, StandardBinding, StepDefinition};
use parsify_util::http::fill_url_placeholders;
use serde_json::{Map, Value};

use super::StopReason;
use crate::{EngineError, ExtractionCache, IterationState};

/// Result of binding a step for one invocation.
#[derive(Debug)]
pub(crate) enum Binding {
    Ready(PreparedRequest),
    Exhausted(StopReason),
}

enum BindFailure {
    Stop(StopReason),
    Fatal(EngineError),
}

impl From<StopReason> for BindFailure {
    fn from(reason: StopReason) -> Self {
        Self::Stop(reason)
    }
}

impl From<EngineError> for BindFailure {
    fn from(error: EngineError) -> Self {
        Self::Fatal(error)
    }
}

/// Produces the request for the current iteration of `step`.
///
/// # Errors
/// Returns [`EngineError::UnresolvedReference`] when a binding names a step
/// with no cached output. An index past the end of a cached sequence is not an
/// error; it yields [`Binding::Exhausted`].
pub(crate) fn bind_request(step: &StepDefinition, iteration: &IterationState, cache: &ExtractionCache) -> Result<Binding, EngineError> {
    match resolve_request(step, iteration, cache) {
        Ok(request) => Ok(Binding::Ready(request)),
        Err(BindFailure::Stop(reason)) => Ok(Binding::Exhausted(reason)),
        Err(BindFailure::Fatal(error)) => Err(error),
    }
}

fn resolve_request(step: &StepDefinition, iteration: &IterationState, cache: &ExtractionCache) -> Result<PreparedRequest, BindFailure> {
    let mut request = PreparedRequest::from_step(step);
    let mut url_variables = Map::new();

    if let Some(standard) = step.standard() {
        for (target_name, binding) in standard {
            let target = parse_target(target_name)?;
            match binding {
                StandardBinding::Whole(reference) => {
                    let value = Value::Array(cached_sequence(cache, step, reference)?.to_vec());
                    assign_whole(&mut request, target, value)?;
                }
                StandardBinding::Fields(fields) => {
                    for (field, reference) in fields {
                        let value = Value::Array(cached_sequence(cache, step, reference)?.to_vec());
                        assign_field(&mut request, &mut url_variables, target, field, value)?;
                    }
                }
            }
        }
    }

    if let Some(iterables) = step.iterables() {
        for (target_name, fields) in iterables {
            let target = parse_target(target_name)?;
            for (field, spec) in fields {
                let counter = iteration.counter(target_name, field).unwrap_or_else(|| spec.start());
                let value = match spec {
                    IterableFieldSpec::Cursor(_) => Value::from(counter),
                    IterableFieldSpec::Indexed(reference) => {
                        let sequence = cached_sequence(cache, step, reference)?;
                        let element = usize::try_from(counter).ok().and_then(|index| sequence.get(index));
                        match element {
                            Some(element) => element.clone(),
                            None => {
                                return Err(StopReason::IndexOutOfRange {
                                    field: field.clone(),
                                    reference: reference.clone(),
                                    index: counter,
                                    available: sequence.len(),
                                }
                                .into());
                            }
                        }
                    }
                };
                assign_field(&mut request, &mut url_variables, target, field, value)?;
            }
        }
    }

    if !url_variables.is_empty() {
        request.url = fill_url_placeholders(&request.url, &url_variables);
    }
    Ok(request)
}

fn parse_target(raw: &str) -> Result<RequestTarget, StopReason> {
    RequestTarget::parse(raw).ok_or_else(|| StopReason::Binding(format!("unknown binding target '{raw}'")))
}

fn cached_sequence<'a>(cache: &'a ExtractionCache, step: &StepDefinition, reference: &str) -> Result<&'a [Value], EngineError> {
    cache.get(reference).ok_or_else(|| EngineError::UnresolvedReference {
        step: step.name.clone(),
        reference: reference.to_string(),
    })
}

fn assign_whole(request: &mut PreparedRequest, target: RequestTarget, value: Value) -> Result<(), StopReason> {
    match target {
        RequestTarget::Payload => {
            request.body = Some(value);
            Ok(())
        }
        other => Err(StopReason::Binding(format!(
            "only the payload can be replaced as a whole, not '{}'",
            other.as_str()
        ))),
    }
}

fn assign_field(
    request: &mut PreparedRequest,
    url_variables: &mut Map<String, Value>,
    target: RequestTarget,
    field: &str,
    value: Value,
) -> Result<(), StopReason> {
    match target {
        RequestTarget::Url => {
            url_variables.insert(field.to_string(), value);
        }
        RequestTarget::Headers => {
            request.headers.insert(field.to_string(), value);
        }
        RequestTarget::Parameters => {
            request.query.insert(field.to_string(), value);
        }
        RequestTarget::Payload => match request.body.get_or_insert_with(|| Value::Object(Map::new())) {
            Value::Object(body) => {
                body.insert(field.to_string(), value);
            }
            _ => {
                return Err(StopReason::Binding(format!("payload is not an object; cannot bind field '{field}'")));
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step(value: Value) -> StepDefinition {
        serde_json::from_value(value).expect("step definition")
    }

    fn ready(binding: Binding) -> PreparedRequest {
        match binding {
            Binding::Ready(request) => request,
            Binding::Exhausted(reason) => panic!("expected a bound request, got stop: {reason}"),
        }
    }

    #[test]
    fn binds_standard_fields_and_iterables_into_their_targets() {
        let step = step(json!({
            "name": "products",
            "chain_id": 2,
            "url": "https://shop.example.com/c/{category}",
            "method": "get",
            "headers": {"Accept-Language": "en"},
            "parameters": {"per_page": 50},
            "output_path": "items",
            "output": {},
            "dynamic_variables": {
                "standard": {"headers": {"X-Session": "session"}},
                "iterables": {
                    "url": {"category": "categories"},
                    "parameters": {"page": {"start": 1}}
                }
            }
        }));
        let mut cache = ExtractionCache::new();
        cache.merge("categories", vec![json!("books"), json!("home & garden")], false);
        cache.merge("session", vec![json!("abc")], false);
        let mut iteration = IterationState::new();
        iteration.apply(step.iterables().expect("iterables"), &crate::Directives::none()).expect("apply");
        iteration.apply(step.iterables().expect("iterables"), &crate::Directives::none().increment(["category"])).expect("apply");

        let request = ready(bind_request(&step, &iteration, &cache).expect("bind"));

        assert_eq!(request.method, "GET");
        assert_eq!(request.url, "https://shop.example.com/c/home%20%26%20garden");
        assert_eq!(request.query.get("page"), Some(&json!(1)));
        assert_eq!(request.query.get("per_page"), Some(&json!(50)));
        assert_eq!(request.headers.get("X-Session"), Some(&json!(["abc"])));
        assert_eq!(request.headers.get("Accept-Language"), Some(&json!("en")));
    }

    #[test]
    fn whole_payload_binding_replaces_the_body() {
        let step = step(json!({
            "name": "details",
            "chain_id": 2,
            "url": "https://api.example.com/details",
            "method": "POST",
            "payload": {"ignored": true},
            "output_path": "",
            "output": {},
            "dynamic_variables": {"standard": {"payload": "ids"}}
        }));
        let mut cache = ExtractionCache::new();
        cache.merge("ids", vec![json!(1), json!(2)], false);

        let request = ready(bind_request(&step, &IterationState::new(), &cache).expect("bind"));

        assert_eq!(request.body, Some(json!([1, 2])));
    }

    #[test]
    fn payload_fields_create_an_object_body_when_absent() {
        let step = step(json!({
            "name": "search",
            "chain_id": 1,
            "url": "https://api.example.com/search",
            "method": "POST",
            "output_path": "",
            "output": {},
            "dynamic_variables": {"iterables": {"payload": {"offset": {"start": 0, "increment": 20}}}}
        }));
        let mut iteration = IterationState::new();
        iteration.apply(step.iterables().expect("iterables"), &crate::Directives::none()).expect("apply");
        iteration.apply(step.iterables().expect("iterables"), &crate::Directives::none()).expect("apply");

        let request = ready(bind_request(&step, &iteration, &ExtractionCache::new()).expect("bind"));

        assert_eq!(request.body, Some(json!({"offset": 20})));
    }

    #[test]
    fn keyed_binding_into_a_non_object_payload_stops() {
        let step = step(json!({
            "name": "search",
            "chain_id": 1,
            "url": "https://api.example.com/search",
            "method": "POST",
            "payload": ["fixed"],
            "output_path": "",
            "output": {},
            "dynamic_variables": {"iterables": {"payload": {"offset": {"start": 0}}}}
        }));

        let binding = bind_request(&step, &IterationState::new(), &ExtractionCache::new()).expect("bind");

        assert!(matches!(binding, Binding::Exhausted(StopReason::Binding(_))));
    }

    #[test]
    fn index_past_the_cached_sequence_is_a_stop() {
        let step = step(json!({
            "name": "products",
            "chain_id": 2,
            "url": "https://shop.example.com/products",
            "method": "GET",
            "output_path": "",
            "output": {},
            "dynamic_variables": {"iterables": {"parameters": {"category": "categories"}}}
        }));
        let mut cache = ExtractionCache::new();
        cache.merge("categories", vec![json!("books")], false);
        let mut iteration = IterationState::new();
        iteration.apply(step.iterables().expect("iterables"), &crate::Directives::none()).expect("apply");
        iteration.apply(step.iterables().expect("iterables"), &crate::Directives::none()).expect("apply");

        let binding = bind_request(&step, &iteration, &cache).expect("bind");

        assert!(matches!(
            binding,
            Binding::Exhausted(StopReason::IndexOutOfRange { index: 1, available: 1, .. })
        ));
    }

    #[test]
    fn missing_cache_entry_is_fatal() {
        let step = step(json!({
            "name": "products",
            "chain_id": 2,
            "url": "https://shop.example.com/products",
            "method": "GET",
            "output_path": "",
            "output": {},
            "dynamic_variables": {"standard": {"parameters": {"ids": "never_ran"}}}
        }));

        let error = bind_request(&step, &IterationState::new(), &ExtractionCache::new()).expect_err("unresolved");

        assert!(matches!(error, EngineError::UnresolvedReference { ref reference, .. } if reference == "never_ran"));
    }

    #[test]
    fn binding_never_mutates_the_step_template() {
        let step = step(json!({
            "name": "search",
            "chain_id": 1,
            "url": "https://api.example.com/search",
            "method": "GET",
            "parameters": {"q": "rust"},
            "output_path": "",
            "output": {},
            "dynamic_variables": {"iterables": {"parameters": {"page": {"start": 3}}}}
        }));
        let before = step.clone();
        let mut iteration = IterationState::new();
        iteration.apply(step.iterables().expect("iterables"), &crate::Directives::none()).expect("apply");

        let request = ready(bind_request(&step, &iteration, &ExtractionCache::new()).expect("bind"));

        assert_eq!(request.query.get("page"), Some(&json!(3)));
        assert_eq!(step, before);
    }
}
