//! Semantic handbook checks.
//!
//! Serde already rejects missing required fields and wrong structural types.
//! These routines cover the rules that span several fields: unique names,
//! known binding targets, and well-formed pagination dimensions.

use std::collections::HashSet;

use crate::HandbookError;

use super::{Handbook, ParserDefinition, RequestTarget, StandardBinding, StepDefinition};

/// Validate every parser of a handbook.
pub fn validate_handbook(handbook: &Handbook) -> Result<(), HandbookError> {
    let mut scopes = HashSet::new();
    for (index, parser) in handbook.parsers.iter().enumerate() {
        if parser.scope.trim().is_empty() {
            return Err(HandbookError::EmptyScope { index });
        }
        if !scopes.insert(parser.scope.as_str()) {
            return Err(HandbookError::DuplicateScope {
                scope: parser.scope.clone(),
            });
        }
        validate_parser(parser)?;
    }
    Ok(())
}

fn validate_parser(parser: &ParserDefinition) -> Result<(), HandbookError> {
    let mut names = HashSet::new();
    for step in &parser.steps {
        if step.name.trim().is_empty() {
            return Err(HandbookError::EmptyStepName {
                scope: parser.scope.clone(),
            });
        }
        if !names.insert(step.name.as_str()) {
            return Err(HandbookError::DuplicateStep {
                scope: parser.scope.clone(),
                step: step.name.clone(),
            });
        }
        validate_step(&parser.scope, step)?;
    }
    Ok(())
}

fn validate_step(scope: &str, step: &StepDefinition) -> Result<(), HandbookError> {
    if !is_method_token(&step.method) {
        return Err(HandbookError::InvalidMethod {
            scope: scope.to_string(),
            step: step.name.clone(),
            method: step.method.clone(),
        });
    }

    if let Some(standard) = step.standard() {
        for (target, binding) in standard {
            let parsed = parse_target(scope, step, target)?;
            if matches!(binding, StandardBinding::Whole(_)) && parsed != RequestTarget::Payload {
                return Err(HandbookError::WholeTargetBinding {
                    scope: scope.to_string(),
                    step: step.name.clone(),
                    target: target.clone(),
                });
            }
        }
    }

    if let Some(iterables) = step.iterables() {
        for target in iterables.keys() {
            parse_target(scope, step, target)?;
        }
    }

    if let Some(order) = &step.iterables_order {
        let has_empty_dimension = order
            .iter()
            .any(|dimension| dimension.fields().is_empty() || dimension.fields().iter().any(|field| field.trim().is_empty()));
        if has_empty_dimension {
            return Err(HandbookError::EmptyDimension {
                scope: scope.to_string(),
                step: step.name.clone(),
            });
        }
    }

    Ok(())
}

fn parse_target(scope: &str, step: &StepDefinition, target: &str) -> Result<RequestTarget, HandbookError> {
    RequestTarget::parse(target).ok_or_else(|| HandbookError::UnknownTarget {
        scope: scope.to_string(),
        step: step.name.clone(),
        target: target.to_string(),
    })
}

/// HTTP methods are RFC 9110 tokens: one or more `tchar`.
fn is_method_token(method: &str) -> bool {
    !method.is_empty() && method.bytes().all(|byte| byte.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&byte))
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use crate::{Handbook, HandbookError};

    fn step(name: &str) -> Value {
        json!({
            "name": name,
            "chain_id": 1,
            "url": "https://api.example.com/items",
            "method": "GET",
            "output_path": "items",
            "output": { "is_parser_final": true }
        })
    }

    fn handbook_with(steps: Vec<Value>) -> Result<Handbook, HandbookError> {
        Handbook::from_value(json!({ "parsers": [{ "scope": "items", "steps": steps }] }))
    }

    #[test]
    fn rejects_duplicate_step_names() {
        let error = handbook_with(vec![step("list"), step("list")]).expect_err("duplicate names");
        assert!(matches!(error, HandbookError::DuplicateStep { ref step, .. } if step == "list"));
    }

    #[test]
    fn rejects_duplicate_scopes() {
        let error = Handbook::from_value(json!({
            "parsers": [
                { "scope": "items", "steps": [step("a")] },
                { "scope": "items", "steps": [step("b")] }
            ]
        }))
        .expect_err("duplicate scopes");
        assert!(matches!(error, HandbookError::DuplicateScope { .. }));
    }

    #[test]
    fn rejects_empty_scope_and_method() {
        let error = Handbook::from_value(json!({ "parsers": [{ "scope": " ", "steps": [] }] })).expect_err("empty scope");
        assert!(matches!(error, HandbookError::EmptyScope { index: 0 }));

        let mut bad_method = step("list");
        bad_method["method"] = json!("");
        let error = handbook_with(vec![bad_method]).expect_err("empty method");
        assert!(matches!(error, HandbookError::InvalidMethod { .. }));
    }

    #[test]
    fn accepts_extension_methods_and_rejects_separators() {
        let mut extension = step("discover");
        extension["method"] = json!("M-SEARCH");
        assert!(handbook_with(vec![extension]).is_ok());

        let mut spaced = step("list");
        spaced["method"] = json!("GET ME");
        let error = handbook_with(vec![spaced]).expect_err("space in method");
        assert!(matches!(error, HandbookError::InvalidMethod { .. }));
    }

    #[test]
    fn rejects_unknown_binding_targets() {
        let mut bad = step("list");
        bad["dynamic_variables"] = json!({ "iterables": { "cookies": { "page": { "start": 0 } } } });
        let error = handbook_with(vec![bad]).expect_err("unknown target");
        assert!(error.to_string().contains("cookies"), "unexpected error: {error}");
    }

    #[test]
    fn whole_standard_binding_only_allowed_for_payload() {
        let mut ok = step("list");
        ok["dynamic_variables"] = json!({ "standard": { "payload": "ids" } });
        assert!(handbook_with(vec![ok]).is_ok());

        let mut bad = step("list");
        bad["dynamic_variables"] = json!({ "standard": { "parameters": "ids" } });
        let error = handbook_with(vec![bad]).expect_err("whole parameters binding");
        assert!(matches!(error, HandbookError::WholeTargetBinding { ref target, .. } if target == "parameters"));

        let mut keyed = step("list");
        keyed["dynamic_variables"] = json!({ "standard": { "parameters": { "ids": "ids" } } });
        assert!(handbook_with(vec![keyed]).is_ok());
    }

    #[test]
    fn rejects_empty_dimension_groups() {
        let mut bad = step("list");
        bad["iterables_order"] = json!([[]]);
        let error = handbook_with(vec![bad]).expect_err("empty dimension");
        assert!(matches!(error, HandbookError::EmptyDimension { .. }));
    }

    #[test]
    fn parsers_without_steps_are_allowed() {
        let handbook = Handbook::from_value(json!({ "parsers": [] })).expect("empty handbook");
        assert!(handbook.parsers.is_empty());
    }
}
