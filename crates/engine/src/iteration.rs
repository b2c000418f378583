//! Iteration counters and the directives that move them.
//!
//! Every iterable field of a step owns one integer counter. For a cursor field
//! the counter is sent as-is (a page number, an offset). For an indexed field it
//! selects an element of another step's cached output.

use indexmap::IndexMap;
use parsify_types::{IterableDimension, IterableTargets};
use tracing::{trace, warn};

use crate::StopReason;

/// Which fields to move on the next invocation.
///
/// Empty lists behave like absent ones. With neither list every
/// already-initialized field of the step is incremented; a `reset` list on its
/// own only rewinds the named fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    pub increment: Vec<String>,
    pub reset: Vec<String>,
}

impl Directives {
    /// No directives: initialize new fields, increment the rest.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn increment<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.increment.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn reset<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reset.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Directives for odometer position `active`: advance that dimension and
    /// rewind every faster dimension below it.
    pub fn odometer(order: &[IterableDimension], active: usize) -> Self {
        let increment = order.get(active).map(|dimension| dimension.fields().to_vec()).unwrap_or_default();
        let reset = order[..active.min(order.len())]
            .iter()
            .flat_map(|dimension| dimension.fields().iter().cloned())
            .collect();
        Self { increment, reset }
    }

    fn increments(&self, field: &str) -> bool {
        if self.increment.is_empty() {
            return self.reset.is_empty();
        }
        self.increment.iter().any(|name| name == field)
    }

    fn resets(&self, field: &str) -> bool {
        self.reset.iter().any(|name| name == field)
    }
}

/// Counters keyed by request target, then field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationState {
    counters: IndexMap<String, IndexMap<String, i64>>,
}

impl IterationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, target: &str, field: &str) -> Option<i64> {
        self.counters.get(target).and_then(|fields| fields.get(field)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.values().all(IndexMap::is_empty)
    }

    /// Moves the counters of every field declared in `iterables`.
    ///
    /// A field seen for the first time starts at its `start` value and is not
    /// incremented in the same call. Otherwise a field named in
    /// `directives.reset` returns to `start`, and a field selected by
    /// `directives.increment` then advances by its `increment`. Counters for
    /// fields the step does not declare are left alone.
    ///
    /// # Errors
    /// Returns [`StopReason::CounterOverflow`] when advancing a counter would
    /// leave the `i64` range. That counter keeps its previous value.
    pub fn apply(&mut self, iterables: &IterableTargets, directives: &Directives) -> Result<(), StopReason> {
        for (target, fields) in iterables {
            let counters = self.counters.entry(target.clone()).or_default();
            for (field, spec) in fields {
                let Some(counter) = counters.get_mut(field) else {
                    counters.insert(field.clone(), spec.start());
                    trace!(request_target = %target, field = %field, value = spec.start(), "iterable initialized");
                    continue;
                };
                if directives.resets(field) {
                    *counter = spec.start();
                }
                if directives.increments(field) {
                    let Some(advanced) = counter.checked_add(spec.increment()) else {
                        warn!(request_target = %target, field = %field, value = *counter, "iterable counter overflow");
                        return Err(StopReason::CounterOverflow {
                            field: field.clone(),
                            value: *counter,
                            increment: spec.increment(),
                        });
                    };
                    *counter = advanced;
                }
                trace!(request_target = %target, field = %field, value = *counter, "iterable advanced");
            }
        }
        Ok(())
    }
}
