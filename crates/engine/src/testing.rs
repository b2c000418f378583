//! In-memory transports for unit tests.

use std::{cell::RefCell, rc::Rc};

use parsify_types::PreparedRequest;
use parsify_util::http::HttpExecError;
use serde_json::Value;

use crate::Transport;

type Responder = dyn Fn(&PreparedRequest) -> Result<Value, HttpExecError>;

/// Answers requests from a closure and records every request it saw.
///
/// Clones share the call log, so a test can keep one handle after moving
/// another into an engine.
#[derive(Clone)]
pub(crate) struct ScriptedTransport {
    responder: Rc<Responder>,
    calls: Rc<RefCell<Vec<PreparedRequest>>>,
}

impl ScriptedTransport {
    pub(crate) fn new(responder: impl Fn(&PreparedRequest) -> Result<Value, HttpExecError> + 'static) -> Self {
        Self {
            responder: Rc::new(responder),
            calls: Rc::default(),
        }
    }

    pub(crate) fn always(response: Value) -> Self {
        Self::new(move |_| Ok(response.clone()))
    }

    pub(crate) fn calls(&self) -> Vec<PreparedRequest> {
        self.calls.borrow().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &PreparedRequest) -> Result<Value, HttpExecError> {
        self.calls.borrow_mut().push(request.clone());
        (self.responder)(request)
    }
}

pub(crate) fn status_error(status: u16) -> HttpExecError {
    HttpExecError::Status {
        status,
        body_preview: String::new(),
    }
}

/// Integer query parameter of a recorded request.
pub(crate) fn query_i64(request: &PreparedRequest, name: &str) -> Option<i64> {
    request.query.get(name).and_then(Value::as_i64)
}
