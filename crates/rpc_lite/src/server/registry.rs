use bytes::Bytes;
use prost::Message;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{DispatchError, RpcServerError};
use crate::server::handler::Operation;
use crate::wire::{CallRequest, CallResponse, Fault};

/// Maps operation names to their handlers.
///
/// Filled before the server starts and only read afterwards.
#[derive(Default)]
pub struct OperationRegistry {
    operations: HashMap<String, Arc<dyn Operation>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation under `name`. Names are unique.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        operation: impl Operation + 'static,
    ) -> Result<(), RpcServerError> {
        match self.operations.entry(name.into()) {
            Entry::Occupied(entry) => Err(RpcServerError::DuplicateOperation(entry.key().clone())),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(operation));
                Ok(())
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Registered operation names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Decode one request frame and answer it.
    pub fn handle_frame(&self, frame: Bytes) -> CallResponse {
        match CallRequest::decode(frame) {
            Ok(request) => self.dispatch(&request),
            Err(e) => {
                let err = DispatchError::Malformed(e.to_string());
                warn!(fault = %err, "Rejected undecodable request");
                CallResponse::fault(Fault::from(err))
            }
        }
    }

    /// Run a decoded request and turn the outcome into a response.
    ///
    /// This is the only place handler errors become faults.
    pub fn dispatch(&self, request: &CallRequest) -> CallResponse {
        match self.invoke(request) {
            Ok(result) => {
                info!(
                    operation = %request.operation,
                    arguments = ?request.arguments,
                    result,
                    "Handled call"
                );
                CallResponse::result(result)
            }
            Err(err) => {
                warn!(
                    operation = %request.operation,
                    arguments = ?request.arguments,
                    code = %err.code(),
                    fault = %err,
                    "Call failed"
                );
                CallResponse::fault(Fault::from(err))
            }
        }
    }

    fn invoke(&self, request: &CallRequest) -> Result<f64, DispatchError> {
        if request.operation.is_empty() {
            return Err(DispatchError::Malformed("missing operation name".to_string()));
        }

        let operation = self
            .operations
            .get(&request.operation)
            .ok_or_else(|| DispatchError::UnknownOperation(request.operation.clone()))?;

        let expected = operation.arity();
        if request.arguments.len() != expected {
            return Err(DispatchError::ArityMismatch {
                operation: request.operation.clone(),
                expected,
                actual: request.arguments.len(),
            });
        }

        // Handlers must not take the serving loop down with them
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| operation.invoke(&request.arguments)))
            .map_err(|_| DispatchError::HandlerPanic(request.operation.clone()))?;

        Ok(outcome?)
    }
}
