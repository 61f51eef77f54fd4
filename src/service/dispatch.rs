//! Dispatcher — resolve a service name and invoke its handler.
//!
//! Every handler outcome is folded into a [`DispatchOutcome`]; a handler
//! fault or panic never escapes as an error, so the caller (and the process
//! behind it) keeps running after a bad request.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::{HandlerFault, HandlerRegistry, Request, Response};

/// Why a dispatch produced no response.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    #[error("integer overflow")]
    Overflow,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("handler timed out")]
    Timeout,

    #[error("handler fault: {0}")]
    Fault(String),
}

impl From<HandlerFault> for FailureReason {
    fn from(fault: HandlerFault) -> Self {
        match fault {
            HandlerFault::Overflow { .. } => FailureReason::Overflow,
            HandlerFault::BadRequest(detail) => FailureReason::BadRequest(detail),
            HandlerFault::Other(detail) => FailureReason::Fault(detail),
        }
    }
}

/// Result of a single dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchOutcome {
    /// The handler answered with a value or an empty response.
    Responded(Response),
    /// The handler chose not to answer.
    Declined,
    /// No handler is registered under the requested name.
    NotFound,
    /// The handler faulted while computing a response.
    HandlerFailed(FailureReason),
}

/// Synchronous request-to-handler dispatcher.
#[derive(Debug, Default, Clone, Copy)]
pub struct Dispatcher;

impl Dispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Look up `name` in `registry` and run its handler on `request`.
    pub fn dispatch(
        &self,
        registry: &HandlerRegistry,
        name: &str,
        request: Request,
    ) -> DispatchOutcome {
        let Some(handler) = registry.lookup(name) else {
            warn!(service = %name, "no handler registered for service");
            return DispatchOutcome::NotFound;
        };

        debug!(service = %name, "dispatching request");

        match panic::catch_unwind(AssertUnwindSafe(|| handler.call(request))) {
            Ok(Ok(Response::Rejected)) => {
                debug!(service = %name, "handler declined request");
                DispatchOutcome::Declined
            }
            Ok(Ok(response)) => DispatchOutcome::Responded(response),
            Ok(Err(fault)) => {
                warn!(service = %name, error = %fault, "handler failed");
                DispatchOutcome::HandlerFailed(fault.into())
            }
            Err(payload) => {
                let detail = panic_message(&*payload);
                warn!(service = %name, panic = %detail, "handler panicked");
                DispatchOutcome::HandlerFailed(FailureReason::Panicked(detail))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{Payload, ServiceName};

    fn registry_with(name: &str, handler: impl crate::service::Handler + 'static) -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        registry.register(ServiceName::new(name).unwrap(), handler).unwrap();
        registry
    }

    #[test]
    fn value_response_is_responded() {
        let registry = registry_with("seven", |_: Request| -> Result<Response, HandlerFault> {
            Ok(Response::Value(Payload::Sum { sum: 7 }))
        });
        assert_eq!(
            Dispatcher::new().dispatch(&registry, "seven", Request::Empty),
            DispatchOutcome::Responded(Response::Value(Payload::Sum { sum: 7 }))
        );
    }

    #[test]
    fn rejected_response_is_declined() {
        let registry = registry_with("no", |_: Request| -> Result<Response, HandlerFault> {
            Ok(Response::Rejected)
        });
        assert_eq!(
            Dispatcher::new().dispatch(&registry, "no", Request::Empty),
            DispatchOutcome::Declined
        );
    }

    #[test]
    fn unknown_name_is_not_found() {
        let registry = HandlerRegistry::new();
        assert_eq!(
            Dispatcher::new().dispatch(&registry, "bogus", Request::Empty),
            DispatchOutcome::NotFound
        );
        assert_eq!(
            Dispatcher::new().dispatch(&registry, "", Request::Empty),
            DispatchOutcome::NotFound
        );
    }

    #[test]
    fn fault_becomes_handler_failed() {
        let registry = registry_with("bad", |_: Request| -> Result<Response, HandlerFault> {
            Err(HandlerFault::Other("disk on fire".into()))
        });
        assert_eq!(
            Dispatcher::new().dispatch(&registry, "bad", Request::Empty),
            DispatchOutcome::HandlerFailed(FailureReason::Fault("disk on fire".into()))
        );
    }

    #[test]
    fn panic_is_contained() {
        let registry = registry_with("boom", |_: Request| -> Result<Response, HandlerFault> {
            panic!("kaboom")
        });
        let outcome = Dispatcher::new().dispatch(&registry, "boom", Request::Empty);
        assert_eq!(
            outcome,
            DispatchOutcome::HandlerFailed(FailureReason::Panicked("kaboom".into()))
        );

        // Registry still usable afterwards.
        assert!(registry.lookup("boom").is_some());
    }

    #[test]
    fn overflow_fault_maps_to_overflow_reason() {
        let reason: FailureReason = HandlerFault::Overflow { a: i64::MAX, b: 1 }.into();
        assert_eq!(reason, FailureReason::Overflow);
    }
}
