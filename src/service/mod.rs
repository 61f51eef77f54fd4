//! Service core — names, request/response values and the handler contract.
//!
//! A [`Handler`] turns a [`Request`] into a [`Response`] (or a
//! [`HandlerFault`]). Handlers live in a [`HandlerRegistry`] keyed by
//! [`ServiceName`]; the [`Dispatcher`] resolves a name and invokes the
//! handler, folding every outcome into a [`DispatchOutcome`].
//!
//! Plain functions and closures with the signature
//! `Fn(Request) -> Result<Response, HandlerFault>` are handlers already.

pub mod dispatch;
pub mod handlers;
pub mod registry;

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use dispatch::{DispatchOutcome, Dispatcher, FailureReason};
pub use registry::{DuplicateServiceError, HandlerRegistry};

// ── ServiceName ───────────────────────────────────────────────────────────────

/// Non-empty service identifier, unique within a registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceName(String);

/// Returned when a service name is empty or contains only whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid service name: {0:?}")]
pub struct InvalidServiceName(pub String);

impl ServiceName {
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidServiceName> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(InvalidServiceName(name));
        }
        Ok(Self(name))
    }

    /// Name from a compile-time constant. The constant must be non-empty.
    pub(crate) fn from_static(name: &'static str) -> Self {
        debug_assert!(!name.trim().is_empty(), "service name constant is empty");
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ServiceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ServiceName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ServiceName {
    type Error = InvalidServiceName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ServiceName {
    type Error = InvalidServiceName;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ServiceName> for String {
    fn from(name: ServiceName) -> Self {
        name.0
    }
}

// ── Request / Response ────────────────────────────────────────────────────────

/// Request value handed to a handler. Owned by the caller, moved into the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Two 64-bit operands for `add_two_ints`.
    TwoInts { a: i64, b: i64 },
    /// No arguments.
    Empty,
}

/// Value carried by [`Response::Value`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Sum { sum: i64 },
}

/// What a handler produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Value(Payload),
    Empty,
    /// The handler declines to answer this request.
    Rejected,
}

// ── Handler ───────────────────────────────────────────────────────────────────

/// Unrecoverable failure raised by a handler while computing a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerFault {
    #[error("integer overflow computing {a} + {b}")]
    Overflow { a: i64, b: i64 },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Other(String),
}

/// A service handler. Must not block indefinitely; it runs on the
/// dispatching thread.
pub trait Handler: Send + Sync {
    fn call(&self, request: Request) -> Result<Response, HandlerFault>;
}

impl<F> Handler for F
where
    F: Fn(Request) -> Result<Response, HandlerFault> + Send + Sync,
{
    fn call(&self, request: Request) -> Result<Response, HandlerFault> {
        self(request)
    }
}

/// Shared, read-only handle to a registered handler.
pub type SharedHandler = Arc<dyn Handler>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_rejected() {
        assert!(ServiceName::new("").is_err());
        assert!(ServiceName::new("   ").is_err());
    }

    #[test]
    fn name_round_trips_as_str() {
        let name = ServiceName::new("add_two_ints").unwrap();
        assert_eq!(name.as_str(), "add_two_ints");
        assert_eq!(name.to_string(), "add_two_ints");
        assert_eq!(String::from(name), "add_two_ints");
    }

    #[test]
    fn name_deserialize_validates() {
        let ok: ServiceName = serde_json::from_str(r#""empty_srv""#).unwrap();
        assert_eq!(ok.as_str(), "empty_srv");
        assert!(serde_json::from_str::<ServiceName>(r#""""#).is_err());
    }

    #[test]
    fn closures_are_handlers() {
        let h = |_: Request| -> Result<Response, HandlerFault> { Ok(Response::Empty) };
        assert_eq!(Handler::call(&h, Request::Empty), Ok(Response::Empty));
    }

    #[test]
    fn sum_payload_serialises_flat() {
        let json = serde_json::to_value(Payload::Sum { sum: 7 }).unwrap();
        assert_eq!(json, serde_json::json!({ "sum": 7 }));
    }
}
