//! Reply envelope — how a transport reports a call outcome.
//!
//! Serialises as `{"ok": <value>}` (`{"ok": null}` for an empty response),
//! `"no_answer"` for a declined request, or `{"err": {"code", "message"}}`.

use serde::{Deserialize, Serialize};

use crate::service::{DispatchOutcome, Payload, Response};

use super::ProcessError;
use super::bus::{CallError, CallResult};

pub const ERR_SERVICE_UNAVAILABLE: &str = "service_unavailable";
pub const ERR_SERVICE_ERROR: &str = "service_error";
pub const ERR_NOT_RUNNING: &str = "not_running";
pub const ERR_TERMINATED: &str = "terminated";
pub const ERR_TRANSPORT: &str = "transport";
pub const ERR_BAD_REQUEST: &str = "bad_request";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireError {
    pub code: String,
    pub message: String,
}

impl WireError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self { code: code.to_string(), message: message.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyEnvelope {
    Ok(Option<Payload>),
    NoAnswer,
    Err(WireError),
}

impl ReplyEnvelope {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ReplyEnvelope::Err(WireError::new(code, message))
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ReplyEnvelope::Ok(_))
    }

    /// Envelope for the outcome of a call to `service`.
    pub fn from_outcome(service: &str, outcome: DispatchOutcome) -> Self {
        match outcome {
            DispatchOutcome::Responded(Response::Value(payload)) => ReplyEnvelope::Ok(Some(payload)),
            DispatchOutcome::Responded(Response::Empty) => ReplyEnvelope::Ok(None),
            // Dispatcher folds Rejected into Declined; treat a stray one the same way.
            DispatchOutcome::Responded(Response::Rejected) | DispatchOutcome::Declined => {
                ReplyEnvelope::NoAnswer
            }
            DispatchOutcome::NotFound => ReplyEnvelope::error(
                ERR_SERVICE_UNAVAILABLE,
                format!("service not found: {service}"),
            ),
            DispatchOutcome::HandlerFailed(reason) => ReplyEnvelope::error(
                ERR_SERVICE_ERROR,
                format!("service {service} failed: {reason}"),
            ),
        }
    }

    pub fn from_call(service: &str, result: Result<CallResult, CallError>) -> Self {
        match result {
            Ok(Ok(outcome)) => Self::from_outcome(service, outcome),
            Ok(Err(e @ ProcessError::NotRunning)) => ReplyEnvelope::error(ERR_NOT_RUNNING, e.to_string()),
            Ok(Err(e @ ProcessError::Terminated)) => ReplyEnvelope::error(ERR_TERMINATED, e.to_string()),
            Err(e) => ReplyEnvelope::error(ERR_TRANSPORT, e.to_string()),
        }
    }
}
