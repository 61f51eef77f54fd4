//! Service bus — the queue between transport adapters and the run loop.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::service::{DispatchOutcome, Request};

use super::ProcessError;

/// What the run loop sends back for one call.
pub type CallResult = Result<DispatchOutcome, ProcessError>;

/// A decoded request from a transport, with a reply slot for the outcome.
#[derive(Debug)]
pub struct ServiceCall {
    /// Correlation id for logs.
    pub id: Uuid,
    pub service: String,
    pub request: Request,
    pub reply_tx: oneshot::Sender<CallResult>,
}

/// Owns the run-loop side of the queue plus one handle.
pub struct ServiceBus {
    pub rx: mpsc::Receiver<ServiceCall>,
    pub handle: ServiceHandle,
}

impl ServiceBus {
    pub fn new(buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer);
        Self { rx, handle: ServiceHandle::new(tx) }
    }

    /// Another handle for a transport adapter.
    pub fn handle(&self) -> ServiceHandle {
        self.handle.clone()
    }
}

/// Call-level transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("call send failed: run loop is not running")]
    Send,

    #[error("call recv failed: run loop dropped the reply sender")]
    Recv,

    #[error("call queue full")]
    Full,
}

/// Client-facing handle used by transports to submit calls.
#[derive(Clone, Debug)]
pub struct ServiceHandle {
    tx: mpsc::Sender<ServiceCall>,
}

impl ServiceHandle {
    pub fn new(tx: mpsc::Sender<ServiceCall>) -> Self {
        Self { tx }
    }

    /// Submit a call and wait for its outcome.
    pub async fn call(
        &self,
        service: impl Into<String>,
        request: Request,
    ) -> Result<CallResult, CallError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ServiceCall { id: Uuid::new_v4(), service: service.into(), request, reply_tx })
            .await
            .map_err(|_| CallError::Send)?;

        reply_rx.await.map_err(|_| CallError::Recv)
    }

    /// Submit a call without waiting for queue space.
    ///
    /// Returns the receiver for the outcome.
    pub fn try_call(
        &self,
        service: impl Into<String>,
        request: Request,
    ) -> Result<oneshot::Receiver<CallResult>, CallError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .try_send(ServiceCall { id: Uuid::new_v4(), service: service.into(), request, reply_tx })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => CallError::Full,
                mpsc::error::TrySendError::Closed(_) => CallError::Send,
            })?;
        Ok(reply_rx)
    }
}
