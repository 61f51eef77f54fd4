//! Run loop — receive calls from the bus and dispatch them until shutdown.
//!
//! Each call is dispatched on a blocking worker so a slow handler never
//! stalls the loop. When the loop ends (shutdown cancelled, or every
//! [`ServiceHandle`](super::bus::ServiceHandle) dropped) it refuses queued
//! calls, waits for in-flight ones, and stops the process.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::service::{DispatchOutcome, FailureReason};

use super::bus::{CallResult, ServiceBus, ServiceCall};
use super::{ProcessError, ServiceProcess};

/// Run `process` against `bus` until `shutdown` is cancelled or the bus closes.
///
/// `dispatch_timeout` bounds how long a caller waits for one handler; on
/// expiry the caller gets `HandlerFailed(Timeout)`.
pub async fn run(
    process: Arc<ServiceProcess>,
    bus: ServiceBus,
    shutdown: CancellationToken,
    dispatch_timeout: Option<Duration>,
) {
    let ServiceBus { mut rx, handle } = bus;
    // Only external handles keep the loop alive.
    drop(handle);

    let tracker = TaskTracker::new();

    info!(
        node = %process.node(),
        services = ?process.status().services,
        timeout_ms = dispatch_timeout.map(|d| d.as_millis() as u64),
        "run loop ready"
    );

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!("run loop shutting down");
                break;
            }

            call = rx.recv() => {
                match call {
                    Some(call) => {
                        debug!(call_id = %call.id, service = %call.service, "call received");
                        tracker.spawn(serve(Arc::clone(&process), call, dispatch_timeout));
                    }
                    None => {
                        info!("bus closed, run loop exiting");
                        break;
                    }
                }
            }
        }
    }

    rx.close();
    while let Ok(call) = rx.try_recv() {
        debug!(call_id = %call.id, service = %call.service, "refusing queued call");
        let _ = call.reply_tx.send(Err(ProcessError::Terminated));
    }

    tracker.close();
    tracker.wait().await;

    let stopping = Arc::clone(&process);
    if let Err(e) = tokio::task::spawn_blocking(move || stopping.stop()).await {
        error!("stop task failed: {e}");
    }
}

async fn serve(process: Arc<ServiceProcess>, call: ServiceCall, dispatch_timeout: Option<Duration>) {
    let ServiceCall { id, service, request, reply_tx } = call;

    let name = service.clone();
    let worker = tokio::task::spawn_blocking(move || process.dispatch(&name, request));

    let joined = match dispatch_timeout {
        Some(limit) => match tokio::time::timeout(limit, worker).await {
            Ok(joined) => joined,
            Err(_) => {
                // The worker keeps running; stop() still waits for it.
                warn!(call_id = %id, %service, "dispatch timed out");
                let _ = reply_tx.send(Ok(DispatchOutcome::HandlerFailed(FailureReason::Timeout)));
                return;
            }
        },
        None => worker.await,
    };

    let result: CallResult = joined.unwrap_or_else(|e| {
        error!(call_id = %id, %service, "dispatch worker failed: {e}");
        Ok(DispatchOutcome::HandlerFailed(FailureReason::Panicked(e.to_string())))
    });

    if reply_tx.send(result).is_err() {
        debug!(call_id = %id, %service, "caller went away before the reply");
    }
}
