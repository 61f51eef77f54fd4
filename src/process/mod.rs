//! Service process — owns the registry and drives the
//! `Created → Running → Stopped` lifecycle.
//!
//! Handlers are declared on the process before [`ServiceProcess::start`],
//! which builds the [`HandlerRegistry`] in one step. Once running the registry
//! is never mutated; dispatches share it through a read guard and
//! [`ServiceProcess::stop`] takes the write side, so stopping waits for every
//! in-flight dispatch before the registry is released.

#[cfg(feature = "adapter-stdio")]
pub mod adapters;
pub mod bus;
mod run;
pub mod wire;

use std::fmt;
use std::mem;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::config::Config;
use crate::service::handlers::{self, ADD_TWO_INTS, EMPTY_SRV};
use crate::service::{
    DispatchOutcome, Dispatcher, DuplicateServiceError, Handler, HandlerRegistry, Request,
    ServiceName, SharedHandler,
};

pub use run::run;

// ── State & errors ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    Created,
    Running,
    Stopped,
}

impl ProcessState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessState::Created => "created",
            ProcessState::Running => "running",
            ProcessState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The process could not enter `Running`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartupError {
    #[error(transparent)]
    Duplicate(#[from] DuplicateServiceError),

    #[error("cannot start a process that is {0}")]
    InvalidState(ProcessState),
}

/// A dispatch was refused because the process is not running.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessError {
    #[error("service process is not running")]
    NotRunning,

    #[error("service process has terminated")]
    Terminated,
}

// ── Hooks ─────────────────────────────────────────────────────────────────────

/// Lifecycle callbacks for the hosting process manager.
pub trait LifecycleHooks: Send + Sync {
    /// Called when [`ServiceProcess::start`] fails.
    fn on_startup_failure(&self, _error: &StartupError) {}

    /// Called once, when the process first reaches `Stopped`.
    fn on_shutdown(&self) {}
}

/// Default hooks: log and carry on.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHooks;

impl LifecycleHooks for LogHooks {
    fn on_startup_failure(&self, error: &StartupError) {
        error!(%error, "service process failed to start");
    }

    fn on_shutdown(&self) {
        info!("service process shut down");
    }
}

// ── Status ────────────────────────────────────────────────────────────────────

/// Point-in-time view of a process, for introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStatus {
    pub node: String,
    pub state: ProcessState,
    /// Declared services before start, registered services while running.
    pub services: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_ms: Option<u64>,
}

// ── ServiceProcess ────────────────────────────────────────────────────────────

enum Lifecycle {
    Created,
    Running {
        registry: HandlerRegistry,
        started_at: Instant,
    },
    Stopped,
}

impl Lifecycle {
    fn state(&self) -> ProcessState {
        match self {
            Lifecycle::Created => ProcessState::Created,
            Lifecycle::Running { .. } => ProcessState::Running,
            Lifecycle::Stopped => ProcessState::Stopped,
        }
    }
}

pub struct ServiceProcess {
    node: String,
    /// Services declared before start, in declaration order.
    services: Vec<(ServiceName, SharedHandler)>,
    dispatcher: Dispatcher,
    hooks: Box<dyn LifecycleHooks>,
    lifecycle: RwLock<Lifecycle>,
}

impl ServiceProcess {
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            services: Vec::new(),
            dispatcher: Dispatcher::new(),
            hooks: Box::new(LogHooks),
            lifecycle: RwLock::new(Lifecycle::Created),
        }
    }

    /// Build a process with the reference services enabled in `config`.
    pub fn from_config(config: &Config) -> Self {
        let mut process = Self::new(&config.node_name);
        if config.services.add_two_ints {
            process = process.with_service(handlers::service_name(ADD_TWO_INTS), handlers::add_two_ints);
        }
        if config.services.empty_srv {
            process = process.with_service(handlers::service_name(EMPTY_SRV), handlers::empty_handler);
        }
        process
    }

    /// Declare a service. Names are checked for uniqueness at [`start`](Self::start).
    pub fn with_service(self, name: ServiceName, handler: impl Handler + 'static) -> Self {
        self.with_shared_service(name, Arc::new(handler))
    }

    pub fn with_shared_service(mut self, name: ServiceName, handler: SharedHandler) -> Self {
        self.services.push((name, handler));
        self
    }

    pub fn with_hooks(mut self, hooks: impl LifecycleHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn state(&self) -> ProcessState {
        self.read_lifecycle().state()
    }

    pub fn status(&self) -> ProcessStatus {
        let lifecycle = self.read_lifecycle();
        let (services, uptime_ms) = match &*lifecycle {
            Lifecycle::Created => (
                self.services.iter().map(|(name, _)| name.to_string()).collect(),
                None,
            ),
            Lifecycle::Running { registry, started_at } => (
                registry.names().into_iter().map(String::from).collect(),
                Some(started_at.elapsed().as_millis() as u64),
            ),
            Lifecycle::Stopped => (Vec::new(), None),
        };
        ProcessStatus {
            node: self.node.clone(),
            state: lifecycle.state(),
            services,
            uptime_ms,
        }
    }

    /// Register every declared service and enter `Running`.
    ///
    /// On failure the process stays `Created` and the startup-failure hook
    /// is invoked.
    pub fn start(&self) -> Result<(), StartupError> {
        let mut lifecycle = self.write_lifecycle();
        let result = match &*lifecycle {
            Lifecycle::Created => self.build_registry(),
            other => Err(StartupError::InvalidState(other.state())),
        };

        match result {
            Ok(registry) => {
                let services: Vec<String> = registry.names().into_iter().map(String::from).collect();
                info!(node = %self.node, ?services, "service process running");
                *lifecycle = Lifecycle::Running { registry, started_at: Instant::now() };
                Ok(())
            }
            Err(e) => {
                drop(lifecycle);
                self.hooks.on_startup_failure(&e);
                Err(e)
            }
        }
    }

    fn build_registry(&self) -> Result<HandlerRegistry, StartupError> {
        let mut registry = HandlerRegistry::new();
        for (name, handler) in &self.services {
            registry.register_shared(name.clone(), Arc::clone(handler))?;
        }
        Ok(registry)
    }

    /// Dispatch `request` to the service called `name`.
    ///
    /// Handler outcomes, including failures, are returned as a
    /// [`DispatchOutcome`]; the process stays running either way.
    pub fn dispatch(&self, name: &str, request: Request) -> Result<DispatchOutcome, ProcessError> {
        let lifecycle = self.read_lifecycle();
        match &*lifecycle {
            Lifecycle::Running { registry, .. } => {
                Ok(self.dispatcher.dispatch(registry, name, request))
            }
            Lifecycle::Created => Err(ProcessError::NotRunning),
            Lifecycle::Stopped => Err(ProcessError::Terminated),
        }
    }

    /// Enter `Stopped`, waiting for in-flight dispatches first.
    ///
    /// Idempotent; the shutdown hook fires only on the first call.
    pub fn stop(&self) {
        let mut lifecycle = self.write_lifecycle();
        match mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Stopped => return,
            Lifecycle::Running { registry, started_at } => {
                info!(
                    node = %self.node,
                    services = registry.len(),
                    uptime_ms = started_at.elapsed().as_millis() as u64,
                    "service process stopped"
                );
            }
            Lifecycle::Created => {
                info!(node = %self.node, "service process stopped before start");
            }
        }
        drop(lifecycle);
        self.hooks.on_shutdown();
    }

    // Dispatch never panics while holding the guard (handler panics are
    // caught), but a poisoned lock must not wedge shutdown either.
    fn read_lifecycle(&self) -> RwLockReadGuard<'_, Lifecycle> {
        self.lifecycle.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lifecycle(&self) -> RwLockWriteGuard<'_, Lifecycle> {
        self.lifecycle.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Mutex, mpsc};
    use std::thread;
    use std::time::Duration;

    use crate::service::{HandlerFault, Payload, Response};

    fn name(s: &str) -> ServiceName {
        ServiceName::new(s).unwrap()
    }

    fn reference_process() -> ServiceProcess {
        ServiceProcess::new("test_node")
            .with_service(name(ADD_TWO_INTS), handlers::add_two_ints)
            .with_service(name(EMPTY_SRV), handlers::empty_handler)
    }

    #[derive(Clone, Default)]
    struct CountingHooks {
        startup_failures: Arc<AtomicUsize>,
        shutdowns: Arc<AtomicUsize>,
    }

    impl LifecycleHooks for CountingHooks {
        fn on_startup_failure(&self, _error: &StartupError) {
            self.startup_failures.fetch_add(1, Ordering::SeqCst);
        }

        fn on_shutdown(&self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn start_enters_running() {
        let process = reference_process();
        assert_eq!(process.state(), ProcessState::Created);
        process.start().unwrap();
        assert_eq!(process.state(), ProcessState::Running);
    }

    #[test]
    fn dispatch_before_start_is_not_running() {
        let process = reference_process();
        assert_eq!(
            process.dispatch(ADD_TWO_INTS, Request::TwoInts { a: 1, b: 2 }),
            Err(ProcessError::NotRunning)
        );
    }

    #[test]
    fn duplicate_service_fails_startup_and_stays_created() {
        let hooks = CountingHooks::default();
        let process = reference_process()
            .with_service(name(EMPTY_SRV), handlers::empty_handler)
            .with_hooks(hooks.clone());

        let err = process.start().unwrap_err();
        assert!(matches!(err, StartupError::Duplicate(ref d) if d.name.as_str() == EMPTY_SRV));
        assert_eq!(process.state(), ProcessState::Created);
        assert_eq!(hooks.startup_failures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_handler_keeps_process_running() {
        let process = reference_process();
        process.start().unwrap();

        let outcome = process
            .dispatch(ADD_TWO_INTS, Request::TwoInts { a: i64::MAX, b: 1 })
            .unwrap();
        assert!(matches!(outcome, DispatchOutcome::HandlerFailed(_)));
        assert_eq!(process.state(), ProcessState::Running);

        assert_eq!(
            process.dispatch(ADD_TWO_INTS, Request::TwoInts { a: 3, b: 4 }),
            Ok(DispatchOutcome::Responded(Response::Value(Payload::Sum { sum: 7 })))
        );
    }

    #[test]
    fn dispatch_after_stop_is_terminated() {
        let process = reference_process();
        process.start().unwrap();
        process.stop();
        assert_eq!(process.state(), ProcessState::Stopped);
        assert_eq!(
            process.dispatch(EMPTY_SRV, Request::Empty),
            Err(ProcessError::Terminated)
        );
    }

    #[test]
    fn stop_is_idempotent() {
        let hooks = CountingHooks::default();
        let process = reference_process().with_hooks(hooks.clone());
        process.start().unwrap();
        process.stop();
        process.stop();
        assert_eq!(process.state(), ProcessState::Stopped);
        assert_eq!(hooks.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stopped_process_cannot_restart() {
        let process = reference_process();
        process.start().unwrap();
        process.stop();
        assert_eq!(
            process.start(),
            Err(StartupError::InvalidState(ProcessState::Stopped))
        );
        assert_eq!(process.state(), ProcessState::Stopped);
    }

    #[test]
    fn second_start_is_rejected() {
        let process = reference_process();
        process.start().unwrap();
        assert_eq!(
            process.start(),
            Err(StartupError::InvalidState(ProcessState::Running))
        );
        assert_eq!(process.state(), ProcessState::Running);
    }

    #[test]
    fn stop_before_start_goes_straight_to_stopped() {
        let process = reference_process();
        process.stop();
        assert_eq!(process.state(), ProcessState::Stopped);
        assert_eq!(
            process.dispatch(EMPTY_SRV, Request::Empty),
            Err(ProcessError::Terminated)
        );
    }

    #[test]
    fn status_reports_services_and_state() {
        let process = reference_process();
        let status = process.status();
        assert_eq!(status.state, ProcessState::Created);
        assert_eq!(status.services, [ADD_TWO_INTS, EMPTY_SRV]);
        assert!(status.uptime_ms.is_none());

        process.start().unwrap();
        let status = process.status();
        assert_eq!(status.node, "test_node");
        assert_eq!(status.state, ProcessState::Running);
        assert_eq!(status.services, [ADD_TWO_INTS, EMPTY_SRV]);
        assert!(status.uptime_ms.is_some());

        process.stop();
        assert!(process.status().services.is_empty());
    }

    #[test]
    fn stop_waits_for_in_flight_dispatch() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let entered_tx = Mutex::new(entered_tx);
        let finished = Arc::new(AtomicBool::new(false));
        let done = Arc::clone(&finished);

        let slow = move |_: Request| -> Result<Response, HandlerFault> {
            let _ = entered_tx.lock().unwrap().send(());
            thread::sleep(Duration::from_millis(100));
            done.store(true, Ordering::SeqCst);
            Ok(Response::Empty)
        };

        let process = Arc::new(ServiceProcess::new("drain").with_service(name("slow"), slow));
        process.start().unwrap();

        let worker = {
            let process = Arc::clone(&process);
            thread::spawn(move || process.dispatch("slow", Request::Empty))
        };

        entered_rx.recv().unwrap();
        process.stop();

        assert!(finished.load(Ordering::SeqCst), "stop returned before the handler finished");
        assert_eq!(
            worker.join().unwrap(),
            Ok(DispatchOutcome::Responded(Response::Empty))
        );
    }

    #[test]
    fn concurrent_dispatches_share_registry() {
        let process = Arc::new(reference_process());
        process.start().unwrap();

        let workers: Vec<_> = (0..8)
            .map(|i| {
                let process = Arc::clone(&process);
                thread::spawn(move || process.dispatch(ADD_TWO_INTS, Request::TwoInts { a: i, b: i }))
            })
            .collect();

        for (i, w) in workers.into_iter().enumerate() {
            let i = i as i64;
            assert_eq!(
                w.join().unwrap(),
                Ok(DispatchOutcome::Responded(Response::Value(Payload::Sum { sum: 2 * i })))
            );
        }
    }

    #[test]
    fn from_config_honours_service_switches() {
        let mut config = Config::test_default();
        config.services.empty_srv = false;
        let process = ServiceProcess::from_config(&config);
        assert_eq!(process.node(), config.node_name);
        assert_eq!(process.status().services, [ADD_TWO_INTS]);
    }
}
