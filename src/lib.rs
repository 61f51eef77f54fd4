//! Request/response service node.
//!
//! - [`service`] — service names, the handler contract, [`HandlerRegistry`]
//!   and [`Dispatcher`], plus the reference `add_two_ints`/`empty_srv` handlers.
//! - [`process`] — [`ServiceProcess`] lifecycle, the call bus, the run loop
//!   and transport adapters.
//!
//! [`HandlerRegistry`]: service::HandlerRegistry
//! [`Dispatcher`]: service::Dispatcher
//! [`ServiceProcess`]: process::ServiceProcess

pub mod config;
pub mod error;
pub mod logger;
pub mod process;
pub mod service;

pub use error::AppError;
pub use process::{ProcessError, ProcessState, ServiceProcess, StartupError};
pub use service::{DispatchOutcome, Request, Response, ServiceName};
