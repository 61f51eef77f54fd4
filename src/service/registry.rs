//! Handler registry — service name to handler, in registration order.
//!
//! The registry is populated during process setup and is read-only once the
//! run loop begins, so concurrent dispatches can share it behind an `Arc`
//! without further locking.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use super::{Handler, ServiceName, SharedHandler};

/// A service name was registered twice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("duplicate service registered: {name}")]
pub struct DuplicateServiceError {
    pub name: ServiceName,
}

/// Maps [`ServiceName`]s to handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    /// Entries in insertion order.
    entries: Vec<(ServiceName, SharedHandler)>,
    /// Name to position in `entries`.
    index: HashMap<ServiceName, usize>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`.
    ///
    /// Fails without touching the existing entry if `name` is already taken.
    pub fn register(
        &mut self,
        name: ServiceName,
        handler: impl Handler + 'static,
    ) -> Result<(), DuplicateServiceError> {
        self.register_shared(name, Arc::new(handler))
    }

    /// Register an already-shared handler.
    pub fn register_shared(
        &mut self,
        name: ServiceName,
        handler: SharedHandler,
    ) -> Result<(), DuplicateServiceError> {
        if self.index.contains_key(&name) {
            return Err(DuplicateServiceError { name });
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, handler));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<SharedHandler> {
        self.index
            .get(name)
            .map(|&i| Arc::clone(&self.entries[i].1))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Registered names in insertion order.
    pub fn names(&self) -> Vec<ServiceName> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
