//! Transport adapters.
//!
//! Adapters translate an external I/O protocol into [`ServiceHandle`] calls
//! and map each outcome back through [`ReplyEnvelope`](super::wire::ReplyEnvelope).
//!
//! [`ServiceHandle`]: super::bus::ServiceHandle

pub mod stdio;
