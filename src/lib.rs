//! alertbus - alert rule and notification channel operations routed over a
//! typed command/query bus.
//!
//! Callers never reach storage or the evaluation engine directly: they build
//! a message, dispatch it on a shared [`bus::Bus`] and get the handler's typed
//! output back. On top of the bus sit the alert pause state machine, the
//! secure-settings merger for partial channel updates and the evaluation
//! request builder.

pub mod api;
pub mod bus;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod evaluation;
pub mod guardian;
pub mod models;
pub mod notifiers;
pub mod pause;
pub mod secrets;
pub mod secure_settings;
pub mod store;

// Re-export the types most callers need
pub use bus::{Bus, CancelHandle, DispatchContext, Handler, Message};
pub use error::{BusError, ErrorKind};
