//! Lifecycle events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! These are the supervisor's own observability events. Payloads delivered by an
//! external event source travel through [`crate::source`] instead.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
