//! Reusable member shapes.
//!
//! - [`Periodic`]: background loop that sleeps between actions until cancelled;
//! - [`PressWatcher`]: consumer of an [`EventStream`](crate::source::EventStream) that updates a [`TextSink`];
//! - [`OnExit`]: drop guard used by both for guaranteed cleanup.

mod guard;
mod periodic;
mod watcher;

pub use guard::OnExit;
pub use periodic::Periodic;
pub use watcher::{GOODBYE, PressWatcher, TextSink};
