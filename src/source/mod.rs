//! # Event sources and the pull-style sequence adapter.
//!
//! An external engine notifies interested parties by invoking registered
//! callbacks synchronously. [`EventStream`] turns that push-style contract into
//! a lazy `futures::Stream` of payloads a task can `await` on.
//!
//! ```text
//!   engine thread                       task (tokio)
//!   ─────────────                       ────────────
//!   callback(payload) ──► mpsc (FIFO) ──► EventStream::next() / recv(&ctx)
//!         ▲                                    │
//!         └──── subscribe() on first poll ─────┘
//!               unsubscribe() on close / cancel / drop (once)
//! ```
//!
//! ## Preconditions
//! - One consumer per stream. Sharing a stream between tasks is not supported.
//! - The queue is **unbounded**: a producer faster than its consumer grows it
//!   without limit. Callers that care must consume promptly.

mod stream;

pub use stream::EventStream;

use thiserror::Error;

/// Callback handed to an [`EventSource`]; invoked once per event occurrence.
pub type Callback<P> = Box<dyn Fn(P) + Send + Sync + 'static>;

/// Why a source refused a subscription.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The source is gone (e.g. its widget was destroyed).
    #[error("event source is no longer valid")]
    Invalidated,

    /// The source does not emit the requested event.
    #[error("unknown event '{event}'")]
    UnknownEvent {
        /// The requested event name.
        event: String,
    },
}

impl SourceError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            SourceError::Invalidated => "source_invalidated",
            SourceError::UnknownEvent { .. } => "source_unknown_event",
        }
    }
}

/// Callback-registration contract of an external event source.
///
/// A source signals invalidation of an active subscription by dropping its
/// callback; the adapter then ends the sequence gracefully. `unsubscribe` must
/// tolerate handles whose callback was already dropped.
pub trait EventSource: Send + Sync + 'static {
    /// Payload passed to callbacks.
    type Payload: Send + 'static;
    /// Token identifying one registration.
    type Handle: Send + 'static;

    /// Registers `callback` for `event`.
    fn subscribe(
        &self,
        event: &str,
        callback: Callback<Self::Payload>,
    ) -> Result<Self::Handle, SourceError>;

    /// Removes a registration. Synchronous: no callback runs after it returns.
    fn unsubscribe(&self, handle: Self::Handle);
}
