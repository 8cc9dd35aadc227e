//! # EventStream: lazy, cancellable sequence over an [`EventSource`].
//!
//! ## States
//! ```text
//! Idle ──first poll──► Active { rx, handle } ──close / cancel / drop──► Closed
//!   │                        │
//!   │ subscribe rejected     │ source dropped the callback
//!   └────────────────────────┴──────────────────────────────────────► Closed
//! ```
//!
//! ## Rules
//! - Registration happens on the first poll, never at construction.
//! - A buffered payload is returned without suspending.
//! - Leaving `Active` unregisters the callback exactly once and discards the buffer.
//! - Source invalidation ends the sequence (`None`); it is not an error.

use std::borrow::Cow;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{EventSource, SourceError};
use crate::error::TaskError;

enum State<S: EventSource> {
    Idle,
    Active {
        rx: mpsc::UnboundedReceiver<S::Payload>,
        handle: S::Handle,
    },
    Closed,
}

/// Pull-style view of one event of one source.
///
/// ## Example
/// ```no_run
/// # use std::sync::Arc;
/// # use loopvisor::source::{EventSource, EventStream};
/// # async fn demo<S: EventSource>(button: Arc<S>) {
/// use futures::StreamExt;
///
/// let mut releases = EventStream::new(button, "on_release");
/// while let Some(_ev) = releases.next().await {
///     // react to the release
/// }
/// # }
/// ```
pub struct EventStream<S: EventSource> {
    source: Arc<S>,
    event: Cow<'static, str>,
    state: State<S>,
}

// No field is ever pinned structurally.
impl<S: EventSource> Unpin for EventStream<S> {}

impl<S: EventSource> EventStream<S> {
    /// Declares interest in `event` of `source`. Nothing is registered yet.
    pub fn new(source: Arc<S>, event: impl Into<Cow<'static, str>>) -> Self {
        Self {
            source,
            event: event.into(),
            state: State::Idle,
        }
    }

    /// Name of the observed event.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// True while a callback is registered with the source.
    pub fn is_subscribed(&self) -> bool {
        matches!(self.state, State::Active { .. })
    }

    /// True once the sequence has ended.
    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    /// Ends the sequence explicitly.
    ///
    /// If a callback is registered it is unregistered before this returns and any
    /// buffered payloads are discarded. Idempotent.
    pub fn close(&mut self) {
        if let State::Active { rx, handle } = std::mem::replace(&mut self.state, State::Closed) {
            drop(rx);
            self.source.unsubscribe(handle);
            debug!(event = %self.event, "unsubscribed");
        }
    }

    /// Waits for the next payload or a cancellation request, whichever comes first.
    ///
    /// - `Ok(Some(p))`: next payload (returned immediately if one is buffered)
    /// - `Ok(None)`: the sequence ended (closed, or the source went away)
    /// - `Err(TaskError::Canceled)`: `ctx` fired while waiting; the stream is closed
    pub async fn recv(&mut self, ctx: &CancellationToken) -> Result<Option<S::Payload>, TaskError> {
        if matches!(self.state, State::Idle) && ctx.is_cancelled() {
            self.close();
            return Err(TaskError::Canceled);
        }

        let next = tokio::select! {
            biased;
            item = self.next() => Some(item),
            _ = ctx.cancelled() => None,
        };

        match next {
            Some(item) => Ok(item),
            None => {
                self.close();
                Err(TaskError::Canceled)
            }
        }
    }

    fn open(&mut self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let callback = Box::new(move |payload: S::Payload| {
            // A closed receiver means the consumer is gone; the payload is discarded.
            let _ = tx.send(payload);
        });

        self.state = match self.source.subscribe(&self.event, callback) {
            Ok(handle) => {
                debug!(event = %self.event, "subscribed");
                State::Active { rx, handle }
            }
            Err(SourceError::Invalidated) => {
                debug!(event = %self.event, "source invalid, sequence ends");
                State::Closed
            }
            Err(e) => {
                warn!(event = %self.event, error = %e, label = e.as_label(), "subscribe rejected");
                State::Closed
            }
        };
    }
}

impl<S: EventSource> Stream for EventStream<S> {
    type Item = S::Payload;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if matches!(this.state, State::Idle) {
            this.open();
        }

        let polled = match &mut this.state {
            State::Active { rx, .. } => rx.poll_recv(cx),
            State::Idle | State::Closed => return Poll::Ready(None),
        };

        match polled {
            Poll::Ready(Some(payload)) => Poll::Ready(Some(payload)),
            Poll::Ready(None) => {
                debug!(event = %this.event, "source dropped the callback, sequence ends");
                this.close();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S: EventSource> Drop for EventStream<S> {
    fn drop(&mut self) {
        self.close();
    }
}
