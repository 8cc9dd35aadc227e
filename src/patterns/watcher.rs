//! # PressWatcher: react to every occurrence of one event.
//!
//! Writes `Pressed x{i}` to a [`TextSink`] for the i-th event (0-based). After
//! `limit + 1` updates it stops listening and writes `Goodbye :(`. The same
//! farewell is written when the source goes away. Cancellation leaves the last
//! label in place.

use std::borrow::Cow;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::OnExit;
use crate::source::{EventSource, EventStream};
use crate::tasks::{BoxTaskFuture, Task};

/// Anything that displays a line of text.
pub trait TextSink: Send + Sync + 'static {
    fn set_text(&self, text: &str);
}

pub const GOODBYE: &str = "Goodbye :(";

/// Member that mirrors events of a source onto a text sink.
pub struct PressWatcher<S: EventSource, T: TextSink> {
    name: Cow<'static, str>,
    source: Arc<S>,
    event: Cow<'static, str>,
    sink: Arc<T>,
    limit: u64,
}

impl<S: EventSource, T: TextSink> PressWatcher<S, T> {
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        source: Arc<S>,
        event: impl Into<Cow<'static, str>>,
        sink: Arc<T>,
        limit: u64,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            event: event.into(),
            sink,
            limit,
        }
    }

    /// Wraps into a shareable task handle.
    pub fn into_ref(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl<S: EventSource, T: TextSink> Task for PressWatcher<S, T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture {
        let name = self.name.clone();
        let source = Arc::clone(&self.source);
        let event = self.event.clone();
        let sink = Arc::clone(&self.sink);
        let limit = self.limit;

        Box::pin(async move {
            let _done = {
                let name = name.clone();
                OnExit::new(move || info!(task = %name, "done with watcher"))
            };

            let mut presses = EventStream::new(source, event);
            let mut i = 0u64;
            loop {
                match presses.recv(&ctx).await {
                    Ok(Some(_)) => {
                        sink.set_text(&format!("Pressed x{i}"));
                        if i == limit {
                            presses.close();
                            break;
                        }
                        i += 1;
                    }
                    Ok(None) => break,
                    Err(e) => {
                        info!(task = %name, presses = i, "canceled early");
                        return Err(e);
                    }
                }
            }

            sink.set_text(GOODBYE);
            Ok(())
        })
    }
}
