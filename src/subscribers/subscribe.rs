//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging custom lifecycle handlers into
//! the supervisor. Each subscriber is driven by a dedicated worker loop fed by a
//! bounded queue owned by the subscriber set.
//!
//! ## Contract
//! - Implementations may be slow; they do **not** block the publisher nor other subscribers.
//! - Each subscriber declares its queue capacity via [`Subscribe::queue_capacity`].
//!   On overflow, events for that subscriber are **dropped** and reported as `SubscriberOverflow`.

use crate::events::Event;
use async_trait::async_trait;

/// Contract for lifecycle event subscribers.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use loopvisor::{Event, EventKind, Subscribe};
///
/// struct CountCancels(std::sync::atomic::AtomicUsize);
///
/// #[async_trait]
/// impl Subscribe for CountCancels {
///     async fn on_event(&self, ev: &Event) {
///         if ev.kind == EventKind::TaskCancelled {
///             self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
///         }
///     }
///
///     fn name(&self) -> &'static str { "count-cancels" }
/// }
/// ```
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event for this subscriber.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
