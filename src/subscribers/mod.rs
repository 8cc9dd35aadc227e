//! # Lifecycle event subscribers.
//!
//! ```text
//!   runner ── publish(Event) ──► Bus ──► Supervisor listener ──► SubscriberSet
//!                                                                  │
//!                                                      ┌───────────┼──────────┐
//!                                                      ▼           ▼          ▼
//!                                                  LogWriter    Custom       ...
//! ```

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub(crate) use set::SubscriberSet;
pub use subscribe::Subscribe;
