//! # Simulated UI engine.
//!
//! A small, deterministic stand-in for an external engine with a blocking run
//! loop and callback-based events. Used by the demo binary and the tests.
//!
//! ```text
//! SimLoop (blocking pool)                 tasks (tokio)
//! ───────────────────────                 ─────────────
//! AwaitSubscribers ◄──── condvar ──────── Widget::subscribe (EventStream)
//! Release / Dispatch ──► callbacks ─────► EventStream queue
//! Destroy ─────────────► drop callbacks ─► sequence ends
//!                                         Widget::set_text (TextSink)
//! ```

mod engine;
mod script;

pub use engine::{SimEngine, Widget, WidgetEvent};
pub use script::{ON_RELEASE, SimLoop, Step};
