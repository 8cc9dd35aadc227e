/// Runs a closure once when dropped.
///
/// Covers every way a future can stop: normal return, `?`, cancellation
/// observed as an error, panic unwinding, and the future being dropped or
/// aborted by the scheduler.
///
/// ## Example
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use loopvisor::patterns::OnExit;
///
/// let hits = AtomicUsize::new(0);
/// {
///     let _guard = OnExit::new(|| {
///         hits.fetch_add(1, Ordering::SeqCst);
///     });
/// }
/// assert_eq!(hits.load(Ordering::SeqCst), 1);
/// ```
#[must_use = "the closure runs when the guard is dropped; bind it to a named variable"]
pub struct OnExit<F: FnOnce()> {
    f: Option<F>,
}

impl<F: FnOnce()> OnExit<F> {
    pub fn new(f: F) -> Self {
        Self { f: Some(f) }
    }
}

impl<F: FnOnce()> Drop for OnExit<F> {
    fn drop(&mut self) {
        if let Some(f) = self.f.take() {
            f();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_runs_during_unwind() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let res = std::panic::catch_unwind(move || {
            let _guard = OnExit::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            });
            panic!("boom");
        });
        assert!(res.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_runs_when_future_is_dropped() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let fut = async move {
            let _guard = OnExit::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            });
            std::future::pending::<()>().await;
        };
        let mut fut = Box::pin(fut);
        assert!(futures::poll!(fut.as_mut()).is_pending());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        drop(fut);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
