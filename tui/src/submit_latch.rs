//! One-request-at-a-time guard for generation submissions.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

/// Shared `Ready`/`InFlight` flag.
///
/// [`SubmitLatch::try_acquire`] moves the latch to `InFlight` and hands back an
/// [`InFlightGuard`]; dropping the guard (on success, failure, or a panicking task) moves it back
/// to `Ready`.
#[derive(Debug, Clone, Default)]
pub struct SubmitLatch {
    in_flight: Arc<AtomicBool>,
}

impl SubmitLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` if a request is already in flight.
    pub fn try_acquire(&self) -> Option<InFlightGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard {
                in_flight: Arc::clone(&self.in_flight),
            })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
#[must_use = "dropping the guard immediately releases the latch"]
pub struct InFlightGuard {
    in_flight: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_refused_until_guard_drops() {
        let latch = SubmitLatch::new();
        let guard = latch.try_acquire().expect("first acquire");
        assert!(latch.is_in_flight());
        assert!(latch.try_acquire().is_none());

        drop(guard);
        assert!(!latch.is_in_flight());
        assert!(latch.try_acquire().is_some());
    }

    #[test]
    fn clones_share_state() {
        let latch = SubmitLatch::new();
        let other = latch.clone();
        let _guard = other.try_acquire().expect("acquire");
        assert!(latch.is_in_flight());
    }

    #[tokio::test]
    async fn guard_released_when_task_panics() {
        let latch = SubmitLatch::new();
        let guard = latch.try_acquire().expect("acquire");
        let handle = tokio::spawn(async move {
            let _guard = guard;
            panic!("request task failed");
        });
        assert!(handle.await.is_err());
        assert!(!latch.is_in_flight());
    }

    #[test]
    fn only_one_thread_wins_a_race() {
        let latch = SubmitLatch::new();
        let barrier = Arc::new(std::sync::Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let latch = latch.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    latch.try_acquire()
                })
            })
            .collect();
        let guards: Vec<InFlightGuard> = handles
            .into_iter()
            .filter_map(|handle| handle.join().expect("join"))
            .collect();
        assert_eq!(guards.len(), 1);
    }
}
