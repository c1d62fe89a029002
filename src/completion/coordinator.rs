// SPDX-License-Identifier: MIT
// Request coordinator — debounce, supersession, and staleness gating.
//
// One coordinator exists per editor session. Each incoming request bumps a
// generation counter carried on a watch channel; earlier requests observe the
// bump and resolve empty immediately (supersession is not an error). At most
// one generation is ever live, so a slow backend reply can never be delivered
// into a session that has since moved on.
//
// Cancellation is soft: once dispatched, the backend call runs to completion
// and only its result is discarded.

use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default quiet period before a request is dispatched.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Debounced single-flight request scheduler.
pub struct RequestCoordinator {
    generation: watch::Sender<u64>,
    delay: Duration,
}

impl RequestCoordinator {
    pub fn new(delay: Duration) -> Self {
        let (generation, _) = watch::channel(0);
        Self { generation, delay }
    }

    /// Register a new request, superseding any pending one. The previous
    /// waiter (if any) wakes immediately and resolves empty; the returned
    /// gate owns the sole live generation.
    pub fn begin(&self) -> Gate {
        // The bump and the capture must be one step: reading the counter back
        // afterwards could observe a concurrent registration's bump and hand
        // the same generation to two gates.
        let mut gen = 0;
        self.generation.send_modify(|g| {
            *g += 1;
            gen = *g;
        });
        let rx = self.generation.subscribe();
        debug!(generation = gen, "request registered");
        Gate {
            gen,
            rx,
            delay: self.delay,
        }
    }

    /// Generation currently considered live. Test/diagnostic accessor.
    pub fn current_generation(&self) -> u64 {
        *self.generation.borrow()
    }
}

impl Default for RequestCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

/// The pending side of one registered request.
///
/// `wait_debounce` must return `true` before the caller dispatches the
/// backend call; `is_current` must be re-checked once the call completes and
/// before the result is accepted.
pub struct Gate {
    gen: u64,
    rx: watch::Receiver<u64>,
    delay: Duration,
}

impl Gate {
    /// Wait out the debounce window. Returns `false` — without dispatching —
    /// when a newer request supersedes this one or the editor cancels first.
    pub async fn wait_debounce(&mut self, cancel: &CancellationToken) -> bool {
        let sleep = tokio::time::sleep(self.delay);
        tokio::pin!(sleep);
        let gen = self.gen;
        tokio::select! {
            _ = &mut sleep => true,
            // A changed generation means a newer request took our place. A
            // closed channel means the coordinator itself is gone; either way
            // this request is no longer deliverable.
            _ = self.rx.wait_for(move |g| *g != gen) => {
                debug!(generation = gen, "superseded during debounce");
                false
            }
            _ = cancel.cancelled() => {
                debug!(generation = gen, "cancelled before dispatch");
                false
            }
        }
    }

    /// True while this gate's generation is still the live one. Checked after
    /// the backend call completes; a stale result must be discarded silently.
    pub fn is_current(&self) -> bool {
        *self.rx.borrow() == self.gen
    }

    pub fn generation(&self) -> u64 {
        self.gen
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn debounce_elapses_for_sole_request() {
        let coord = RequestCoordinator::new(Duration::from_millis(500));
        let mut gate = coord.begin();
        let cancel = CancellationToken::new();
        assert!(gate.wait_debounce(&cancel).await);
        assert!(gate.is_current());
    }

    #[tokio::test(start_paused = true)]
    async fn newer_request_supersedes_older_waiter() {
        let coord = RequestCoordinator::new(Duration::from_millis(500));
        let mut first = coord.begin();
        let mut second = coord.begin();
        let cancel = CancellationToken::new();

        // The first waiter resolves empty without consuming the full delay.
        assert!(!first.wait_debounce(&cancel).await);
        assert!(!first.is_current());

        assert!(second.wait_debounce(&cancel).await);
        assert!(second.is_current());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_signal_observed_mid_window() {
        let coord = RequestCoordinator::default();
        let mut gate = coord.begin();
        let cancel = CancellationToken::new();
        let signal = cancel.clone();

        let waiter = tokio::spawn(async move { gate.wait_debounce(&cancel).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.cancel();
        assert!(!waiter.await.unwrap(), "cancelled request must resolve empty");
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_then_newer_request_marks_stale() {
        let coord = RequestCoordinator::default();
        let mut gate = coord.begin();
        let cancel = CancellationToken::new();
        assert!(gate.wait_debounce(&cancel).await);

        // A newer request arrives while the (conceptual) backend call runs.
        let _newer = coord.begin();
        assert!(!gate.is_current(), "stale gate must not deliver its result");
    }

    #[tokio::test(start_paused = true)]
    async fn only_last_of_burst_survives() {
        let coord = RequestCoordinator::new(Duration::from_millis(500));
        let cancel = CancellationToken::new();

        let mut gates: Vec<Gate> = (0..5).map(|_| coord.begin()).collect();
        let last = gates.pop().unwrap();

        for mut gate in gates {
            assert!(!gate.wait_debounce(&cancel).await, "superseded waiters resolve empty");
        }
        let mut last = last;
        assert!(last.wait_debounce(&cancel).await);
        assert_eq!(last.generation(), coord.current_generation());
    }
}
