use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Teardown barrier between frame submission and context destruction.
///
/// The fence is a gate plus an in-flight counter:
/// - a renderer calls [`RenderFence::begin`] before touching the context and
///   holds the returned guard for the duration of the frame
/// - teardown calls [`RenderFence::close_and_wait`], which refuses new
///   frames and blocks (boundedly) until in-flight frames drain
/// - [`RenderFence::reopen`] re-arms the gate for the next context
///
/// `begin` never blocks and the gate is only held locked for counter
/// updates, so host callback delivery is not stalled by a slow frame.
#[derive(Debug)]
pub struct RenderFence {
    inner: Mutex<FenceState>,
    drained: Condvar,
}

#[derive(Debug)]
struct FenceState {
    in_flight: u32,
    closed: bool,
}

/// RAII participant token. Dropping it marks the frame finished.
#[derive(Debug)]
pub struct RenderGuard<'f> {
    fence: &'f RenderFence,
}

impl RenderFence {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(FenceState {
                in_flight: 0,
                closed: false,
            }),
            drained: Condvar::new(),
        }
    }

    /// Registers a frame about to start. Returns `None` once the gate is
    /// closed: no render may begin after teardown has begun.
    pub fn begin(&self) -> Option<RenderGuard<'_>> {
        let mut st = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if st.closed {
            return None;
        }
        st.in_flight += 1;
        Some(RenderGuard { fence: self })
    }

    /// Closes the gate and waits up to `timeout` for in-flight frames to
    /// finish. Returns `true` if the fence drained; `false` means the caller
    /// should log and proceed with teardown anyway (holding up shutdown
    /// indefinitely is worse than a torn-down context mid-frame).
    pub fn close_and_wait(&self, timeout: Duration) -> bool {
        let mut st = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        st.closed = true;
        let (st, _timeout_result) = self
            .drained
            .wait_timeout_while(st, timeout, |st| st.in_flight > 0)
            .unwrap_or_else(|e| e.into_inner());
        st.in_flight == 0
    }

    /// Re-arms the gate after teardown so a future context can render.
    pub fn reopen(&self) {
        let mut st = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        st.closed = false;
    }

    /// Number of frames currently in flight. Diagnostic only.
    pub fn in_flight(&self) -> u32 {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).in_flight
    }
}

impl Default for RenderFence {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RenderGuard<'_> {
    fn drop(&mut self) {
        let mut st = self
            .fence
            .inner
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        st.in_flight = st.in_flight.saturating_sub(1);
        if st.in_flight == 0 {
            self.fence.drained.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    // ── gate ──────────────────────────────────────────────────────────────

    #[test]
    fn begin_succeeds_while_open() {
        let fence = RenderFence::new();
        let guard = fence.begin();
        assert!(guard.is_some());
        assert_eq!(fence.in_flight(), 1);
        drop(guard);
        assert_eq!(fence.in_flight(), 0);
    }

    #[test]
    fn begin_refused_after_close() {
        let fence = RenderFence::new();
        assert!(fence.close_and_wait(Duration::from_millis(10)));
        assert!(fence.begin().is_none());
    }

    #[test]
    fn reopen_permits_new_frames() {
        let fence = RenderFence::new();
        fence.close_and_wait(Duration::from_millis(10));
        fence.reopen();
        assert!(fence.begin().is_some());
    }

    // ── drain ─────────────────────────────────────────────────────────────

    #[test]
    fn close_waits_for_in_flight_frame() {
        let fence = Arc::new(RenderFence::new());

        let worker = {
            let fence = Arc::clone(&fence);
            thread::spawn(move || {
                let guard = fence.begin().expect("gate open");
                thread::sleep(Duration::from_millis(50));
                drop(guard);
            })
        };

        // Give the worker time to enter the fence.
        thread::sleep(Duration::from_millis(10));
        let drained = fence.close_and_wait(Duration::from_secs(2));
        assert!(drained, "fence should drain once the frame finishes");
        assert_eq!(fence.in_flight(), 0);

        worker.join().unwrap();
    }

    #[test]
    fn close_times_out_on_stuck_frame() {
        let fence = Arc::new(RenderFence::new());

        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let worker = {
            let fence = Arc::clone(&fence);
            thread::spawn(move || {
                let guard = fence.begin().expect("gate open");
                // Simulate an unresponsive render thread.
                release_rx.recv().ok();
                drop(guard);
            })
        };

        thread::sleep(Duration::from_millis(10));
        let drained = fence.close_and_wait(Duration::from_millis(30));
        assert!(!drained, "stuck frame must not drain within the budget");

        release_tx.send(()).unwrap();
        worker.join().unwrap();
    }
}
