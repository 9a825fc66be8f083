//! Host-driven scheduling primitives
//!
//! Nothing here spawns threads or reads the system clock. The embedding host
//! advances time and delivers animation frames explicitly, which keeps every
//! sync decision deterministic and testable.
//!
//! - [`DeterministicClock`] - monotonic time advanced by the host
//! - [`Debouncer`] - coalesces bursts into one firing after a quiet window
//! - [`FrameSlot`] - a single outstanding next-frame task; requesting again
//!   cancels the previous one

use std::time::Duration;

// ============================================================================
// Clock
// ============================================================================

/// Monotonic clock controlled by the host
#[derive(Debug, Default, Clone)]
pub struct DeterministicClock {
    now: Duration,
}

impl DeterministicClock {
    /// Create a clock starting at `0`
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Set current monotonic time
    pub fn set(&mut self, now: Duration) {
        self.now = now;
    }

    /// Advance monotonic time by `dt`
    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }
}

// ============================================================================
// Debouncer
// ============================================================================

/// Trailing-edge debounce with a single pending deadline
///
/// Each [`schedule`](Self::schedule) pushes the deadline out to `now + window`.
/// [`poll`](Self::poll) reports true exactly once when the deadline passes.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Duration>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// (Re)arm the deadline, replacing any pending one
    pub fn schedule(&mut self, now: Duration) {
        self.deadline = Some(now.saturating_add(self.window));
    }

    /// Drop the pending deadline
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns true (once) if the pending deadline has elapsed
    pub fn poll(&mut self, now: Duration) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

// ============================================================================
// Frame Slot
// ============================================================================

/// Identifies one frame request, returned by [`FrameSlot::request`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

/// A single outstanding next-frame task
///
/// Requesting a new frame replaces (cancels) the pending task, so only the
/// latest request ever runs.
#[derive(Debug)]
pub struct FrameSlot<T> {
    pending: Option<(FrameHandle, T)>,
    next_handle: u64,
}

impl<T> Default for FrameSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FrameSlot<T> {
    pub fn new() -> Self {
        Self {
            pending: None,
            next_handle: 0,
        }
    }

    /// Schedule `task` for the next frame, cancelling any pending task
    pub fn request(&mut self, task: T) -> FrameHandle {
        let handle = FrameHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        if let Some((previous, _)) = self.pending.replace((handle, task)) {
            tracing::trace!(?previous, ?handle, "frame request replaced pending task");
        }
        handle
    }

    /// Cancel the pending task, returning it if there was one
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, task)| task)
    }

    /// Take the pending task for execution on the current frame
    pub fn take(&mut self) -> Option<T> {
        self.cancel()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn handle(&self) -> Option<FrameHandle> {
        self.pending.as_ref().map(|(handle, _)| *handle)
    }

    pub fn peek(&self) -> Option<&T> {
        self.pending.as_ref().map(|(_, task)| task)
    }
}
