use std::time::Duration;
use tokio::time::Instant;

/// Schedules auto-stop after a configurable quiet period.
///
/// Holds at most one pending deadline: each speech observation replaces the
/// previous one. The session loop sleeps until the armed deadline and asks
/// the orchestrator to stop when it expires; the watchdog itself never
/// touches capture or the connection.
pub struct SilenceWatchdog {
    timeout: Duration,
    deadline: Option<Instant>,
}

impl SilenceWatchdog {
    /// A zero timeout disables the watchdog entirely.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
        }
    }

    pub fn enabled(&self) -> bool {
        !self.timeout.is_zero()
    }

    /// The armed deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Reschedules the one-shot deadline to `now + timeout`, cancelling the
    /// previous one. Does nothing when disabled.
    pub fn observe_speech(&mut self, now: Instant) {
        if self.enabled() {
            self.deadline = Some(now + self.timeout);
        }
    }

    /// Disarms the pending deadline. Called on every teardown path so a
    /// stale timer can never fire against a later session.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Consumes the deadline if it has elapsed. At most one fire per arm.
    pub fn try_fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
