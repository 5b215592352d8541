//! Debounced values.

use std::time::Duration;

use tokio::time::Instant;

/// A value that mirrors a rapidly changing source after a quiet period.
///
/// Only the last value set within the window is ever propagated. Setting a
/// different value before the window elapses restarts it and discards the
/// superseded value.
///
/// Time is passed in explicitly so the state stays a plain value; the async
/// [`settle`](Self::settle) helper is the only place that sleeps.
#[derive(Debug, Clone)]
pub struct Debounced<T> {
    delay: Duration,
    settled: T,
    pending: Option<Pending<T>>,
}

#[derive(Debug, Clone)]
struct Pending<T> {
    value: T,
    deadline: Instant,
}

impl<T: Clone + PartialEq> Debounced<T> {
    pub fn new(initial: T, delay: Duration) -> Self {
        Self {
            delay,
            settled: initial,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// The last propagated value.
    pub fn value(&self) -> &T {
        &self.settled
    }

    /// The value waiting for its window to elapse, if any.
    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref().map(|p| &p.value)
    }

    /// When the pending value will be propagated.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Record a new source value at `now`.
    ///
    /// Re-setting the value that is already pending keeps its deadline.
    /// Returns the deadline at which the value will settle.
    pub fn set(&mut self, value: T, now: Instant) -> Instant {
        if let Some(pending) = &self.pending {
            if pending.value == value {
                return pending.deadline;
            }
        }
        let deadline = now + self.delay;
        self.pending = Some(Pending { value, deadline });
        deadline
    }

    /// Propagate the pending value if its window has elapsed by `now`.
    ///
    /// Returns the new settled value only when it differs from the old one.
    pub fn poll(&mut self, now: Instant) -> Option<&T> {
        match &self.pending {
            Some(pending) if pending.deadline <= now => {}
            _ => return None,
        }
        let pending = self.pending.take()?;
        if pending.value == self.settled {
            return None;
        }
        self.settled = pending.value;
        Some(&self.settled)
    }

    /// Wait for the pending window to elapse, then propagate.
    pub async fn settle(&mut self) -> Option<&T> {
        let deadline = self.deadline()?;
        tokio::time::sleep_until(deadline).await;
        self.poll(deadline)
    }

    /// Overwrite the settled value immediately, dropping anything pending.
    pub fn force(&mut self, value: T) {
        self.pending = None;
        self.settled = value;
    }
}
