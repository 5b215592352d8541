//! Tracer trait for observing controller execution.
//!
//! The default [`NoopTracer`] discards everything. [`LogTracer`] forwards to
//! the `tracing` crate, and [`EventCollector`] records [`TraceEvent`]s for
//! assertions in tests.
//!
//! # Example
//!
//! ```ignore
//! use resource_flow::{EventCollector, ResourceController};
//! use std::sync::Arc;
//!
//! let collector = Arc::new(EventCollector::new());
//! let mut controller = ResourceController::builder(source)
//!     .tracer(collector.clone())
//!     .build();
//! controller.sync().await;
//! assert!(!collector.events().is_empty());
//! ```

use parking_lot::Mutex;

use crate::fetcher::FetchOutcome;
use crate::key::RequestKey;
use crate::query_state::Refetch;

/// Observer hooks for fetches, mutations and exports.
///
/// All methods default to doing nothing, so implementations only override
/// what they need. Tracers may be shared with spawned fetch tasks, hence
/// `Send + Sync`.
pub trait Tracer: Send + Sync + 'static {
    /// A list request was issued.
    #[inline]
    fn on_fetch_start(&self, _resource: &str, _key: &RequestKey) {}

    /// A list request resolved (or was skipped as a duplicate).
    #[inline]
    fn on_fetch_end(&self, _resource: &str, _key: &RequestKey, _outcome: &FetchOutcome) {}

    /// A state change asked for a refetch.
    #[inline]
    fn on_refetch_scheduled(&self, _resource: &str, _refetch: Refetch) {}

    /// The mutation flow moved between states.
    #[inline]
    fn on_mutation_transition(&self, _resource: &str, _from: &'static str, _to: &'static str) {}

    /// An export finished; `error` is set when it failed.
    #[inline]
    fn on_export(&self, _resource: &str, _error: Option<&str>) {}
}

/// Tracer that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {}

/// Tracer that forwards every hook to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn on_fetch_start(&self, resource: &str, key: &RequestKey) {
        tracing::debug!(resource, key = %key, "fetch started");
    }

    fn on_fetch_end(&self, resource: &str, key: &RequestKey, outcome: &FetchOutcome) {
        match outcome {
            FetchOutcome::Failed(err) => {
                tracing::warn!(resource, key = %key, error = %err, "fetch failed")
            }
            other => tracing::debug!(resource, key = %key, outcome = ?other, "fetch finished"),
        }
    }

    fn on_refetch_scheduled(&self, resource: &str, refetch: Refetch) {
        tracing::trace!(resource, refetch = ?refetch, "refetch scheduled");
    }

    fn on_mutation_transition(&self, resource: &str, from: &'static str, to: &'static str) {
        tracing::debug!(resource, from, to, "mutation transition");
    }

    fn on_export(&self, resource: &str, error: Option<&str>) {
        match error {
            Some(error) => tracing::warn!(resource, error, "export failed"),
            None => tracing::info!(resource, "export finished"),
        }
    }
}

/// Owned record of one tracer hook invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    FetchStart {
        resource: String,
        key: RequestKey,
    },
    FetchEnd {
        resource: String,
        key: RequestKey,
        outcome: FetchOutcome,
    },
    RefetchScheduled {
        resource: String,
        refetch: Refetch,
    },
    MutationTransition {
        resource: String,
        from: &'static str,
        to: &'static str,
    },
    Export {
        resource: String,
        error: Option<String>,
    },
}

/// Tracer that accumulates events for later inspection.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Mutex<Vec<TraceEvent>>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of collected events.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().clone()
    }

    /// Take collected events, clearing the collector.
    pub fn take(&self) -> Vec<TraceEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Outcomes of finished fetches, in order.
    pub fn fetch_outcomes(&self) -> Vec<FetchOutcome> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                TraceEvent::FetchEnd { outcome, .. } => Some(outcome.clone()),
                _ => None,
            })
            .collect()
    }

    /// `(from, to)` pairs of mutation transitions, in order.
    pub fn transitions(&self) -> Vec<(&'static str, &'static str)> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                TraceEvent::MutationTransition { from, to, .. } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: TraceEvent) {
        self.events.lock().push(event);
    }
}

impl Tracer for EventCollector {
    fn on_fetch_start(&self, resource: &str, key: &RequestKey) {
        self.push(TraceEvent::FetchStart {
            resource: resource.to_string(),
            key: key.clone(),
        });
    }

    fn on_fetch_end(&self, resource: &str, key: &RequestKey, outcome: &FetchOutcome) {
        self.push(TraceEvent::FetchEnd {
            resource: resource.to_string(),
            key: key.clone(),
            outcome: outcome.clone(),
        });
    }

    fn on_refetch_scheduled(&self, resource: &str, refetch: Refetch) {
        self.push(TraceEvent::RefetchScheduled {
            resource: resource.to_string(),
            refetch,
        });
    }

    fn on_mutation_transition(&self, resource: &str, from: &'static str, to: &'static str) {
        self.push(TraceEvent::MutationTransition {
            resource: resource.to_string(),
            from,
            to,
        });
    }

    fn on_export(&self, resource: &str, error: Option<&str>) {
        self.push(TraceEvent::Export {
            resource: resource.to_string(),
            error: error.map(str::to_string),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_collector_records_in_order() {
        let collector = EventCollector::new();
        let key = RequestKey::page_only(1);

        collector.on_fetch_start("users", &key);
        collector.on_fetch_end("users", &key, &FetchOutcome::Applied);
        collector.on_mutation_transition("users", "idle", "confirming");

        assert_eq!(collector.len(), 3);
        assert_eq!(collector.fetch_outcomes(), vec![FetchOutcome::Applied]);
        assert_eq!(collector.transitions(), vec![("idle", "confirming")]);

        let taken = collector.take();
        assert_eq!(taken.len(), 3);
        assert!(collector.is_empty());
    }

    #[test]
    fn test_tracers_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NoopTracer>();
        assert_send_sync::<LogTracer>();
        assert_send_sync::<Arc<EventCollector>>();
    }
}
