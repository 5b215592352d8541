//! Resource fetcher: runs list queries and applies only the latest response.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::FetchError;
use crate::key::RequestKey;
use crate::pagination::{Cursor, PaginationMeta};
use crate::protocol::ListPage;
use crate::tracer::{NoopTracer, Tracer};

/// Remote "list" call for one resource.
///
/// Implementations normalize transport errors into [`FetchError`]; callers
/// never see raw transport types.
#[async_trait]
pub trait ListSource<T>: Send + Sync + 'static {
    /// Resource name for logging and tracing (e.g. `"trainers"`).
    fn name(&self) -> &str;

    /// Fetch one page for `key`.
    async fn list(&self, key: &RequestKey) -> Result<ListPage<T>, FetchError>;
}

/// What happened to one fetch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response replaced data and pagination.
    Applied,
    /// A newer request was issued first; the response was discarded.
    Stale,
    /// An identical request was already in flight; nothing was sent.
    Deduplicated,
    /// The request failed; previous data is kept.
    Failed(FetchError),
}

impl FetchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, FetchOutcome::Applied)
    }
}

/// Point-in-time view of a fetcher.
///
/// `data` and `pagination` always come from the same response.
#[derive(Debug, Clone)]
pub struct FetchSnapshot<T> {
    pub data: Arc<Vec<T>>,
    pub pagination: Option<PaginationMeta>,
    pub is_loading: bool,
    pub error: Option<FetchError>,
    /// Key of the response currently shown.
    pub key: Option<RequestKey>,
}

impl<T> FetchSnapshot<T> {
    pub fn cursor(&self) -> Cursor {
        Cursor::from_meta(self.pagination.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

struct FetchState<T> {
    data: Arc<Vec<T>>,
    pagination: Option<PaginationMeta>,
    error: Option<FetchError>,
    applied: Option<RequestKey>,
    /// Bumped for every issued request; only the holder of the latest ticket may apply.
    generation: u64,
    in_flight: Option<(u64, RequestKey)>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: Arc::new(Vec::new()),
            pagination: None,
            error: None,
            applied: None,
            generation: 0,
            in_flight: None,
        }
    }
}

/// Executes list queries for a [`RequestKey`] and exposes the result.
///
/// This is cheap to clone; clones share state, so a fetch spawned on another
/// task updates the same snapshot.
///
/// Ordering guarantee: only the response to the most recently issued request
/// is applied. Older responses are discarded on arrival rather than
/// cancelled.
pub struct ResourceFetcher<T> {
    source: Arc<dyn ListSource<T>>,
    state: Arc<Mutex<FetchState<T>>>,
    tracer: Arc<dyn Tracer>,
}

impl<T> Clone for ResourceFetcher<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            state: self.state.clone(),
            tracer: self.tracer.clone(),
        }
    }
}

impl<T: 'static> fmt::Debug for ResourceFetcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceFetcher")
            .field("resource", &self.source.name())
            .finish_non_exhaustive()
    }
}

enum Ticket {
    Issued(u64),
    Duplicate,
}

impl<T: Send + Sync + 'static> ResourceFetcher<T> {
    pub fn new(source: Arc<dyn ListSource<T>>) -> Self {
        Self::with_tracer(source, Arc::new(NoopTracer))
    }

    pub fn with_tracer(source: Arc<dyn ListSource<T>>, tracer: Arc<dyn Tracer>) -> Self {
        Self {
            source,
            state: Arc::new(Mutex::new(FetchState::default())),
            tracer,
        }
    }

    pub fn resource(&self) -> &str {
        self.source.name()
    }

    /// Current data, pagination, loading flag and error.
    pub fn snapshot(&self) -> FetchSnapshot<T> {
        let state = self.state.lock();
        FetchSnapshot {
            data: state.data.clone(),
            pagination: state.pagination,
            is_loading: state.in_flight.is_some(),
            error: state.error.clone(),
            key: state.applied.clone(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().in_flight.is_some()
    }

    /// Key of the request currently in flight, if any.
    pub fn in_flight(&self) -> Option<RequestKey> {
        self.state.lock().in_flight.as_ref().map(|(_, key)| key.clone())
    }

    /// Fetch `key`, skipping the request if the same key is already in flight.
    pub async fn fetch(&self, key: RequestKey) -> FetchOutcome {
        self.run(key, true).await
    }

    /// Fetch `key` unconditionally, superseding whatever is in flight.
    ///
    /// Used to retry after an error and to reload after a mutation.
    pub async fn refetch(&self, key: RequestKey) -> FetchOutcome {
        self.run(key, false).await
    }

    /// Clear data, pagination and error, and orphan any in-flight request.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        let generation = state.generation + 1;
        *state = FetchState {
            generation,
            ..FetchState::default()
        };
    }

    fn issue(&self, key: &RequestKey, dedupe: bool) -> Ticket {
        let mut state = self.state.lock();
        if dedupe {
            if let Some((_, in_flight)) = &state.in_flight {
                if in_flight == key {
                    return Ticket::Duplicate;
                }
            }
        }
        state.generation += 1;
        let ticket = state.generation;
        state.in_flight = Some((ticket, key.clone()));
        Ticket::Issued(ticket)
    }

    async fn run(&self, key: RequestKey, dedupe: bool) -> FetchOutcome {
        let ticket = match self.issue(&key, dedupe) {
            Ticket::Issued(ticket) => ticket,
            Ticket::Duplicate => {
                let outcome = FetchOutcome::Deduplicated;
                self.tracer.on_fetch_end(self.resource(), &key, &outcome);
                return outcome;
            }
        };
        self.tracer.on_fetch_start(self.resource(), &key);

        let result = self.source.list(&key).await;

        let outcome = self.apply(ticket, &key, result);
        self.tracer.on_fetch_end(self.resource(), &key, &outcome);
        outcome
    }

    fn apply(
        &self,
        ticket: u64,
        key: &RequestKey,
        result: Result<ListPage<T>, FetchError>,
    ) -> FetchOutcome {
        let mut state = self.state.lock();
        if state.generation != ticket {
            return FetchOutcome::Stale;
        }
        state.in_flight = None;
        match result {
            Ok(page) => {
                state.data = Arc::new(page.data);
                state.pagination = Some(page.meta);
                state.error = None;
                state.applied = Some(key.clone());
                FetchOutcome::Applied
            }
            Err(err) => {
                state.error = Some(err.clone());
                FetchOutcome::Failed(err)
            }
        }
    }
}
