//! Paginated resource controller.
//!
//! One instance per list page: it owns the query state, the fetcher and the
//! mutation flow for that page, with the resource-specific calls injected.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::ControllerConfig;
use crate::error::FlowError;
use crate::export::Exporter;
use crate::fetcher::{FetchOutcome, FetchSnapshot, ListSource, ResourceFetcher};
use crate::filter::{FilterState, FilterValue};
use crate::key::RequestKey;
use crate::mutation::{Action, MutationFlow, MutationOutcome, MutationState, MutationTarget};
use crate::notify::{NoopNotifier, Notification, Notifier};
use crate::pagination::Cursor;
use crate::query_state::{QueryState, Refetch, Sort};
use crate::tracer::{NoopTracer, Tracer};

/// Controller for one paginated resource.
///
/// State changes return a [`Refetch`] and never perform I/O themselves; call
/// [`sync`](Self::sync) (or run the [`driver`](crate::driver)) to fetch.
///
/// # Example
///
/// ```ignore
/// let mut trainers = ResourceController::builder(source)
///     .filters(FilterState::new().with("status", "all"))
///     .mutation_target(target)
///     .notifier(toasts)
///     .build();
///
/// trainers.sync().await;
/// trainers.set_filter("status", "active");
/// trainers.sync().await;
///
/// trainers.begin_action(Action::put("trainers/12/toggle-status", "Deactivate?"))?;
/// trainers.confirm_action().await?;
/// ```
pub struct ResourceController<T> {
    query: QueryState,
    fetcher: ResourceFetcher<T>,
    mutations: MutationFlow,
    target: Option<Arc<dyn MutationTarget>>,
    exporter: Option<Arc<dyn Exporter>>,
    notifier: Arc<dyn Notifier>,
    tracer: Arc<dyn Tracer>,
    /// Last key handed to the fetcher.
    requested: Option<RequestKey>,
}

impl<T: 'static> fmt::Debug for ResourceController<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceController")
            .field("query", &self.query)
            .field("fetcher", &self.fetcher)
            .field("mutations", &self.mutations)
            .field("requested", &self.requested)
            .finish_non_exhaustive()
    }
}

impl<T: Send + Sync + 'static> ResourceController<T> {
    pub fn builder(source: Arc<dyn ListSource<T>>) -> ResourceControllerBuilder<T> {
        ResourceControllerBuilder::new(source)
    }

    pub fn resource(&self) -> &str {
        self.fetcher.resource()
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    /// A handle sharing this controller's fetch state.
    pub fn fetcher(&self) -> ResourceFetcher<T> {
        self.fetcher.clone()
    }

    pub fn snapshot(&self) -> FetchSnapshot<T> {
        self.fetcher.snapshot()
    }

    /// Navigation affordances for the data currently shown.
    pub fn cursor(&self) -> Cursor {
        self.fetcher.snapshot().cursor()
    }

    pub fn request_key(&self) -> RequestKey {
        self.query.request_key()
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    // ------------------------------------------------------------------
    // Query state
    // ------------------------------------------------------------------

    pub fn set_filter(&mut self, name: impl Into<String>, value: impl Into<FilterValue>) -> Refetch {
        let refetch = self.query.set_filter(name, value);
        self.scheduled(refetch)
    }

    pub fn set_search_term(&mut self, raw: impl Into<String>) -> Refetch {
        let refetch = self.query.set_search_term(raw, Instant::now());
        self.scheduled(refetch)
    }

    pub fn set_sort(&mut self, sort: Option<Sort>) -> Refetch {
        let refetch = self.query.set_sort(sort);
        self.scheduled(refetch)
    }

    pub fn toggle_sort(&mut self, field: &str) -> Refetch {
        let refetch = self.query.toggle_sort(field);
        self.scheduled(refetch)
    }

    pub fn set_page(&mut self, page: u32) -> Refetch {
        let refetch = self.query.set_page(page);
        self.scheduled(refetch)
    }

    /// Go to the next page if the cursor allows it.
    pub fn next_page(&mut self) -> Refetch {
        match self.cursor().next_page() {
            Some(page) => self.set_page(page),
            None => Refetch::None,
        }
    }

    /// Go to the previous page if the cursor allows it.
    pub fn previous_page(&mut self) -> Refetch {
        match self.cursor().previous_page() {
            Some(page) => self.set_page(page),
            None => Refetch::None,
        }
    }

    /// Clear filters back to their initial snapshot.
    pub fn reset(&mut self) -> Refetch {
        let refetch = self.query.reset();
        self.scheduled(refetch)
    }

    /// Settle a pending search term if its window elapsed by `now`.
    pub fn poll_search(&mut self, now: Instant) -> Refetch {
        let refetch = self.query.poll_search(now);
        self.scheduled(refetch)
    }

    /// The current key if it has not been requested yet, marking it requested.
    pub fn take_pending_key(&mut self) -> Option<RequestKey> {
        let key = self.query.request_key();
        if self.requested.as_ref() == Some(&key) {
            return None;
        }
        self.requested = Some(key.clone());
        Some(key)
    }

    /// Fetch the current key if it changed, then wait out any pending search
    /// debounce and fetch again if the settled term changed the key.
    ///
    /// Discrete changes made while a search is pending are fetched right away
    /// rather than held back until the search settles. Returns the outcome of
    /// the last fetch, or `None` when the current key was already requested.
    pub async fn sync(&mut self) -> Option<FetchOutcome> {
        let mut outcome = match self.take_pending_key() {
            Some(key) => Some(self.fetcher.fetch(key).await),
            None => None,
        };
        if let Some(deadline) = self.query.search_deadline() {
            tokio::time::sleep_until(deadline).await;
            self.poll_search(deadline);
            if let Some(key) = self.take_pending_key() {
                outcome = Some(self.fetcher.fetch(key).await);
            }
        }
        outcome
    }

    /// Mark the current key requested unconditionally and return it.
    pub fn request_current(&mut self) -> RequestKey {
        let key = self.query.request_key();
        self.requested = Some(key.clone());
        key
    }

    /// Fetch the current key again, superseding anything in flight.
    pub async fn refetch(&mut self) -> FetchOutcome {
        let key = self.request_current();
        self.fetcher.refetch(key).await
    }

    fn scheduled(&self, refetch: Refetch) -> Refetch {
        if !refetch.is_none() {
            self.tracer.on_refetch_scheduled(self.resource(), refetch);
        }
        refetch
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    pub fn mutation_state(&self) -> &MutationState {
        self.mutations.state()
    }

    pub fn mutation_flow(&self) -> &MutationFlow {
        &self.mutations
    }

    /// Show the initial confirmation for `action`.
    pub fn begin_action(&mut self, action: Action) -> Result<(), FlowError> {
        if self.target.is_none() {
            return Err(FlowError::NoTarget);
        }
        self.mutations.begin(action)
    }

    /// Cancel the confirmation or dismiss a hard failure.
    pub fn cancel_action(&mut self) -> Result<(), FlowError> {
        self.mutations.cancel()
    }

    /// Execute the confirmed action.
    ///
    /// On success a notification is raised and the list is refetched. A soft
    /// conflict only re-prompts. A hard failure is notified with its reasons
    /// and leaves the list untouched.
    pub async fn confirm_action(&mut self) -> Result<MutationOutcome, FlowError> {
        let target = self.target.clone().ok_or(FlowError::NoTarget)?;
        let outcome = self.mutations.confirm(target.as_ref()).await?;
        match &outcome {
            MutationOutcome::Succeeded { message } => {
                self.notifier.notify(Notification::success(message.clone()));
                self.refetch().await;
            }
            MutationOutcome::SoftConflict { warning } => {
                tracing::debug!(resource = self.resource(), warning = %warning, "mutation needs re-confirmation");
            }
            MutationOutcome::HardFailed(failure) => {
                tracing::warn!(resource = self.resource(), error = %failure, "mutation failed");
                self.notifier.notify(Notification::error(failure.describe()));
            }
        }
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Run the injected exporter with the current filters and notify the result.
    pub async fn export(&self) -> anyhow::Result<()> {
        let exporter = self
            .exporter
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no exporter configured for {}", self.resource()))?;
        let filters = self.query.filter_params();
        match exporter.export(&filters).await {
            Ok(()) => {
                self.tracer.on_export(self.resource(), None);
                self.notifier
                    .notify(Notification::success("Export completed"));
                Ok(())
            }
            Err(err) => {
                let message = format!("{:#}", err);
                self.tracer.on_export(self.resource(), Some(&message));
                self.notifier
                    .notify(Notification::error(format!("Export failed: {}", message)));
                Err(err)
            }
        }
    }
}

/// Builder for [`ResourceController`].
pub struct ResourceControllerBuilder<T> {
    source: Arc<dyn ListSource<T>>,
    config: ControllerConfig,
    filters: FilterState,
    sort: Option<Sort>,
    target: Option<Arc<dyn MutationTarget>>,
    exporter: Option<Arc<dyn Exporter>>,
    notifier: Arc<dyn Notifier>,
    tracer: Arc<dyn Tracer>,
}

impl<T: Send + Sync + 'static> ResourceControllerBuilder<T> {
    pub fn new(source: Arc<dyn ListSource<T>>) -> Self {
        Self {
            source,
            config: ControllerConfig::default(),
            filters: FilterState::new(),
            sort: None,
            target: None,
            exporter: None,
            notifier: Arc::new(NoopNotifier),
            tracer: Arc::new(NoopTracer),
        }
    }

    pub fn config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.config.debounce_ms = u64::try_from(debounce.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Initial filter snapshot, restored by [`ResourceController::reset`].
    pub fn filters(mut self, filters: FilterState) -> Self {
        self.filters = filters;
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn mutation_target(mut self, target: Arc<dyn MutationTarget>) -> Self {
        self.target = Some(target);
        self
    }

    pub fn exporter(mut self, exporter: Arc<dyn Exporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn build(self) -> ResourceController<T> {
        let mut query = QueryState::with_config(self.filters, &self.config);
        if let Some(sort) = self.sort {
            query = query.with_initial_sort(sort);
        }
        let resource = self.source.name().to_string();
        ResourceController {
            query,
            fetcher: ResourceFetcher::with_tracer(self.source, self.tracer.clone()),
            mutations: MutationFlow::with_tracer(resource, self.tracer.clone()),
            target: self.target,
            exporter: self.exporter,
            notifier: self.notifier,
            tracer: self.tracer,
            requested: None,
        }
    }
}
