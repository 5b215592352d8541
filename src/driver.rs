//! Event loop running a [`ResourceController`] from a command channel.
//!
//! Commands are applied in arrival order. Discrete changes (filter, sort,
//! page, reset) spawn a fetch right away; search keystrokes arm the debounce
//! timer and the fetch is spawned when it fires. Fetches run concurrently, so
//! a slow response for an old key is discarded by the fetcher when a newer
//! one was issued meanwhile.

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;

use crate::controller::ResourceController;
use crate::fetcher::FetchOutcome;
use crate::filter::FilterValue;
use crate::query_state::{Refetch, Sort};

/// Input to [`drive`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetFilter { name: String, value: FilterValue },
    SetSearch(String),
    SetSort(Option<Sort>),
    ToggleSort(String),
    SetPage(u32),
    /// Restore the initial filters.
    Reset,
    /// Reload the current key, e.g. to retry after an error.
    Refetch,
    /// Drain in-flight fetches and return the controller.
    Shutdown,
}

impl Command {
    pub fn filter(name: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Command::SetFilter {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Run `controller` until [`Command::Shutdown`] arrives or the sender is dropped.
///
/// The current key is fetched once on start.
pub async fn drive<T>(
    mut controller: ResourceController<T>,
    mut commands: mpsc::Receiver<Command>,
) -> ResourceController<T>
where
    T: Send + Sync + 'static,
{
    let mut fetches = JoinSet::new();
    spawn_pending(&mut controller, &mut fetches);

    loop {
        let deadline = controller.query().search_deadline();
        tokio::select! {
            command = commands.recv() => match command {
                None | Some(Command::Shutdown) => break,
                Some(command) => apply(&mut controller, &mut fetches, command),
            },
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if !controller.poll_search(Instant::now()).is_none() {
                    spawn_pending(&mut controller, &mut fetches);
                }
            }
            Some(joined) = fetches.join_next(), if !fetches.is_empty() => {
                reap(controller.resource(), joined);
            }
        }
    }

    while let Some(joined) = fetches.join_next().await {
        reap(controller.resource(), joined);
    }
    tracing::debug!(resource = controller.resource(), "driver stopped");
    controller
}

fn apply<T>(
    controller: &mut ResourceController<T>,
    fetches: &mut JoinSet<FetchOutcome>,
    command: Command,
) where
    T: Send + Sync + 'static,
{
    let refetch = match command {
        Command::SetFilter { name, value } => controller.set_filter(name, value),
        Command::SetSearch(raw) => controller.set_search_term(raw),
        Command::SetSort(sort) => controller.set_sort(sort),
        Command::ToggleSort(field) => controller.toggle_sort(&field),
        Command::SetPage(page) => controller.set_page(page),
        Command::Reset => controller.reset(),
        Command::Refetch => {
            let key = controller.request_current();
            let fetcher = controller.fetcher();
            fetches.spawn(async move { fetcher.refetch(key).await });
            return;
        }
        Command::Shutdown => return,
    };
    if let Refetch::Immediate = refetch {
        spawn_pending(controller, fetches);
    }
}

fn spawn_pending<T>(controller: &mut ResourceController<T>, fetches: &mut JoinSet<FetchOutcome>)
where
    T: Send + Sync + 'static,
{
    if let Some(key) = controller.take_pending_key() {
        let fetcher = controller.fetcher();
        fetches.spawn(async move { fetcher.fetch(key).await });
    }
}

fn reap(resource: &str, joined: Result<FetchOutcome, JoinError>) {
    match joined {
        Ok(FetchOutcome::Failed(err)) => {
            tracing::warn!(resource, error = %err, "fetch failed");
        }
        Ok(outcome) => {
            tracing::trace!(resource, ?outcome, "fetch finished");
        }
        Err(err) => {
            tracing::warn!(resource, error = %err, "fetch task aborted");
        }
    }
}
