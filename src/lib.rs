//! Resource-Flow: a controller for filtered, paginated remote lists.
//!
//! Every list page of an admin dashboard repeats the same shape: filters and
//! a search box feed a paginated query, rows can be mutated with a
//! confirmation step, and the current selection can be exported. This crate
//! implements that shape once, generic over the row type.
//!
//! # Key Features
//!
//! - **Pruned request keys**: `''`, `'all'` and unset filters never reach the server
//! - **Debounced search**: bursts of keystrokes settle into one query
//! - **Last key wins**: responses to superseded requests are discarded on arrival
//! - **Two-step mutations**: a soft conflict re-prompts with the server's warning
//!   and retries once with `force = true`; hard failures are terminal
//! - **Observable**: plug a [`Tracer`] in to record fetch and mutation events
//!
//! # Example
//!
//! ```ignore
//! use resource_flow::{Action, ClientConfig, FilterState, HttpResource, ResourceController};
//!
//! let trainers = Arc::new(HttpResource::<Trainer>::new(&ClientConfig::new(api), "trainers")?);
//! let mut controller = ResourceController::builder(trainers.clone())
//!     .filters(FilterState::new().with("status", "all"))
//!     .mutation_target(trainers)
//!     .build();
//!
//! controller.set_search_term("ali");
//! controller.sync().await;
//! for trainer in controller.snapshot().data.iter() { /* render */ }
//! ```
//!
//! See the [`driver`] module for running a controller from a command channel.

mod config;
mod controller;
mod debounce;
pub mod driver;
mod error;
mod export;
mod fetcher;
mod filter;
#[cfg(feature = "http")]
mod http;
mod key;
mod mutation;
mod notify;
mod pagination;
mod protocol;
mod query_state;
pub mod tracer;

#[cfg(feature = "http")]
pub use config::ClientConfig;
pub use config::{ControllerConfig, DEFAULT_DEBOUNCE_MS};
pub use controller::{ResourceController, ResourceControllerBuilder};
pub use debounce::Debounced;
pub use driver::{drive, Command};
pub use error::{ConfigError, FetchError, FlowError, HardFailure, TransportError};
pub use export::{ExportFn, Exporter};
pub use fetcher::{FetchOutcome, FetchSnapshot, ListSource, ResourceFetcher};
pub use filter::{FilterState, FilterValue, ALL};
#[cfg(feature = "http")]
pub use http::HttpResource;
pub use key::{RequestKey, PAGE_PARAM};
pub use mutation::{
    Action, ActionMethod, MutationFlow, MutationOutcome, MutationState, MutationTarget, Prompt,
};
pub use notify::{Level, NoopNotifier, Notification, NotificationLog, Notifier};
pub use pagination::{Cursor, PaginationMeta};
pub use protocol::{
    classify, ConflictDescriptor, ConflictKind, ForceBody, ListEnvelope, ListPage, MutationBody,
    MutationReply, Verdict, HARD_FAILURE_STATUS, SOFT_CONFLICT_STATUS,
};
pub use query_state::{QueryState, Refetch, Sort, SortDirection};
pub use tracer::{EventCollector, LogTracer, NoopTracer, TraceEvent, Tracer};
