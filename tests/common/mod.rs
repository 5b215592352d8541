//! Scripted list sources and mutation targets shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use resource_flow::{
    Action, FetchError, ListPage, ListSource, MutationReply, MutationTarget, PaginationMeta,
    RequestKey, TransportError,
};

/// Debounce used by every controller in these tests.
pub const DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub page: u32,
    /// Rendered request key the row was produced for.
    pub key: String,
}

// ============================================================================
// Scripted list source
// ============================================================================

/// Answers every key with one row echoing the key, after an optional delay.
pub struct ScriptedSource {
    name: String,
    last_page: u32,
    delays: Mutex<HashMap<String, Duration>>,
    failures: Mutex<VecDeque<FetchError>>,
    calls: Mutex<Vec<String>>,
    call_times: Mutex<Vec<Instant>>,
}

impl ScriptedSource {
    pub fn new(name: &str) -> Arc<Self> {
        Self::with_last_page(name, 1)
    }

    pub fn with_last_page(name: &str, last_page: u32) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            last_page,
            delays: Mutex::new(HashMap::new()),
            failures: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            call_times: Mutex::new(Vec::new()),
        })
    }

    /// Delay the response for the key rendered as `key`.
    pub fn delay(&self, key: &str, delay: Duration) {
        self.delays.lock().insert(key.to_string(), delay);
    }

    /// Fail the next call with `err`.
    pub fn fail_next(&self, err: FetchError) {
        self.failures.lock().push_back(err);
    }

    /// Rendered keys of every call, in issue order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// When each call was issued, in issue order.
    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl ListSource<Row> for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list(&self, key: &RequestKey) -> Result<ListPage<Row>, FetchError> {
        let rendered = key.to_string();
        self.calls.lock().push(rendered.clone());
        self.call_times.lock().push(Instant::now());

        let delay = self.delays.lock().get(&rendered).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.failures.lock().pop_front() {
            return Err(err);
        }

        let page = key.page().min(self.last_page.max(1));
        Ok(ListPage::new(
            vec![Row {
                page,
                key: rendered,
            }],
            PaginationMeta {
                current_page: page,
                last_page: self.last_page,
                total: u64::from(self.last_page),
                from: Some(u64::from(page)),
                to: Some(u64::from(page)),
            },
        ))
    }
}

/// Coerce a scripted source into the trait object the controller takes.
pub fn dyn_source(source: &Arc<ScriptedSource>) -> Arc<dyn ListSource<Row>> {
    source.clone()
}

// ============================================================================
// Scripted mutation target
// ============================================================================

/// Replies from a queue; replies `200 OK` once the queue is empty.
#[derive(Default)]
pub struct ScriptedTarget {
    replies: Mutex<VecDeque<Result<MutationReply, TransportError>>>,
    sent: Mutex<Vec<(String, bool)>>,
}

impl ScriptedTarget {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, reply: MutationReply) {
        self.replies.lock().push_back(Ok(reply));
    }

    pub fn fail(&self, err: TransportError) {
        self.replies.lock().push_back(Err(err));
    }

    /// `(action, force)` of every call.
    pub fn sent(&self) -> Vec<(String, bool)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl MutationTarget for ScriptedTarget {
    async fn send(&self, action: &Action, force: bool) -> Result<MutationReply, TransportError> {
        self.sent.lock().push((action.to_string(), force));
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(MutationReply::ok("done")))
    }
}
