//! Ordering, de-duplication and error retention of the resource fetcher.

mod common;

use std::collections::BTreeMap;
use std::time::Duration;

use common::{dyn_source, ScriptedSource};
use resource_flow::{FetchError, FetchOutcome, RequestKey, ResourceFetcher};

fn key(status: &str, page: u32) -> RequestKey {
    RequestKey::new(
        BTreeMap::from([("status".to_string(), status.to_string())]),
        page,
    )
}

#[tokio::test(start_paused = true)]
async fn test_slow_superseded_response_is_discarded() {
    let source = ScriptedSource::new("payouts");
    source.delay("status=pending&page=1", Duration::from_millis(200));
    source.delay("status=paid&page=1", Duration::from_millis(100));
    let fetcher = ResourceFetcher::new(dyn_source(&source));

    // A issued at t=0, resolves at t=200.
    let a = tokio::spawn({
        let fetcher = fetcher.clone();
        async move { fetcher.fetch(key("pending", 1)).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    // B issued at t=50, resolves at t=150.
    let b = tokio::spawn({
        let fetcher = fetcher.clone();
        async move { fetcher.fetch(key("paid", 1)).await }
    });

    assert_eq!(b.await.unwrap(), FetchOutcome::Applied);
    assert_eq!(a.await.unwrap(), FetchOutcome::Stale);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let snapshot = fetcher.snapshot();
    assert_eq!(snapshot.key, Some(key("paid", 1)));
    assert_eq!(snapshot.data[0].key, "status=paid&page=1");
    assert!(!snapshot.is_loading);
}

#[tokio::test(start_paused = true)]
async fn test_identical_in_flight_key_is_deduplicated() {
    let source = ScriptedSource::new("invoices");
    source.delay("page=1", Duration::from_millis(100));
    let fetcher = ResourceFetcher::new(dyn_source(&source));

    let first = tokio::spawn({
        let fetcher = fetcher.clone();
        async move { fetcher.fetch(RequestKey::page_only(1)).await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(fetcher.is_loading());
    assert_eq!(fetcher.in_flight(), Some(RequestKey::page_only(1)));

    assert_eq!(
        fetcher.fetch(RequestKey::page_only(1)).await,
        FetchOutcome::Deduplicated
    );
    assert_eq!(first.await.unwrap(), FetchOutcome::Applied);
    assert_eq!(source.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refetch_supersedes_identical_in_flight_key() {
    let source = ScriptedSource::new("invoices");
    source.delay("page=1", Duration::from_millis(100));
    let fetcher = ResourceFetcher::new(dyn_source(&source));

    let first = tokio::spawn({
        let fetcher = fetcher.clone();
        async move { fetcher.fetch(RequestKey::page_only(1)).await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(
        fetcher.refetch(RequestKey::page_only(1)).await,
        FetchOutcome::Applied
    );
    assert_eq!(first.await.unwrap(), FetchOutcome::Stale);
    assert_eq!(source.call_count(), 2);
}

#[tokio::test]
async fn test_failure_keeps_previous_data_until_retry() {
    let source = ScriptedSource::with_last_page("revenue", 3);
    let fetcher = ResourceFetcher::new(dyn_source(&source));

    fetcher.fetch(RequestKey::page_only(1)).await;
    source.fail_next(FetchError::Status {
        status: 500,
        message: "boom".to_string(),
    });

    let outcome = fetcher.fetch(RequestKey::page_only(2)).await;
    assert!(matches!(outcome, FetchOutcome::Failed(ref err) if err.status() == Some(500)));

    let snapshot = fetcher.snapshot();
    assert_eq!(snapshot.data[0].page, 1);
    assert_eq!(snapshot.key, Some(RequestKey::page_only(1)));
    assert!(snapshot.error.is_some());
    assert!(!snapshot.is_loading);

    assert_eq!(
        fetcher.refetch(RequestKey::page_only(2)).await,
        FetchOutcome::Applied
    );
    let snapshot = fetcher.snapshot();
    assert!(snapshot.error.is_none());
    assert_eq!(snapshot.data[0].page, 2);
}
