//! Injected export side effect.
//!
//! Blob handling, file naming and saving belong to the implementation; the
//! controller only passes the current filters and reports the result.

use std::collections::BTreeMap;

use async_trait::async_trait;

/// Export the rows matching `filters` (pruned, without the page).
#[async_trait]
pub trait Exporter: Send + Sync + 'static {
    async fn export(&self, filters: &BTreeMap<String, String>) -> anyhow::Result<()>;
}

/// Adapter turning an async closure into an [`Exporter`].
///
/// ```ignore
/// let exporter = ExportFn::new(|filters| async move {
///     download_csv(filters).await
/// });
/// ```
pub struct ExportFn<F>(F);

impl<F> ExportFn<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> Exporter for ExportFn<F>
where
    F: Fn(BTreeMap<String, String>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn export(&self, filters: &BTreeMap<String, String>) -> anyhow::Result<()> {
        (self.0)(filters.clone()).await
    }
}
