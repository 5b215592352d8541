//! REST transport over `reqwest`.
//!
//! List: `GET <base>/<resource>?<filters>&page=<n>` answering a
//! [`ListEnvelope`]. Mutate: `<METHOD> <base>/<path>` with a `{"force": bool}`
//! body; the status and body are handed to [`classify`](crate::classify).

use std::fmt;
use std::marker::PhantomData;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::{ConfigError, FetchError, TransportError};
use crate::fetcher::ListSource;
use crate::key::RequestKey;
use crate::mutation::{Action, ActionMethod, MutationTarget};
use crate::protocol::{ForceBody, ListEnvelope, ListPage, MutationBody, MutationReply};

/// One REST resource, usable both as a [`ListSource`] and a [`MutationTarget`].
pub struct HttpResource<T> {
    client: Client,
    base_url: String,
    resource: String,
    _row: PhantomData<fn() -> T>,
}

impl<T> Clone for HttpResource<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            resource: self.resource.clone(),
            _row: PhantomData,
        }
    }
}

impl<T> fmt::Debug for HttpResource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResource")
            .field("base_url", &self.base_url)
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}

impl<T> HttpResource<T> {
    /// Build a client for `resource` (e.g. `"trainers"`) under `config.base_url`.
    pub fn new(config: &ClientConfig, resource: impl Into<String>) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.bearer_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|err| ConfigError::Invalid(format!("bearer token: {}", err)))?;
            headers.insert(AUTHORIZATION, value);
        }
        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|err| ConfigError::Invalid(format!("http client: {}", err)))?;
        Ok(Self::with_client(client, &config.base_url, resource))
    }

    /// Share an existing client between resources.
    pub fn with_client(client: Client, base_url: &str, resource: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            resource: resource.into(),
            _row: PhantomData,
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn method(method: ActionMethod) -> Method {
    match method {
        ActionMethod::Post => Method::POST,
        ActionMethod::Put => Method::PUT,
        ActionMethod::Patch => Method::PATCH,
        ActionMethod::Delete => Method::DELETE,
    }
}

fn transport(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_decode() {
        TransportError::Decode(err.to_string())
    } else {
        TransportError::Connection(err.to_string())
    }
}

#[async_trait]
impl<T> ListSource<T> for HttpResource<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.resource
    }

    async fn list(&self, key: &RequestKey) -> Result<ListPage<T>, FetchError> {
        let response = self
            .client
            .get(self.url(&self.resource))
            .query(&key.query_pairs())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ListEnvelope<T> = response
            .json()
            .await
            .map_err(|err| TransportError::Decode(err.to_string()))?;
        envelope.into_page()
    }
}

#[async_trait]
impl<T> MutationTarget for HttpResource<T>
where
    T: Send + Sync + 'static,
{
    async fn send(&self, action: &Action, force: bool) -> Result<MutationReply, TransportError> {
        tracing::debug!(resource = %self.resource, %action, force, "sending mutation");
        let response = self
            .client
            .request(method(action.method), self.url(&action.path))
            .json(&ForceBody { force })
            .send()
            .await
            .map_err(transport)?;

        let status = response.status().as_u16();
        // Error replies are not always JSON; an empty body still classifies by status.
        let body = response.json::<MutationBody>().await.unwrap_or_default();
        Ok(MutationReply::new(status, body))
    }
}
