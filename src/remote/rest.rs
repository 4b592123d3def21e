//! HTTP client for a PostgREST-style record store.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use std::time::Duration;

use super::{RemoteError, RemoteStore};
use crate::config::RemoteConfig;
use crate::models::Record;
use crate::request::{Filter, FilterOp, KeyFilter, Query};

/// Remote store reached over the PostgREST REST dialect.
///
/// Every resource maps to `{url}/rest/v1/{resource}`; filters travel as
/// `column=op.value` query parameters.
#[derive(Clone)]
pub struct RestRemote {
    base_url: String,
    api_key: String,
    http: Client,
}

impl RestRemote {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http,
        })
    }

    /// Creates a client from config.
    ///
    /// Returns an error if the remote is not configured.
    pub fn from_config(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let url = config.url.clone().ok_or(RemoteError::NotConfigured)?;
        let api_key = config.api_key.clone().ok_or(RemoteError::NotConfigured)?;

        Self::new(url, api_key, Duration::from_secs(config.timeout_secs))
    }

    /// Builds the URL for a resource with already-rendered query parameters.
    fn build_url(&self, resource: &str, params: &[(String, String)]) -> String {
        let mut url = format!(
            "{}/rest/v1/{}",
            self.base_url,
            urlencoding::encode(resource)
        );

        for (i, (name, value)) in params.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(&urlencoding::encode(name));
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }

        url
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<String, RemoteError> {
        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;

        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    async fn send_rows(&self, request: RequestBuilder) -> Result<Vec<Record>, RemoteError> {
        let body = self.send(request).await?;
        decode_rows(&body)
    }
}

#[async_trait]
impl RemoteStore for RestRemote {
    async fn select(&self, query: &Query) -> Result<Vec<Record>, RemoteError> {
        let url = self.build_url(&query.resource, &select_params(query));
        self.send_rows(self.request(Method::GET, &url)).await
    }

    async fn insert(&self, resource: &str, record: &Record) -> Result<Vec<Record>, RemoteError> {
        let url = self.build_url(resource, &[]);
        let request = self
            .request(Method::POST, &url)
            .header("Prefer", "return=representation")
            .json(record);
        self.send_rows(request).await
    }

    async fn update(
        &self,
        resource: &str,
        patch: &Record,
        key: &KeyFilter,
    ) -> Result<Vec<Record>, RemoteError> {
        let url = self.build_url(resource, &[key_param(key)]);
        let request = self
            .request(Method::PATCH, &url)
            .header("Prefer", "return=representation")
            .json(patch);
        self.send_rows(request).await
    }

    async fn delete(&self, resource: &str, key: &KeyFilter) -> Result<(), RemoteError> {
        let url = self.build_url(resource, &[key_param(key)]);
        self.send(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }

    async fn health(&self) -> bool {
        let url = format!("{}/rest/v1/", self.base_url);
        match self.request(Method::GET, &url).send().await {
            Ok(response) => !response.status().is_server_error(),
            Err(e) => {
                tracing::debug!("Remote health check failed: {}", e);
                false
            }
        }
    }
}

fn select_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), query.columns.clone())];

    params.extend(query.filters.iter().map(filter_param));

    if !query.order.is_empty() {
        let order = query
            .order
            .iter()
            .map(|o| format!("{}.{}", o.column, o.direction.as_str()))
            .collect::<Vec<_>>()
            .join(",");
        params.push(("order".to_string(), order));
    }

    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }

    params
}

fn filter_param(filter: &Filter) -> (String, String) {
    if filter.value.is_null() && matches!(filter.op, FilterOp::Eq | FilterOp::Neq) {
        let op = if filter.op == FilterOp::Eq { "is" } else { "not.is" };
        return (filter.column.clone(), format!("{}.null", op));
    }
    (
        filter.column.clone(),
        format!("{}.{}", filter.op, render_value(&filter.value)),
    )
}

fn key_param(key: &KeyFilter) -> (String, String) {
    filter_param(&Filter {
        column: key.column.clone(),
        op: FilterOp::Eq,
        value: key.value.clone(),
    })
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// An empty body (e.g. `return=minimal`) decodes as no rows; a single object
/// decodes as one row.
fn decode_rows(body: &str) -> Result<Vec<Record>, RemoteError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<Value>(body).map_err(|e| RemoteError::Decode(e.to_string()))? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(record) => Ok(record),
                other => Err(RemoteError::Decode(format!("expected object, got {}", other))),
            })
            .collect(),
        Value::Object(record) => Ok(vec![record]),
        other => Err(RemoteError::Decode(format!(
            "expected array of records, got {}",
            other
        ))),
    }
}
