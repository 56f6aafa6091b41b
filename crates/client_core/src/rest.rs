//! PostgREST-compatible transport for [`BackendClient`].

use std::collections::BTreeSet;

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde_json::Value;
use shared::{
    error::ApiError,
    protocol::{Direction, Filter, ListQuery, Record},
};
use tracing::debug;
use url::Url;

use crate::{backend::BackendClient, error::BackendError};

const REST_PREFIX: &str = "rest/v1/";

pub struct RestBackend {
    http: Client,
    rest_url: Url,
    api_key: String,
}

impl RestBackend {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, BackendError> {
        Self::with_client(Client::new(), base_url, api_key)
    }

    pub fn with_client(
        http: Client,
        base_url: &str,
        api_key: impl Into<String>,
    ) -> Result<Self, BackendError> {
        let mut base = Url::parse(base_url.trim()).map_err(|err| {
            BackendError::Configuration(format!("invalid backend url '{base_url}': {err}"))
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let rest_url = base.join(REST_PREFIX).map_err(|err| {
            BackendError::Configuration(format!("invalid backend url '{base_url}': {err}"))
        })?;
        Ok(Self {
            http,
            rest_url,
            api_key: api_key.into(),
        })
    }

    pub fn rest_url(&self) -> &Url {
        &self.rest_url
    }

    fn request(&self, method: Method, table: &str) -> Result<RequestBuilder, BackendError> {
        let url = self.rest_url.join(table).map_err(|err| {
            BackendError::Configuration(format!("invalid table name '{table}': {err}"))
        })?;
        Ok(self
            .http
            .request(method, url)
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key)))
    }
}

fn filter_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn list_params(query: &ListQuery) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    for filter in &query.filters {
        match filter {
            Filter::Eq { column, value } => {
                params.push((column.clone(), format!("eq.{}", filter_value(value))));
            }
        }
    }
    if let Some(order) = &query.order {
        let direction = match order.direction {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        };
        params.push(("order".to_string(), format!("{}.{direction}", order.column)));
    }
    params
}

/// PostgREST requires every object in a bulk insert to share one key set;
/// naming the union of keys lets rows omit columns and take defaults.
fn columns_param(records: &[Record]) -> Option<(&'static str, String)> {
    let columns: BTreeSet<&str> = records
        .iter()
        .flat_map(|record| record.keys().map(String::as_str))
        .collect();
    if records.len() < 2 || columns.is_empty() {
        return None;
    }
    Some(("columns", columns.into_iter().collect::<Vec<_>>().join(",")))
}

fn id_param(id: &str) -> [(&'static str, String); 1] {
    [("id", format!("eq.{id}"))]
}

async fn ensure_success(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiError>(&body)
        .ok()
        .map(|err| err.summary())
        .filter(|summary| !summary.is_empty())
        .unwrap_or(body);
    Err(BackendError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl BackendClient for RestBackend {
    async fn list(&self, table: &str, query: &ListQuery) -> Result<Vec<Record>, BackendError> {
        debug!(table, filters = query.filters.len(), "backend list");
        let response = self
            .request(Method::GET, table)?
            .query(&list_params(query))
            .send()
            .await?;
        let rows = ensure_success(response).await?.json::<Vec<Record>>().await?;
        Ok(rows)
    }

    async fn insert(&self, table: &str, records: Vec<Record>) -> Result<(), BackendError> {
        debug!(table, rows = records.len(), "backend insert");
        let mut request = self.request(Method::POST, table)?;
        if let Some(columns) = columns_param(&records) {
            request = request.query(&[columns]);
        }
        let response = request
            .header("Prefer", "return=minimal")
            .json(&records)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn update(&self, table: &str, id: &str, patch: Record) -> Result<(), BackendError> {
        debug!(table, id, "backend update");
        let response = self
            .request(Method::PATCH, table)?
            .query(&id_param(id))
            .header("Prefer", "return=minimal")
            .json(&patch)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), BackendError> {
        debug!(table, id, "backend delete");
        let response = self
            .request(Method::DELETE, table)?
            .query(&id_param(id))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/rest_tests.rs"]
mod tests;
