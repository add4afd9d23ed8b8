//! Remote store adapter
//!
//! The backend is a hosted relational store exposed over PostgREST-style
//! REST: one path segment per collection, `?column=eq.value` filters,
//! `order=column.desc` ordering. `RemoteStore` keeps the rest of the crate
//! ignorant of that shape so tests can substitute a mock.
//!
//! No retries, no transactions: a failed write is surfaced to the caller
//! and retried only by the user re-invoking the action.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::rows::Collection;
use crate::error::AppError;
use crate::metrics::{STORE_REQUEST_DURATION_SECONDS, STORE_REQUESTS_TOTAL};

/// A single equality filter, `column = value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    fn to_query(&self) -> String {
        format!("{}=eq.{}", self.column, urlencoding::encode(&self.value))
    }
}

/// Result ordering for a select
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

impl Order {
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }

    fn to_query(&self) -> String {
        let direction = if self.descending { "desc" } else { "asc" };
        format!("order={}.{}", self.column, direction)
    }
}

/// Typed CRUD access to the remote collections
///
/// Rows travel as `serde_json::Value`; `decode_rows` maps them onto the
/// explicit row structs. The store owns all persistence; the client never
/// holds a mutation queue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read rows, optionally filtered and ordered
    async fn select(
        &self,
        collection: Collection,
        filters: &[Filter],
        order: Option<Order>,
    ) -> Result<Vec<Value>, AppError>;

    /// Insert one row; returns the stored representation
    async fn insert(&self, collection: Collection, row: Value) -> Result<Value, AppError>;

    /// Patch every row matching the filters
    async fn update(
        &self,
        collection: Collection,
        patch: Value,
        matches: &[Filter],
    ) -> Result<(), AppError>;

    /// Delete every row matching the filters
    async fn delete(&self, collection: Collection, matches: &[Filter]) -> Result<(), AppError>;
}

/// Map raw rows onto a typed row struct
///
/// Unknown columns are ignored; a row that fails to decode fails the whole
/// read (the snapshot must never be built from a half-understood table).
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, AppError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row)
                .map_err(|e| AppError::Store(format!("row decode failed: {e}")))
        })
        .collect()
}

// =============================================================================
// REST implementation
// =============================================================================

/// `RemoteStore` over the hosted backend's REST interface
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    /// Create a store client from configuration
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(config: &crate::config::StoreConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("MimicSocial/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn collection_url(
        &self,
        collection: Collection,
        filters: &[Filter],
        order: Option<&Order>,
    ) -> String {
        let mut parts: Vec<String> = filters.iter().map(Filter::to_query).collect();
        if let Some(order) = order {
            parts.push(order.to_query());
        }

        if parts.is_empty() {
            format!("{}/{}", self.base_url, collection.name())
        } else {
            format!("{}/{}?{}", self.base_url, collection.name(), parts.join("&"))
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    /// Check the response status, surfacing the backend message on failure
    async fn check(
        response: reqwest::Response,
        collection: Collection,
    ) -> Result<reqwest::Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(
            collection = %collection,
            status = %status,
            body = %body,
            "Remote store request failed"
        );
        Err(AppError::Store(format!(
            "{} request failed ({}): {}",
            collection, status, body
        )))
    }
}

#[async_trait]
impl RemoteStore for RestStore {
    async fn select(
        &self,
        collection: Collection,
        filters: &[Filter],
        order: Option<Order>,
    ) -> Result<Vec<Value>, AppError> {
        let timer = STORE_REQUEST_DURATION_SECONDS
            .with_label_values(&["select", collection.name()])
            .start_timer();

        let url = self.collection_url(collection, filters, order.as_ref());
        let response = self.authorize(self.client.get(&url)).send().await?;
        let response = Self::check(response, collection).await?;
        let rows: Vec<Value> = response.json().await?;

        timer.observe_duration();
        STORE_REQUESTS_TOTAL
            .with_label_values(&["select", collection.name()])
            .inc();
        Ok(rows)
    }

    async fn insert(&self, collection: Collection, row: Value) -> Result<Value, AppError> {
        let timer = STORE_REQUEST_DURATION_SECONDS
            .with_label_values(&["insert", collection.name()])
            .start_timer();

        let url = self.collection_url(collection, &[], None);
        let response = self
            .authorize(self.client.post(&url))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        let response = Self::check(response, collection).await?;
        let mut rows: Vec<Value> = response.json().await?;
        let stored = if rows.is_empty() {
            Value::Null
        } else {
            rows.swap_remove(0)
        };

        timer.observe_duration();
        STORE_REQUESTS_TOTAL
            .with_label_values(&["insert", collection.name()])
            .inc();
        Ok(stored)
    }

    async fn update(
        &self,
        collection: Collection,
        patch: Value,
        matches: &[Filter],
    ) -> Result<(), AppError> {
        let timer = STORE_REQUEST_DURATION_SECONDS
            .with_label_values(&["update", collection.name()])
            .start_timer();

        let url = self.collection_url(collection, matches, None);
        let response = self
            .authorize(self.client.patch(&url))
            .header("Prefer", "return=minimal")
            .json(&patch)
            .send()
            .await?;
        Self::check(response, collection).await?;

        timer.observe_duration();
        STORE_REQUESTS_TOTAL
            .with_label_values(&["update", collection.name()])
            .inc();
        Ok(())
    }

    async fn delete(&self, collection: Collection, matches: &[Filter]) -> Result<(), AppError> {
        let timer = STORE_REQUEST_DURATION_SECONDS
            .with_label_values(&["delete", collection.name()])
            .start_timer();

        let url = self.collection_url(collection, matches, None);
        let response = self.authorize(self.client.delete(&url)).send().await?;
        Self::check(response, collection).await?;

        timer.observe_duration();
        STORE_REQUESTS_TOTAL
            .with_label_values(&["delete", collection.name()])
            .inc();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store(base_url: &str) -> RestStore {
        RestStore::new(&crate::config::StoreConfig {
            base_url: base_url.to_string(),
            api_key: "test-key".to_string(),
            request_timeout_seconds: 5,
            refresh_interval_seconds: 0,
        })
        .unwrap()
    }

    #[test]
    fn filter_values_are_url_encoded() {
        let filter = Filter::eq("handle", "@alice w");
        assert_eq!(filter.to_query(), "handle=eq.%40alice%20w");
    }

    #[test]
    fn collection_url_joins_filters_and_order() {
        let store = test_store("https://store.test/rest/v1/");

        let url = store.collection_url(
            Collection::Posts,
            &[Filter::eq("author_id", "u_1")],
            Some(&Order::desc("created_at")),
        );
        assert_eq!(
            url,
            "https://store.test/rest/v1/posts?author_id=eq.u_1&order=created_at.desc"
        );

        let bare = store.collection_url(Collection::Maintenance, &[], None);
        assert_eq!(bare, "https://store.test/rest/v1/maintenance");
    }

    #[test]
    fn decode_rows_rejects_malformed_row() {
        let rows = vec![serde_json::json!({"post_id": "p_1", "user_id": "u_1"})];
        let likes: Vec<crate::data::LikeRow> = decode_rows(rows).unwrap();
        assert_eq!(likes[0].post_id, "p_1");

        let bad = vec![serde_json::json!({"post_id": 7})];
        let result: Result<Vec<crate::data::LikeRow>, _> = decode_rows(bad);
        assert!(matches!(result, Err(AppError::Store(_))));
    }
}
