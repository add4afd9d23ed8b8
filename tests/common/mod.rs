//! Common test utilities for E2E tests

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use mimic_social::auth::{Session, create_session_token};
use mimic_social::data::{Collection, Filter, Order, RemoteStore};
use mimic_social::error::AppError;
use mimic_social::service::Aggregator;
use mimic_social::{AppState, assist, config};

/// In-memory store standing in for the remote backend
///
/// Rows live as raw JSON values per collection, the same shape the REST
/// adapter would return.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<HashMap<&'static str, Vec<Value>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, collection: Collection, rows: Vec<Value>) {
        self.tables
            .lock()
            .await
            .entry(collection.name())
            .or_default()
            .extend(rows);
    }

    /// Row count, for asserting that a rejected action wrote nothing
    pub async fn count(&self, collection: Collection) -> usize {
        self.tables
            .lock()
            .await
            .get(collection.name())
            .map(|rows| rows.len())
            .unwrap_or(0)
    }

    fn matches(row: &Value, filters: &[Filter]) -> bool {
        filters.iter().all(|filter| match row.get(&filter.column) {
            Some(Value::String(s)) => s == &filter.value,
            Some(other) => other.to_string() == filter.value,
            None => false,
        })
    }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn select(
        &self,
        collection: Collection,
        filters: &[Filter],
        order: Option<Order>,
    ) -> Result<Vec<Value>, AppError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Value> = tables
            .get(collection.name())
            .map(|rows| {
                rows.iter()
                    .filter(|row| Self::matches(row, filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = order {
            rows.sort_by(|a, b| {
                let a = a.get(&order.column).and_then(Value::as_str).unwrap_or("");
                let b = b.get(&order.column).and_then(Value::as_str).unwrap_or("");
                if order.descending { b.cmp(a) } else { a.cmp(b) }
            });
        }

        Ok(rows)
    }

    async fn insert(&self, collection: Collection, row: Value) -> Result<Value, AppError> {
        self.tables
            .lock()
            .await
            .entry(collection.name())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        collection: Collection,
        patch: Value,
        matches: &[Filter],
    ) -> Result<(), AppError> {
        let mut tables = self.tables.lock().await;
        let rows = tables.entry(collection.name()).or_default();

        let patch = patch
            .as_object()
            .ok_or_else(|| AppError::Store("patch must be an object".to_string()))?;
        for row in rows.iter_mut().filter(|row| Self::matches(row, matches)) {
            if let Some(object) = row.as_object_mut() {
                for (key, value) in patch {
                    object.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, collection: Collection, matches: &[Filter]) -> Result<(), AppError> {
        let mut tables = self.tables.lock().await;
        if let Some(rows) = tables.get_mut(collection.name()) {
            rows.retain(|row| !Self::matches(row, matches));
        }
        Ok(())
    }
}

/// Test server instance backed by an in-memory store
///
/// Seed rows through `server.store`, then call `server.refresh()` so the
/// snapshot sees them.
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub client: reqwest::Client,
}

pub fn test_config() -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            domain: "localhost".to_string(),
            protocol: "http".to_string(),
        },
        store: config::StoreConfig {
            base_url: "http://127.0.0.1:1/rest/v1".to_string(),
            api_key: "test-key".to_string(),
            request_timeout_seconds: 5,
            refresh_interval_seconds: 0,
        },
        assist: config::AssistConfig::default(),
        auth: config::AuthConfig {
            session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
            session_max_age: 604_800,
        },
        feed: config::FeedConfig { trending_top_n: 10 },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

impl TestServer {
    /// Create a new test server over a fresh in-memory store
    pub async fn new() -> Self {
        static METRICS_INIT: std::sync::Once = std::sync::Once::new();
        METRICS_INIT.call_once(mimic_social::metrics::init_metrics);

        let config = test_config();
        let store = Arc::new(InMemoryStore::new());
        let dyn_store: Arc<dyn RemoteStore> = store.clone();

        let aggregator = Arc::new(Aggregator::new(dyn_store.clone()));
        aggregator.refresh().await.unwrap();

        let state = AppState {
            config: Arc::new(config),
            store: dyn_store,
            aggregator,
            assist: Arc::new(
                assist::ComposeAssist::new(&config::AssistConfig::default()).unwrap(),
            ),
        };

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = mimic_social::build_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        Self {
            addr: addr_str,
            state,
            store,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Re-pull the snapshot after seeding directly into the store
    pub async fn refresh(&self) {
        self.state.aggregator.refresh().await.unwrap();
    }

    /// Create a signed session token acting as the given profile
    pub fn token_for(&self, owner_id: &str, active_profile_id: &str) -> String {
        let session = Session::new(owner_id.to_string(), 3600)
            .with_active_profile(active_profile_id.to_string());
        create_session_token(&session, &self.state.config.auth.session_secret).unwrap()
    }
}

// =============================================================================
// Row builders
// =============================================================================

pub fn user_row(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "handle": format!("@{id}"),
        "display_name": id,
        "bio": "",
        "kind": "USER",
        "max_characters": 5,
        "status": status,
        "is_moderator": false,
        "password": "pw",
        "roblox_username": format!("{id}_rbx"),
        "discord_username": format!("{id}_dc"),
        "joined_at": "2026-01-01T00:00:00Z",
    })
}

pub fn moderator_row(id: &str) -> Value {
    let mut row = user_row(id, "APPROVED");
    row["is_moderator"] = json!(true);
    row
}

pub fn character_row(id: &str, owner_id: &str) -> Value {
    json!({
        "id": id,
        "handle": format!("@{id}"),
        "display_name": id,
        "bio": "",
        "kind": "CHARACTER",
        "owner_id": owner_id,
        "status": "APPROVED",
        "joined_at": "2026-01-01T00:00:00Z",
    })
}

pub fn post_row(id: &str, author_id: &str, content: &str, created_at: DateTime<Utc>) -> Value {
    json!({
        "id": id,
        "author_id": author_id,
        "content": content,
        "hashtags": mimic_social::service::trends::extract_hashtags(content),
        "created_at": created_at,
    })
}
