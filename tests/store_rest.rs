//! REST store adapter tests against a stubbed backend

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mimic_social::config::StoreConfig;
use mimic_social::data::{Collection, Filter, Order, RemoteStore, RestStore};
use mimic_social::error::AppError;

fn store_for(mock: &MockServer) -> RestStore {
    RestStore::new(&StoreConfig {
        base_url: format!("{}/rest/v1", mock.uri()),
        api_key: "service-key".to_string(),
        request_timeout_seconds: 5,
        refresh_interval_seconds: 0,
    })
    .unwrap()
}

#[tokio::test]
async fn select_sends_filters_order_and_auth_headers() {
    let mock = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/posts"))
        .and(query_param("author_id", "eq.u_1"))
        .and(query_param("order", "created_at.desc"))
        .and(header("apikey", "service-key"))
        .and(header("Authorization", "Bearer service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "p_1", "author_id": "u_1" }
        ])))
        .expect(1)
        .mount(&mock)
        .await;

    let store = store_for(&mock);
    let rows = store
        .select(
            Collection::Posts,
            &[Filter::eq("author_id", "u_1")],
            Some(Order::desc("created_at")),
        )
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], "p_1");
}

#[tokio::test]
async fn insert_asks_for_representation_and_returns_the_stored_row() {
    let mock = MockServer::start().await;

    let row = json!({ "post_id": "p_1", "user_id": "u_1" });
    Mock::given(method("POST"))
        .and(path("/rest/v1/likes"))
        .and(header("Prefer", "return=representation"))
        .and(body_json(row.clone()))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            { "post_id": "p_1", "user_id": "u_1", "created_at": "2026-01-01T00:00:00Z" }
        ])))
        .expect(1)
        .mount(&mock)
        .await;

    let store = store_for(&mock);
    let stored = store.insert(Collection::Likes, row).await.unwrap();
    assert_eq!(stored["created_at"], "2026-01-01T00:00:00Z");
}

#[tokio::test]
async fn update_patches_matching_rows() {
    let mock = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("id", "eq.u_1"))
        .and(body_json(json!({ "status": "APPROVED" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock)
        .await;

    let store = store_for(&mock);
    store
        .update(
            Collection::Profiles,
            json!({ "status": "APPROVED" }),
            &[Filter::eq("id", "u_1")],
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_targets_the_match_keys() {
    let mock = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/likes"))
        .and(query_param("post_id", "eq.p_1"))
        .and(query_param("user_id", "eq.u_1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock)
        .await;

    let store = store_for(&mock);
    store
        .delete(
            Collection::Likes,
            &[Filter::eq("post_id", "p_1"), Filter::eq("user_id", "u_1")],
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn backend_failure_surfaces_the_message() {
    let mock = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(
            ResponseTemplate::new(409).set_body_string("duplicate key value violates unique constraint"),
        )
        .mount(&mock)
        .await;

    let store = store_for(&mock);
    let error = store
        .select(Collection::Profiles, &[], None)
        .await
        .unwrap_err();

    match error {
        AppError::Store(message) => {
            assert!(message.contains("profiles"));
            assert!(message.contains("409"));
            assert!(message.contains("duplicate key"));
        }
        other => panic!("expected store error, got {other:?}"),
    }
}

#[tokio::test]
async fn filter_values_are_percent_encoded_on_the_wire() {
    let mock = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("handle", "eq.@alice w"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock)
        .await;

    let store = store_for(&mock);
    let rows = store
        .select(
            Collection::Profiles,
            &[Filter::eq("handle", "@alice w")],
            None,
        )
        .await
        .unwrap();
    assert!(rows.is_empty());
}
