//! E2E tests for posting, feeds, likes, comments and trends

mod common;

use chrono::{Duration, Utc};
use common::{TestServer, character_row, moderator_row, post_row, user_row};
use mimic_social::data::Collection;
use serde_json::json;

#[tokio::test]
async fn test_pending_author_cannot_post_until_approved() {
    let server = TestServer::new().await;
    server
        .store
        .seed(
            Collection::Profiles,
            vec![user_row("alice", "PENDING"), moderator_row("u_mod")],
        )
        .await;
    server.refresh().await;

    let token = server.token_for("alice", "alice");

    // PENDING: refused, nothing written
    let refused = server
        .client
        .post(&server.url("/api/v1/posts"))
        .header("Authorization", format!("Bearer {token}"))
        .json(&json!({ "content": "hello #world #World" }))
        .send()
        .await
        .unwrap();
    assert_eq!(refused.status(), 403);
    assert_eq!(server.store.count(Collection::Posts).await, 0);

    // Moderator approves the application
    let mod_token = server.token_for("u_mod", "u_mod");
    let approved = server
        .client
        .post(&server.url("/api/v1/admin/applications/alice/review"))
        .header("Authorization", format!("Bearer {mod_token}"))
        .json(&json!({ "approve": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(approved.status(), 200);

    // Now the post goes through, hashtags case-folded and not deduped
    let created = server
        .client
        .post(&server.url("/api/v1/posts"))
        .header("Authorization", format!("Bearer {token}"))
        .json(&json!({ "content": "hello #world #World" }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 200);
    let post: serde_json::Value = created.json().await.unwrap();
    assert_eq!(post["hashtags"], json!(["world", "world"]));
    let post_id = post["id"].as_str().unwrap().to_string();

    // Visible in the author's profile feed
    let profile_feed = server
        .client
        .get(&server.url("/api/v1/profiles/alice/posts"))
        .send()
        .await
        .unwrap();
    let posts: Vec<serde_json::Value> = profile_feed.json().await.unwrap();
    assert!(posts.iter().any(|p| p["id"] == post_id.as_str()));

    // And in the global home feed
    let home = server
        .client
        .get(&server.url("/api/v1/timeline/home"))
        .header("Authorization", format!("Bearer {mod_token}"))
        .send()
        .await
        .unwrap();
    let posts: Vec<serde_json::Value> = home.json().await.unwrap();
    assert!(posts.iter().any(|p| p["id"] == post_id.as_str()));
}

#[tokio::test]
async fn test_banned_word_blocks_the_write_and_names_the_word() {
    let server = TestServer::new().await;
    server
        .store
        .seed(
            Collection::Profiles,
            vec![user_row("bob", "APPROVED"), user_row("carl", "APPROVED")],
        )
        .await;
    server
        .store
        .seed(
            Collection::BannedWords,
            vec![
                json!({ "id": "w_1", "word": "Grape", "profile_id": null }),
                json!({ "id": "w_2", "word": "melon", "profile_id": "carl" }),
            ],
        )
        .await;
    server.refresh().await;

    // Global word, any casing
    let token = server.token_for("bob", "bob");
    let blocked = server
        .client
        .post(&server.url("/api/v1/posts"))
        .header("Authorization", format!("Bearer {token}"))
        .json(&json!({ "content": "I love GRAPES" }))
        .send()
        .await
        .unwrap();
    assert_eq!(blocked.status(), 400);
    let body: serde_json::Value = blocked.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Grape"));
    assert_eq!(server.store.count(Collection::Posts).await, 0);

    // Scoped word only hits its own author
    let fine = server
        .client
        .post(&server.url("/api/v1/posts"))
        .header("Authorization", format!("Bearer {token}"))
        .json(&json!({ "content": "melon season" }))
        .send()
        .await
        .unwrap();
    assert_eq!(fine.status(), 200);

    let carl_token = server.token_for("carl", "carl");
    let scoped = server
        .client
        .post(&server.url("/api/v1/posts"))
        .header("Authorization", format!("Bearer {carl_token}"))
        .json(&json!({ "content": "melon season" }))
        .send()
        .await
        .unwrap();
    assert_eq!(scoped.status(), 400);
}

#[tokio::test]
async fn test_blocking_hides_the_author_from_the_viewer_feed_only() {
    let server = TestServer::new().await;
    server
        .store
        .seed(
            Collection::Profiles,
            vec![user_row("viewer", "APPROVED"), user_row("author", "APPROVED")],
        )
        .await;
    server
        .store
        .seed(
            Collection::Posts,
            vec![post_row("p_1", "author", "post one", Utc::now())],
        )
        .await;
    server.refresh().await;

    let token = server.token_for("viewer", "viewer");

    // Visible before the block
    let before = server
        .client
        .get(&server.url("/api/v1/timeline/home"))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await
        .unwrap();
    let posts: Vec<serde_json::Value> = before.json().await.unwrap();
    assert_eq!(posts.len(), 1);

    // Block the author
    let blocked = server
        .client
        .post(&server.url("/api/v1/profiles/author/block"))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(blocked.status(), 200);

    // Gone from the viewer's home feed
    let after = server
        .client
        .get(&server.url("/api/v1/timeline/home"))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await
        .unwrap();
    let posts: Vec<serde_json::Value> = after.json().await.unwrap();
    assert!(posts.is_empty());

    // The post itself survives in the full collection
    assert_eq!(server.store.count(Collection::Posts).await, 1);
    assert_eq!(server.state.aggregator.snapshot().posts.len(), 1);

    // And the author's own feed still shows it
    let author_token = server.token_for("author", "author");
    let author_home = server
        .client
        .get(&server.url("/api/v1/timeline/home"))
        .header("Authorization", format!("Bearer {author_token}"))
        .send()
        .await
        .unwrap();
    let posts: Vec<serde_json::Value> = author_home.json().await.unwrap();
    assert_eq!(posts.len(), 1);
}

#[tokio::test]
async fn test_follow_then_unfollow_round_trip() {
    let server = TestServer::new().await;
    server
        .store
        .seed(
            Collection::Profiles,
            vec![user_row("a", "APPROVED"), user_row("u", "APPROVED")],
        )
        .await;
    server.refresh().await;

    let token = server.token_for("a", "a");

    server
        .client
        .post(&server.url("/api/v1/profiles/u/follow"))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await
        .unwrap();

    let profile: serde_json::Value = server
        .client
        .get(&server.url("/api/v1/profiles/u"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["followers"], json!(["a"]));

    server
        .client
        .delete(&server.url("/api/v1/profiles/u/follow"))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await
        .unwrap();

    let profile: serde_json::Value = server
        .client
        .get(&server.url("/api/v1/profiles/u"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["followers"], json!([]));
}

#[tokio::test]
async fn test_likes_and_comments_denormalize_onto_the_post() {
    let server = TestServer::new().await;
    server
        .store
        .seed(
            Collection::Profiles,
            vec![user_row("a", "APPROVED"), user_row("b", "APPROVED")],
        )
        .await;
    server
        .store
        .seed(
            Collection::Posts,
            vec![post_row("p_1", "a", "first", Utc::now())],
        )
        .await;
    server.refresh().await;

    let token = server.token_for("b", "b");

    server
        .client
        .post(&server.url("/api/v1/posts/p_1/like"))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await
        .unwrap();
    let comment = server
        .client
        .post(&server.url("/api/v1/posts/p_1/comments"))
        .header("Authorization", format!("Bearer {token}"))
        .json(&json!({ "content": "nice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(comment.status(), 200);
    let comment: serde_json::Value = comment.json().await.unwrap();

    let feed: Vec<serde_json::Value> = server
        .client
        .get(&server.url("/api/v1/profiles/a/posts"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(feed[0]["likes"], json!(["b"]));
    assert_eq!(feed[0]["comments_count"], 1);

    // Like the comment too
    let comment_id = comment["id"].as_str().unwrap();
    server
        .client
        .post(&server.url(&format!("/api/v1/comments/{comment_id}/like")))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await
        .unwrap();

    let comments: Vec<serde_json::Value> = server
        .client
        .get(&server.url("/api/v1/posts/p_1/comments"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["likes"], json!(["b"]));

    // Unlike the post
    server
        .client
        .delete(&server.url("/api/v1/posts/p_1/like"))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await
        .unwrap();
    let feed: Vec<serde_json::Value> = server
        .client
        .get(&server.url("/api/v1/profiles/a/posts"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(feed[0]["likes"], json!([]));
}

#[tokio::test]
async fn test_trending_ranks_stably_and_truncates() {
    let server = TestServer::new().await;
    server
        .store
        .seed(Collection::Profiles, vec![user_row("a", "APPROVED")])
        .await;

    // a and b tie at 3, c trails with 1; a is encountered first in the
    // newest-first post ordering
    let base = Utc::now();
    server
        .store
        .seed(
            Collection::Posts,
            vec![
                post_row("p_1", "a", "#a #b", base),
                post_row("p_2", "a", "#a #b #c", base - Duration::minutes(1)),
                post_row("p_3", "a", "#a #b", base - Duration::minutes(2)),
            ],
        )
        .await;
    server.refresh().await;

    let trends: Vec<serde_json::Value> = server
        .client
        .get(&server.url("/api/v1/trends"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(trends.len(), 3);
    assert_eq!(trends[0], json!({ "hashtag": "a", "count": 3 }));
    assert_eq!(trends[1], json!({ "hashtag": "b", "count": 3 }));
    assert_eq!(trends[2], json!({ "hashtag": "c", "count": 1 }));
}

#[tokio::test]
async fn test_character_quota_rejects_the_sixth_with_no_write() {
    let server = TestServer::new().await;
    let mut rows = vec![user_row("owner", "APPROVED")];
    for i in 0..5 {
        rows.push(character_row(&format!("c_{i}"), "owner"));
    }
    server.store.seed(Collection::Profiles, rows).await;
    server.refresh().await;

    let token = server.token_for("owner", "owner");
    let response = server
        .client
        .post(&server.url("/api/v1/characters"))
        .header("Authorization", format!("Bearer {token}"))
        .json(&json!({ "display_name": "One Too Many", "handle": "c_overflow" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    // The existing six rows (owner + 5 characters) are untouched
    assert_eq!(server.store.count(Collection::Profiles).await, 6);
}

#[tokio::test]
async fn test_retiring_a_character_frees_quota() {
    let server = TestServer::new().await;
    let mut rows = vec![user_row("owner", "APPROVED")];
    for i in 0..5 {
        rows.push(character_row(&format!("c_{i}"), "owner"));
    }
    server.store.seed(Collection::Profiles, rows).await;
    server.refresh().await;

    let token = server.token_for("owner", "owner");

    let retired = server
        .client
        .post(&server.url("/api/v1/characters/c_0/retire"))
        .header("Authorization", format!("Bearer {token}"))
        .json(&json!({ "reason": "archived" }))
        .send()
        .await
        .unwrap();
    assert_eq!(retired.status(), 200);

    let response = server
        .client
        .post(&server.url("/api/v1/characters"))
        .header("Authorization", format!("Bearer {token}"))
        .json(&json!({ "display_name": "Fresh Face", "handle": "c_fresh" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}
