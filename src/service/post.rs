//! Post service
//!
//! Post creation (policy-checked), likes, comments, and the feed views
//! computed from the current snapshot.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::data::{
    Collection, Comment, EntityId, Filter, MediaKind, ModerationStatus, Post, Profile,
    RemoteStore,
};
use crate::error::AppError;
use crate::service::{policy, trends, Aggregator};

/// A new post draft
#[derive(Debug, Clone)]
pub struct NewPost {
    pub content: String,
    pub media_url: Option<String>,
    pub media_kind: Option<MediaKind>,
}

/// Post service
pub struct PostService {
    store: Arc<dyn RemoteStore>,
    aggregator: Arc<Aggregator>,
}

impl PostService {
    /// Create new post service
    pub fn new(store: Arc<dyn RemoteStore>, aggregator: Arc<Aggregator>) -> Self {
        Self { store, aggregator }
    }

    /// Check a profile may author content right now
    fn require_author<'a>(
        snapshot: &'a crate::data::Snapshot,
        author_id: &str,
    ) -> Result<&'a Profile, AppError> {
        let author = snapshot.profile(author_id).ok_or(AppError::Unauthorized)?;

        if author.status != ModerationStatus::Approved {
            return Err(AppError::Forbidden(format!(
                "account is {}",
                author.status.as_str().to_lowercase()
            )));
        }
        if author.is_banned(Utc::now()) {
            return Err(AppError::Forbidden("account is banned".to_string()));
        }
        if let Some(retirement) = &author.retirement {
            return Err(AppError::Forbidden(format!(
                "character is {}",
                retirement.label()
            )));
        }

        Ok(author)
    }

    // =========================================================================
    // Posting
    // =========================================================================

    /// Create a post
    ///
    /// The banned-word check runs before the insert; on a match no write
    /// is attempted and the matched word is reported. Hashtags are
    /// extracted lower-cased with duplicates preserved.
    pub async fn create_post(&self, author_id: &str, draft: NewPost) -> Result<Post, AppError> {
        let snapshot = self.aggregator.snapshot();
        Self::require_author(&snapshot, author_id)?;

        let content = draft.content.trim().to_string();
        if content.is_empty() && draft.media_url.is_none() {
            return Err(AppError::Validation(
                "post needs content or media".to_string(),
            ));
        }

        if let Some(matched) = policy::check_banned(&content, author_id, &snapshot.banned_words) {
            return Err(AppError::Validation(format!(
                "content contains a banned word: {}",
                matched.word
            )));
        }

        let hashtags = trends::extract_hashtags(&content);

        let id = EntityId::new().0;
        let row = json!({
            "id": id,
            "author_id": author_id,
            "content": content,
            "media_url": draft.media_url,
            "media_type": draft.media_kind.map(|kind| kind.as_str()),
            "hashtags": hashtags,
            "created_at": Utc::now(),
        });
        self.store.insert(Collection::Posts, row).await?;

        let snapshot = self.aggregator.refresh().await?;
        snapshot
            .post(&id)
            .cloned()
            .ok_or_else(|| AppError::Store("post missing after refresh".to_string()))
    }

    /// Like a post (idempotent)
    pub async fn like_post(&self, actor_id: &str, post_id: &str) -> Result<(), AppError> {
        let snapshot = self.aggregator.snapshot();
        let post = snapshot.post(post_id).ok_or(AppError::NotFound)?;
        if post.is_liked_by(actor_id) {
            return Ok(());
        }

        self.store
            .insert(
                Collection::Likes,
                json!({ "post_id": post_id, "user_id": actor_id }),
            )
            .await?;
        self.aggregator.refresh().await?;
        Ok(())
    }

    /// Remove a like from a post
    pub async fn unlike_post(&self, actor_id: &str, post_id: &str) -> Result<(), AppError> {
        self.store
            .delete(
                Collection::Likes,
                &[
                    Filter::eq("post_id", post_id),
                    Filter::eq("user_id", actor_id),
                ],
            )
            .await?;
        self.aggregator.refresh().await?;
        Ok(())
    }

    // =========================================================================
    // Comments
    // =========================================================================

    /// Comment on a post
    pub async fn create_comment(
        &self,
        author_id: &str,
        post_id: &str,
        content: &str,
    ) -> Result<Comment, AppError> {
        let snapshot = self.aggregator.snapshot();
        Self::require_author(&snapshot, author_id)?;
        snapshot.post(post_id).ok_or(AppError::NotFound)?;

        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation(
                "comment cannot be empty".to_string(),
            ));
        }

        let id = EntityId::new().0;
        let row = json!({
            "id": id,
            "post_id": post_id,
            "author_id": author_id,
            "content": content,
            "created_at": Utc::now(),
        });
        self.store.insert(Collection::Comments, row).await?;

        let snapshot = self.aggregator.refresh().await?;
        snapshot
            .comment(&id)
            .cloned()
            .ok_or_else(|| AppError::Store("comment missing after refresh".to_string()))
    }

    /// Like a comment (idempotent)
    pub async fn like_comment(&self, actor_id: &str, comment_id: &str) -> Result<(), AppError> {
        let snapshot = self.aggregator.snapshot();
        let comment = snapshot.comment(comment_id).ok_or(AppError::NotFound)?;
        if comment.likes.iter().any(|id| id == actor_id) {
            return Ok(());
        }

        self.store
            .insert(
                Collection::CommentLikes,
                json!({ "comment_id": comment_id, "user_id": actor_id }),
            )
            .await?;
        self.aggregator.refresh().await?;
        Ok(())
    }

    // =========================================================================
    // Feeds
    // =========================================================================

    /// The home feed for a viewer, newest first
    ///
    /// Excludes posts whose author does not resolve (silent drop) and
    /// posts from authors the viewer blocked or who blocked the viewer.
    /// The full post collection stays intact in the snapshot.
    pub fn home_feed(&self, viewer_id: &str) -> Vec<Post> {
        let snapshot = self.aggregator.snapshot();
        let viewer = snapshot.profile(viewer_id);

        snapshot
            .posts
            .iter()
            .filter(|post| match snapshot.profile(&post.author_id) {
                None => false,
                Some(author) => match viewer {
                    None => true,
                    Some(viewer) => {
                        !viewer.has_blocked(&author.id) && !author.has_blocked(&viewer.id)
                    }
                },
            })
            .cloned()
            .collect()
    }

    /// One author's posts, newest first
    pub fn profile_feed(&self, author_id: &str) -> Vec<Post> {
        let snapshot = self.aggregator.snapshot();
        snapshot
            .posts
            .iter()
            .filter(|post| post.author_id == author_id)
            .cloned()
            .collect()
    }

    /// Trending hashtags over the current snapshot
    pub fn trending(&self, top_n: usize) -> Vec<trends::Trend> {
        let snapshot = self.aggregator.snapshot();
        trends::trending(&snapshot.posts, top_n)
    }
}
