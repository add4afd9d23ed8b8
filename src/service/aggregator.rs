//! Snapshot aggregator
//!
//! Pulls every backing collection concurrently, denormalizes the
//! relations, and installs a new snapshot as one state transition.
//! If any sub-fetch fails the whole refresh fails and the previous
//! snapshot stays in place (stale but consistent).
//!
//! Only one logical refresh is in flight at a time by convention; a
//! racing refresh harmlessly installs the later total replacement.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;

use crate::data::{
    decode_rows, BannedWordRow, BlockRow, Collection, CommentLikeRow, CommentRow, FollowRow,
    LikeRow, MaintenanceRow, Order, PostRow, ProfileRow, RawTables, RemoteStore, ReportRow,
    Snapshot, SnapshotHandle, SupportMessageRow,
};
use crate::error::AppError;
use crate::metrics::{
    REFRESH_DURATION_SECONDS, REFRESHES_TOTAL, SNAPSHOT_POSTS, SNAPSHOT_PROFILES, SNAPSHOT_VERSION,
};

/// Owns the snapshot handle and the refresh cycle
pub struct Aggregator {
    store: Arc<dyn RemoteStore>,
    snapshot: SnapshotHandle,
    next_version: AtomicU64,
}

impl Aggregator {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            snapshot: SnapshotHandle::new(),
            next_version: AtomicU64::new(1),
        }
    }

    /// The current snapshot (possibly the empty pre-refresh state)
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.current()
    }

    /// Pull all collections and install a fresh snapshot
    ///
    /// # Errors
    /// Any failed sub-fetch fails the refresh as a whole; the cached
    /// snapshot is left untouched.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, AppError> {
        let timer = REFRESH_DURATION_SECONDS.start_timer();

        let tables = match self.fetch_tables().await {
            Ok(tables) => tables,
            Err(error) => {
                REFRESHES_TOTAL.with_label_values(&["failure"]).inc();
                tracing::error!(%error, "Snapshot refresh failed; keeping previous snapshot");
                return Err(error);
            }
        };

        let version = self.next_version.fetch_add(1, Ordering::Relaxed);
        let snapshot = Snapshot::build(version, tables);

        SNAPSHOT_VERSION.set(snapshot.version as i64);
        SNAPSHOT_PROFILES.set(snapshot.profiles.len() as i64);
        SNAPSHOT_POSTS.set(snapshot.posts.len() as i64);

        tracing::info!(
            version = snapshot.version,
            profiles = snapshot.profiles.len(),
            posts = snapshot.posts.len(),
            comments = snapshot.comments.len(),
            reports = snapshot.reports.len(),
            "Snapshot refreshed"
        );

        self.snapshot.install(snapshot);
        REFRESHES_TOTAL.with_label_values(&["success"]).inc();
        timer.observe_duration();

        Ok(self.snapshot.current())
    }

    /// Issue all collection reads concurrently
    async fn fetch_tables(&self) -> Result<RawTables, AppError> {
        let (
            profiles,
            posts,
            likes,
            comments,
            comment_likes,
            follows,
            blocks,
            maintenance,
            banned_words,
            reports,
            support_messages,
        ) = futures::try_join!(
            self.fetch::<ProfileRow>(Collection::Profiles, None),
            self.fetch::<PostRow>(Collection::Posts, Some(Order::desc("created_at"))),
            self.fetch::<LikeRow>(Collection::Likes, None),
            self.fetch::<CommentRow>(Collection::Comments, None),
            self.fetch::<CommentLikeRow>(Collection::CommentLikes, None),
            self.fetch::<FollowRow>(Collection::Follows, None),
            self.fetch::<BlockRow>(Collection::Blocks, None),
            self.fetch::<MaintenanceRow>(Collection::Maintenance, None),
            self.fetch::<BannedWordRow>(Collection::BannedWords, None),
            self.fetch::<ReportRow>(Collection::Reports, None),
            self.fetch::<SupportMessageRow>(Collection::SupportMessages, None),
        )?;

        Ok(RawTables {
            profiles,
            posts,
            likes,
            comments,
            comment_likes,
            follows,
            blocks,
            maintenance,
            banned_words,
            reports,
            support_messages,
        })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        collection: Collection,
        order: Option<Order>,
    ) -> Result<Vec<T>, AppError> {
        let rows = self.store.select(collection, &[], order).await?;
        decode_rows(rows)
    }
}
