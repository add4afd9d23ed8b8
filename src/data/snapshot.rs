//! In-memory snapshot
//!
//! The whole client-visible state is a single immutable `Snapshot`,
//! rebuilt from scratch on every refresh and swapped in behind one
//! handle. Consumers clone an `Arc` and read a consistent view; a racing
//! refresh simply installs a newer total replacement, never a merge.
//!
//! Denormalization joins (followers, likers, comment counts) are done
//! with one hashmap per foreign key, built in a single pass over each
//! relation table.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use super::models::{
    AccountKind, BannedWord, Comment, Credentials, CustomField, Maintenance, MediaKind, MediaRef,
    ModerationStatus, Post, Profile, Report, ReportStatus, ReportTarget, Retirement,
    SupportMessage, DEFAULT_MAX_CHARACTERS,
};
use super::rows::{
    BannedWordRow, BlockRow, CommentLikeRow, CommentRow, FollowRow, LikeRow, MaintenanceRow,
    PostRow, ProfileRow, ReportRow, SupportMessageRow,
};

/// Everything one refresh pulled from the remote store
#[derive(Debug, Default)]
pub struct RawTables {
    pub profiles: Vec<ProfileRow>,
    pub posts: Vec<PostRow>,
    pub likes: Vec<LikeRow>,
    pub comments: Vec<CommentRow>,
    pub comment_likes: Vec<CommentLikeRow>,
    pub follows: Vec<FollowRow>,
    pub blocks: Vec<BlockRow>,
    pub maintenance: Vec<MaintenanceRow>,
    pub banned_words: Vec<BannedWordRow>,
    pub reports: Vec<ReportRow>,
    pub support_messages: Vec<SupportMessageRow>,
}

/// One consistent, versioned view of all collections
///
/// Never mutated after construction. A post whose author id does not
/// resolve stays in `posts` but is dropped from author-joined views by
/// the feed queries.
#[derive(Debug)]
pub struct Snapshot {
    pub version: u64,
    pub fetched_at: DateTime<Utc>,
    pub profiles: Vec<Profile>,
    /// Newest first
    pub posts: Vec<Post>,
    pub comments: Vec<Comment>,
    pub maintenance: Option<Maintenance>,
    pub banned_words: Vec<BannedWord>,
    pub reports: Vec<Report>,
    pub support_messages: Vec<SupportMessage>,
    profile_index: HashMap<String, usize>,
    post_index: HashMap<String, usize>,
}

impl Snapshot {
    /// The state before the first successful refresh
    pub fn empty() -> Self {
        Self {
            version: 0,
            fetched_at: Utc::now(),
            profiles: Vec::new(),
            posts: Vec::new(),
            comments: Vec::new(),
            maintenance: None,
            banned_words: Vec::new(),
            reports: Vec::new(),
            support_messages: Vec::new(),
            profile_index: HashMap::new(),
            post_index: HashMap::new(),
        }
    }

    /// Build a snapshot from raw tables
    ///
    /// One pass per relation table to build the join indexes, one pass
    /// per entity table to map rows into domain models.
    pub fn build(version: u64, tables: RawTables) -> Self {
        // Foreign-key indexes
        let mut followers_of: HashMap<String, Vec<String>> = HashMap::new();
        let mut following_of: HashMap<String, Vec<String>> = HashMap::new();
        for follow in &tables.follows {
            followers_of
                .entry(follow.following_id.clone())
                .or_default()
                .push(follow.follower_id.clone());
            following_of
                .entry(follow.follower_id.clone())
                .or_default()
                .push(follow.following_id.clone());
        }

        let mut blocked_by: HashMap<String, Vec<String>> = HashMap::new();
        for block in &tables.blocks {
            blocked_by
                .entry(block.blocker_id.clone())
                .or_default()
                .push(block.blocked_id.clone());
        }

        let mut post_likers: HashMap<String, Vec<String>> = HashMap::new();
        for like in &tables.likes {
            post_likers
                .entry(like.post_id.clone())
                .or_default()
                .push(like.user_id.clone());
        }

        let mut comment_counts: HashMap<String, usize> = HashMap::new();
        for comment in &tables.comments {
            *comment_counts.entry(comment.post_id.clone()).or_default() += 1;
        }

        let mut comment_likers: HashMap<String, Vec<String>> = HashMap::new();
        for like in &tables.comment_likes {
            comment_likers
                .entry(like.comment_id.clone())
                .or_default()
                .push(like.user_id.clone());
        }

        let profiles: Vec<Profile> = tables
            .profiles
            .into_iter()
            .map(|row| {
                map_profile(
                    row,
                    &mut followers_of,
                    &mut following_of,
                    &mut blocked_by,
                )
            })
            .collect();

        let mut posts: Vec<Post> = tables
            .posts
            .into_iter()
            .map(|row| map_post(row, &mut post_likers, &comment_counts))
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut comments: Vec<Comment> = tables
            .comments
            .into_iter()
            .map(|row| map_comment(row, &mut comment_likers))
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        // The maintenance collection holds at most one row
        let maintenance = tables.maintenance.into_iter().next().map(|row| Maintenance {
            id: row.id,
            active: row.active,
            message: row.message,
            scheduled_restart: row.scheduled_restart,
        });

        let banned_words = tables
            .banned_words
            .into_iter()
            .map(|row| BannedWord {
                id: row.id,
                word: row.word,
                profile_id: row.profile_id,
            })
            .collect();

        let reports = tables
            .reports
            .into_iter()
            .filter_map(map_report)
            .collect::<Vec<_>>();

        let support_messages = tables
            .support_messages
            .into_iter()
            .map(|row| SupportMessage {
                id: row.id,
                sender_id: row.sender_id,
                message: row.message,
                created_at: row.created_at,
            })
            .collect();

        let profile_index = profiles
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        let post_index = posts
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();

        Self {
            version,
            fetched_at: Utc::now(),
            profiles,
            posts,
            comments,
            maintenance,
            banned_words,
            reports,
            support_messages,
            profile_index,
            post_index,
        }
    }

    pub fn profile(&self, id: &str) -> Option<&Profile> {
        self.profile_index.get(id).map(|&i| &self.profiles[i])
    }

    pub fn profile_by_handle(&self, handle: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.handle == handle)
    }

    /// Find the user profile matching a roblox or discord login identifier
    pub fn profile_by_login_identifier(&self, identifier: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| {
            p.credentials.as_ref().is_some_and(|c| {
                c.roblox_username == identifier || c.discord_username == identifier
            })
        })
    }

    pub fn post(&self, id: &str) -> Option<&Post> {
        self.post_index.get(id).map(|&i| &self.posts[i])
    }

    pub fn comment(&self, id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }

    /// Comments on one post, oldest first
    pub fn comments_for_post(&self, post_id: &str) -> Vec<&Comment> {
        self.comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .collect()
    }

    /// Character profiles owned by a user
    pub fn characters_of(&self, owner_id: &str) -> Vec<&Profile> {
        self.profiles
            .iter()
            .filter(|p| p.owner_id() == Some(owner_id))
            .collect()
    }

    pub fn maintenance_active(&self) -> bool {
        self.maintenance.as_ref().is_some_and(|m| m.active)
    }
}

/// Shared handle to the current snapshot
///
/// Reads clone the `Arc`; the refresh writer replaces the pointer. The
/// lock is held only for the swap itself, so a reader always observes
/// one complete state transition.
pub struct SnapshotHandle {
    inner: RwLock<Arc<Snapshot>>,
}

impl SnapshotHandle {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Arc::new(Snapshot::empty())),
        }
    }

    /// The current snapshot
    pub fn current(&self) -> Arc<Snapshot> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Install a freshly built snapshot
    pub fn install(&self, snapshot: Snapshot) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(snapshot);
    }
}

impl Default for SnapshotHandle {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Row -> domain mapping
// =============================================================================

fn map_profile(
    row: ProfileRow,
    followers_of: &mut HashMap<String, Vec<String>>,
    following_of: &mut HashMap<String, Vec<String>>,
    blocked_by: &mut HashMap<String, Vec<String>>,
) -> Profile {
    let status = ModerationStatus::parse(&row.status).unwrap_or_else(|| {
        tracing::warn!(profile = %row.id, status = %row.status, "Unknown moderation status; treating as PENDING");
        ModerationStatus::Pending
    });

    let kind = if row.kind == "CHARACTER" {
        match row.owner_id.clone() {
            Some(owner_id) => AccountKind::Character { owner_id },
            None => {
                tracing::warn!(profile = %row.id, "CHARACTER row without owner; treating as USER");
                AccountKind::User {
                    max_characters: row.max_characters.unwrap_or(DEFAULT_MAX_CHARACTERS),
                }
            }
        }
    } else {
        AccountKind::User {
            max_characters: row.max_characters.unwrap_or(DEFAULT_MAX_CHARACTERS),
        }
    };

    let retirement = map_retirement(&row);

    // Characters never authenticate directly
    let credentials = match &kind {
        AccountKind::Character { .. } => None,
        AccountKind::User { .. } => row.password.clone().map(|password| Credentials {
            password,
            roblox_username: row.roblox_username.clone().unwrap_or_default(),
            discord_username: row.discord_username.clone().unwrap_or_default(),
        }),
    };

    let custom_fields: Vec<CustomField> = row
        .custom_fields
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default();
    let past_names: Vec<String> = row
        .past_names
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default();

    let handle = if row.handle.starts_with('@') {
        row.handle
    } else {
        format!("@{}", row.handle)
    };

    Profile {
        followers: followers_of.remove(&row.id).unwrap_or_default(),
        following: following_of.remove(&row.id).unwrap_or_default(),
        blocked_users: blocked_by.remove(&row.id).unwrap_or_default(),
        id: row.id,
        handle,
        display_name: row.display_name,
        avatar_url: row.avatar_url,
        banner_url: row.banner_url,
        bio: row.bio,
        pronouns: row.pronouns,
        custom_fields,
        career: row.career,
        home_address: row.home_address,
        kind,
        status,
        retirement,
        is_moderator: row.is_moderator,
        banned_until: row.banned_until,
        credentials,
        show_roblox: row.show_roblox,
        show_discord: row.show_discord,
        past_names,
        joined_at: row.joined_at,
    }
}

/// Collapse the backend's independent retirement flags into one reason
///
/// Multiple flags on one row are flagged and resolved deterministically:
/// deceased wins over imprisoned wins over archived.
fn map_retirement(row: &ProfileRow) -> Option<Retirement> {
    let set = [row.is_deceased, row.is_imprisoned, row.is_archived]
        .iter()
        .filter(|flag| **flag)
        .count();
    if set > 1 {
        tracing::warn!(
            profile = %row.id,
            "Multiple retirement flags set on one row; keeping the most severe"
        );
    }

    if row.is_deceased {
        Some(Retirement::Deceased {
            date: row.death_date,
        })
    } else if row.is_imprisoned {
        Some(Retirement::Imprisoned {
            date: row.imprisonment_date,
        })
    } else if row.is_archived {
        Some(Retirement::Archived)
    } else {
        None
    }
}

fn map_post(
    row: PostRow,
    post_likers: &mut HashMap<String, Vec<String>>,
    comment_counts: &HashMap<String, usize>,
) -> Post {
    let media = match (row.media_url, row.media_type.as_deref()) {
        (Some(url), Some(kind)) => MediaKind::parse(kind).map(|kind| MediaRef { url, kind }),
        (Some(url), None) => Some(MediaRef {
            url,
            kind: MediaKind::Image,
        }),
        _ => None,
    };

    Post {
        likes: post_likers.remove(&row.id).unwrap_or_default(),
        comments_count: comment_counts.get(&row.id).copied().unwrap_or(0),
        id: row.id,
        author_id: row.author_id,
        content: row.content,
        media,
        hashtags: row.hashtags.iter().map(|tag| tag.to_lowercase()).collect(),
        created_at: row.created_at,
    }
}

fn map_comment(row: CommentRow, comment_likers: &mut HashMap<String, Vec<String>>) -> Comment {
    Comment {
        likes: comment_likers.remove(&row.id).unwrap_or_default(),
        id: row.id,
        post_id: row.post_id,
        author_id: row.author_id,
        content: row.content,
        created_at: row.created_at,
    }
}

/// A report missing both targets (or carrying both) is dropped as
/// eventually-consistent noise, the same way unresolved authors are.
fn map_report(row: ReportRow) -> Option<Report> {
    let target = match (row.reported_profile_id, row.reported_post_id) {
        (Some(profile_id), None) => ReportTarget::Profile(profile_id),
        (None, Some(post_id)) => ReportTarget::Post(post_id),
        _ => {
            tracing::warn!(report = %row.id, "Report without a single target; dropping");
            return None;
        }
    };

    let status = ReportStatus::parse(&row.status).unwrap_or(ReportStatus::Pending);

    Some(Report {
        id: row.id,
        reporter_id: row.reporter_id,
        target,
        reason: row.reason,
        status,
        created_at: row.created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn profile_row(id: &str) -> ProfileRow {
        ProfileRow {
            id: id.to_string(),
            handle: format!("@{id}"),
            display_name: id.to_string(),
            avatar_url: None,
            banner_url: None,
            bio: String::new(),
            pronouns: None,
            custom_fields: None,
            career: None,
            home_address: None,
            kind: "USER".to_string(),
            owner_id: None,
            max_characters: None,
            status: "APPROVED".to_string(),
            is_moderator: false,
            is_archived: false,
            is_deceased: false,
            death_date: None,
            is_imprisoned: false,
            imprisonment_date: None,
            banned_until: None,
            password: Some("pw".to_string()),
            roblox_username: Some(format!("{id}_rbx")),
            discord_username: Some(format!("{id}_dc")),
            show_roblox: false,
            show_discord: false,
            past_names: None,
            joined_at: Utc::now(),
        }
    }

    fn post_row(id: &str, author: &str, minutes_ago: i64) -> PostRow {
        PostRow {
            id: id.to_string(),
            author_id: author.to_string(),
            content: format!("post {id}"),
            media_url: None,
            media_type: None,
            hashtags: vec![],
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn build_denormalizes_relations() {
        let tables = RawTables {
            profiles: vec![profile_row("u_a"), profile_row("u_b"), profile_row("u_c")],
            posts: vec![post_row("p_1", "u_a", 10), post_row("p_2", "u_b", 5)],
            likes: vec![
                LikeRow {
                    post_id: "p_1".to_string(),
                    user_id: "u_b".to_string(),
                },
                LikeRow {
                    post_id: "p_1".to_string(),
                    user_id: "u_c".to_string(),
                },
            ],
            comments: vec![CommentRow {
                id: "c_1".to_string(),
                post_id: "p_1".to_string(),
                author_id: "u_c".to_string(),
                content: "nice".to_string(),
                created_at: Utc::now(),
            }],
            follows: vec![
                FollowRow {
                    follower_id: "u_b".to_string(),
                    following_id: "u_a".to_string(),
                },
                FollowRow {
                    follower_id: "u_c".to_string(),
                    following_id: "u_a".to_string(),
                },
            ],
            blocks: vec![BlockRow {
                blocker_id: "u_c".to_string(),
                blocked_id: "u_b".to_string(),
            }],
            ..Default::default()
        };

        let snapshot = Snapshot::build(1, tables);

        let a = snapshot.profile("u_a").unwrap();
        assert_eq!(a.followers, vec!["u_b", "u_c"]);
        assert!(a.following.is_empty());

        let b = snapshot.profile("u_b").unwrap();
        assert_eq!(b.following, vec!["u_a"]);

        let c = snapshot.profile("u_c").unwrap();
        assert_eq!(c.blocked_users, vec!["u_b"]);

        let p1 = snapshot.post("p_1").unwrap();
        assert_eq!(p1.likes, vec!["u_b", "u_c"]);
        assert_eq!(p1.comments_count, 1);

        // Newest first
        assert_eq!(snapshot.posts[0].id, "p_2");
        assert_eq!(snapshot.posts[1].id, "p_1");
    }

    #[test]
    fn orphan_posts_stay_in_the_collection() {
        let tables = RawTables {
            profiles: vec![profile_row("u_a")],
            posts: vec![post_row("p_orphan", "u_gone", 1)],
            ..Default::default()
        };

        let snapshot = Snapshot::build(1, tables);
        assert!(snapshot.post("p_orphan").is_some());
        assert!(snapshot.profile("u_gone").is_none());
    }

    #[test]
    fn conflicting_retirement_flags_resolve_to_most_severe() {
        let mut row = profile_row("u_char");
        row.kind = "CHARACTER".to_string();
        row.owner_id = Some("u_a".to_string());
        row.is_archived = true;
        row.is_deceased = true;

        let snapshot = Snapshot::build(
            1,
            RawTables {
                profiles: vec![profile_row("u_a"), row],
                ..Default::default()
            },
        );

        let character = snapshot.profile("u_char").unwrap();
        assert!(matches!(
            character.retirement,
            Some(Retirement::Deceased { .. })
        ));
        // Characters never carry a credential flow
        assert!(character.credentials.is_none());
    }

    #[test]
    fn handle_gains_sigil_when_missing() {
        let mut row = profile_row("u_a");
        row.handle = "plain".to_string();
        let snapshot = Snapshot::build(
            1,
            RawTables {
                profiles: vec![row],
                ..Default::default()
            },
        );
        assert_eq!(snapshot.profile("u_a").unwrap().handle, "@plain");
    }

    #[test]
    fn install_replaces_the_whole_snapshot() {
        let handle = SnapshotHandle::new();
        assert_eq!(handle.current().version, 0);

        let before = handle.current();
        handle.install(Snapshot::build(
            1,
            RawTables {
                profiles: vec![profile_row("u_a")],
                ..Default::default()
            },
        ));

        assert_eq!(handle.current().version, 1);
        // The previously handed-out snapshot is untouched
        assert_eq!(before.version, 0);
        assert!(before.profiles.is_empty());
    }
}
