//! Raw collection row schemas
//!
//! One explicit struct per backend collection, mirroring the column names
//! the remote store returns. Domain mapping happens in `snapshot`; nothing
//! outside the data layer should touch these shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Named collections on the remote store.
///
/// The set and the column names are fixed by this design; the store
/// adapter treats them as opaque path segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Profiles,
    Posts,
    Likes,
    Comments,
    CommentLikes,
    Follows,
    Blocks,
    Maintenance,
    BannedWords,
    Reports,
    SupportMessages,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Profiles => "profiles",
            Self::Posts => "posts",
            Self::Likes => "likes",
            Self::Comments => "comments",
            Self::CommentLikes => "comment_likes",
            Self::Follows => "follows",
            Self::Blocks => "blocks",
            Self::Maintenance => "maintenance",
            Self::BannedWords => "banned_words",
            Self::Reports => "reports",
            Self::SupportMessages => "support_messages",
        }
    }

    /// All collections, in the order a full refresh fetches them.
    pub const ALL: [Collection; 11] = [
        Self::Profiles,
        Self::Posts,
        Self::Likes,
        Self::Comments,
        Self::CommentLikes,
        Self::Follows,
        Self::Blocks,
        Self::Maintenance,
        Self::BannedWords,
        Self::Reports,
        Self::SupportMessages,
    ];
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Profile
// =============================================================================

/// A row of the `profiles` collection
///
/// Holds both user accounts and character sub-accounts; `kind` plus
/// `owner_id` distinguish them. Retirement is stored as independent flags
/// on the backend; the snapshot mapping collapses them into a tagged value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: String,
    pub handle: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub banner_url: Option<String>,
    #[serde(default)]
    pub bio: String,
    pub pronouns: Option<String>,
    /// JSON array of {label, value} pairs
    #[serde(default)]
    pub custom_fields: Option<serde_json::Value>,
    pub career: Option<String>,
    pub home_address: Option<String>,
    /// "USER" or "CHARACTER"
    #[serde(default = "default_profile_kind")]
    pub kind: String,
    /// Owning user id for CHARACTER rows, null for USER rows
    pub owner_id: Option<String>,
    /// Character quota for USER rows
    pub max_characters: Option<u32>,
    /// "PENDING", "APPROVED" or "REJECTED"
    pub status: String,
    #[serde(default)]
    pub is_moderator: bool,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_deceased: bool,
    pub death_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_imprisoned: bool,
    pub imprisonment_date: Option<DateTime<Utc>>,
    pub banned_until: Option<DateTime<Utc>>,
    pub password: Option<String>,
    pub roblox_username: Option<String>,
    pub discord_username: Option<String>,
    #[serde(default)]
    pub show_roblox: bool,
    #[serde(default)]
    pub show_discord: bool,
    /// JSON array of previous display names, oldest first
    #[serde(default)]
    pub past_names: Option<serde_json::Value>,
    pub joined_at: DateTime<Utc>,
}

fn default_profile_kind() -> String {
    "USER".to_string()
}

// =============================================================================
// Post / Comment
// =============================================================================

/// A row of the `posts` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRow {
    pub id: String,
    pub author_id: String,
    #[serde(default)]
    pub content: String,
    pub media_url: Option<String>,
    /// "image" or "video"
    pub media_type: Option<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A row of the `comments` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    #[serde(default)]
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Relation rows
// =============================================================================

/// A row of the `likes` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeRow {
    pub post_id: String,
    pub user_id: String,
}

/// A row of the `comment_likes` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentLikeRow {
    pub comment_id: String,
    pub user_id: String,
}

/// A row of the `follows` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowRow {
    pub follower_id: String,
    pub following_id: String,
}

/// A row of the `blocks` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRow {
    pub blocker_id: String,
    pub blocked_id: String,
}

// =============================================================================
// Moderation rows
// =============================================================================

/// The singleton `maintenance` row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceRow {
    pub id: String,
    pub active: bool,
    #[serde(default)]
    pub message: String,
    pub scheduled_restart: Option<DateTime<Utc>>,
}

/// A row of the `banned_words` collection
///
/// `profile_id = null` means the word applies to every author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannedWordRow {
    pub id: String,
    pub word: String,
    pub profile_id: Option<String>,
}

/// A row of the `reports` collection
///
/// Exactly one of `reported_profile_id` / `reported_post_id` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRow {
    pub id: String,
    pub reporter_id: String,
    pub reported_profile_id: Option<String>,
    pub reported_post_id: Option<String>,
    #[serde(default)]
    pub reason: String,
    /// "PENDING", "REVIEWED" or "ACTIONED"
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// A row of the `support_messages` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportMessageRow {
    pub id: String,
    pub sender_id: String,
    #[serde(default)]
    pub message: String,
    pub created_at: DateTime<Utc>,
}
