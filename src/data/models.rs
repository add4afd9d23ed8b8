//! Domain models
//!
//! View-ready entities the snapshot exposes to the service and API layers.
//! All models use ULID for IDs and chrono for timestamps. Relation sets
//! (followers, likers, blocks) are denormalized onto the owning entity
//! during snapshot construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Account lifecycle
// =============================================================================

/// Profile moderation status
///
/// Gates login and content creation. PENDING transitions to APPROVED or
/// REJECTED through a moderator review; there is no way back to PENDING.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Why a character account is out of circulation
///
/// One reason at a time; setting a new reason replaces the old one.
/// Set by the owning user, cleared only by a moderator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Retirement {
    Archived,
    Deceased { date: Option<DateTime<Utc>> },
    Imprisoned { date: Option<DateTime<Utc>> },
}

impl Retirement {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Archived => "archived",
            Self::Deceased { .. } => "deceased",
            Self::Imprisoned { .. } => "imprisoned",
        }
    }
}

/// User account vs character sub-account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKind {
    /// A real account holder with a character quota
    User { max_characters: u32 },
    /// A roleplay sub-identity reached only through its owning user
    Character { owner_id: String },
}

/// Default character quota for user accounts
pub const DEFAULT_MAX_CHARACTERS: u32 = 5;

// =============================================================================
// Profile
// =============================================================================

/// Login identifiers and password
///
/// Never serialized into API responses; the converters redact it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub password: String,
    pub roblox_username: String,
    pub discord_username: String,
}

/// A custom {label, value} profile field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub label: String,
    pub value: String,
}

/// A user or character account, denormalized for the view layer
#[derive(Debug, Clone)]
pub struct Profile {
    pub id: String,
    /// Unique, always carries the leading "@"
    pub handle: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub banner_url: Option<String>,
    pub bio: String,
    pub pronouns: Option<String>,
    pub custom_fields: Vec<CustomField>,
    pub career: Option<String>,
    pub home_address: Option<String>,
    pub kind: AccountKind,
    pub status: ModerationStatus,
    pub retirement: Option<Retirement>,
    pub is_moderator: bool,
    /// A value in the past is equivalent to not banned
    pub banned_until: Option<DateTime<Utc>>,
    /// None for character rows (characters never authenticate directly)
    pub credentials: Option<Credentials>,
    pub show_roblox: bool,
    pub show_discord: bool,
    /// Profile ids following this profile
    pub followers: Vec<String>,
    /// Profile ids this profile follows
    pub following: Vec<String>,
    /// Profile ids this profile has blocked
    pub blocked_users: Vec<String>,
    /// Previous display names, oldest first
    pub past_names: Vec<String>,
    pub joined_at: DateTime<Utc>,
}

impl Profile {
    pub fn is_character(&self) -> bool {
        matches!(self.kind, AccountKind::Character { .. })
    }

    /// Owning user id for characters, None for users
    pub fn owner_id(&self) -> Option<&str> {
        match &self.kind {
            AccountKind::Character { owner_id } => Some(owner_id),
            AccountKind::User { .. } => None,
        }
    }

    pub fn is_retired(&self) -> bool {
        self.retirement.is_some()
    }

    /// Whether a ban is in force at `now`
    pub fn is_banned(&self, now: DateTime<Utc>) -> bool {
        self.banned_until.is_some_and(|until| now < until)
    }

    pub fn has_blocked(&self, other_id: &str) -> bool {
        self.blocked_users.iter().any(|id| id == other_id)
    }
}

// =============================================================================
// Post / Comment
// =============================================================================

/// Kind tag for the single optional media reference on a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

/// Media attached to a post (URL or inline-encoded reference)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    pub kind: MediaKind,
}

/// A post, immutable except for the derived liker set and comment count
#[derive(Debug, Clone)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub content: String,
    pub media: Option<MediaRef>,
    /// Lower-cased, extracted from content at creation, duplicates kept
    pub hashtags: Vec<String>,
    /// Liker profile ids, derived from the likes collection
    pub likes: Vec<String>,
    /// Derived from the comments collection
    pub comments_count: usize,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn is_liked_by(&self, profile_id: &str) -> bool {
        self.likes.iter().any(|id| id == profile_id)
    }
}

/// A comment on a post; not editable or deletable
#[derive(Debug, Clone)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub content: String,
    /// Liker profile ids, derived from the comment_likes collection
    pub likes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Moderation entities
// =============================================================================

/// The singleton maintenance flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Maintenance {
    /// Row id, kept so the update-or-insert can address the singleton
    pub id: String,
    pub active: bool,
    pub message: String,
    pub scheduled_restart: Option<DateTime<Utc>>,
}

/// A banned word, global or scoped to one author
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannedWord {
    pub id: String,
    pub word: String,
    /// None = applies to every author
    pub profile_id: Option<String>,
}

/// Report lifecycle: PENDING, then REVIEWED or ACTIONED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportStatus {
    Pending,
    Reviewed,
    Actioned,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Reviewed => "REVIEWED",
            Self::Actioned => "ACTIONED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(Self::Pending),
            "REVIEWED" => Some(Self::Reviewed),
            "ACTIONED" => Some(Self::Actioned),
            _ => None,
        }
    }
}

/// What a report points at (exactly one of the two)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportTarget {
    Profile(String),
    Post(String),
}

/// A user-filed report against a profile or a post
#[derive(Debug, Clone)]
pub struct Report {
    pub id: String,
    pub reporter_id: String,
    pub target: ReportTarget,
    pub reason: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

/// A message to the support inbox
#[derive(Debug, Clone)]
pub struct SupportMessage {
    pub id: String,
    pub sender_id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_profile() -> Profile {
        Profile {
            id: EntityId::new().0,
            handle: "@tester".to_string(),
            display_name: "Tester".to_string(),
            avatar_url: None,
            banner_url: None,
            bio: String::new(),
            pronouns: None,
            custom_fields: vec![],
            career: None,
            home_address: None,
            kind: AccountKind::User {
                max_characters: DEFAULT_MAX_CHARACTERS,
            },
            status: ModerationStatus::Approved,
            retirement: None,
            is_moderator: false,
            banned_until: None,
            credentials: None,
            show_roblox: false,
            show_discord: false,
            followers: vec![],
            following: vec![],
            blocked_users: vec![],
            past_names: vec![],
            joined_at: Utc::now(),
        }
    }

    #[test]
    fn ban_in_the_past_is_not_a_ban() {
        let now = Utc::now();
        let mut profile = test_profile();
        profile.banned_until = Some(now - Duration::seconds(1));
        assert!(!profile.is_banned(now));

        profile.banned_until = Some(now + Duration::seconds(1_000_000));
        assert!(profile.is_banned(now));

        profile.banned_until = None;
        assert!(!profile.is_banned(now));
    }

    #[test]
    fn character_exposes_owner() {
        let mut profile = test_profile();
        assert_eq!(profile.owner_id(), None);

        profile.kind = AccountKind::Character {
            owner_id: "u_owner".to_string(),
        };
        assert_eq!(profile.owner_id(), Some("u_owner"));
        assert!(profile.is_character());
    }
}
