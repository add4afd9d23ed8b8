//! API response DTOs
//!
//! Data Transfer Objects consumed by the presentation shell. Credentials
//! never appear here; the external usernames are present only when their
//! visibility toggle (or the viewer's privilege) allows it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::CustomField;

/// Full profile response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: String,
    pub handle: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub banner_url: Option<String>,
    pub bio: String,
    pub pronouns: Option<String>,
    pub custom_fields: Vec<CustomField>,
    pub career: Option<String>,
    pub home_address: Option<String>,
    /// "USER" or "CHARACTER"
    pub kind: String,
    pub owner_id: Option<String>,
    pub max_characters: Option<u32>,
    pub status: String,
    pub retirement: Option<RetirementResponse>,
    pub is_moderator: bool,
    pub banned_until: Option<DateTime<Utc>>,
    /// Present when visible to the viewer
    pub roblox_username: Option<String>,
    /// Present when visible to the viewer
    pub discord_username: Option<String>,
    pub followers: Vec<String>,
    pub following: Vec<String>,
    pub blocked_users: Vec<String>,
    pub past_names: Vec<String>,
    pub joined_at: DateTime<Utc>,
}

/// Retirement state on a character profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetirementResponse {
    /// "archived", "deceased" or "imprisoned"
    pub kind: String,
    pub date: Option<DateTime<Utc>>,
}

/// Compact author reference embedded in posts and comments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub id: String,
    pub handle: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// Post response, author-joined
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: String,
    pub author: ProfileSummary,
    pub content: String,
    pub media_url: Option<String>,
    /// "image" or "video"
    pub media_type: Option<String>,
    pub hashtags: Vec<String>,
    pub likes: Vec<String>,
    pub likes_count: usize,
    pub comments_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Comment response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: String,
    pub post_id: String,
    pub author: ProfileSummary,
    pub content: String,
    pub likes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Session response after login or profile switch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub token: String,
    pub owner_id: String,
    pub active_profile: ProfileResponse,
}

/// Maintenance flag response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceResponse {
    pub active: bool,
    pub message: String,
    pub scheduled_restart: Option<DateTime<Utc>>,
}

/// Report response for the moderator dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResponse {
    pub id: String,
    pub reporter_id: String,
    pub reported_profile_id: Option<String>,
    pub reported_post_id: Option<String>,
    pub reason: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Banned word response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannedWordResponse {
    pub id: String,
    pub word: String,
    pub profile_id: Option<String>,
}

/// Support inbox message response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportMessageResponse {
    pub id: String,
    pub sender_id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
