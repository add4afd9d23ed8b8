//! Domain -> DTO converters
//!
//! Redaction lives here: passwords never convert, and the external
//! usernames only surface for their visibility toggle, the profile's
//! owner, or a moderator.

use crate::api::dto::{
    BannedWordResponse, CommentResponse, MaintenanceResponse, PostResponse, ProfileResponse,
    ProfileSummary, ReportResponse, RetirementResponse, SupportMessageResponse,
};
use crate::data::{
    BannedWord, Comment, Maintenance, Post, Profile, Report, ReportTarget, Retirement, Snapshot,
    SupportMessage,
};

/// Whether `viewer` may see the profile's hidden login identifiers
fn viewer_is_privileged(profile: &Profile, viewer: Option<&Profile>) -> bool {
    match viewer {
        None => false,
        Some(viewer) => {
            viewer.is_moderator
                || viewer.id == profile.id
                || profile.owner_id() == Some(viewer.id.as_str())
                || viewer.owner_id() == Some(profile.id.as_str())
        }
    }
}

/// Convert a profile for a given viewer
pub fn profile_to_response(profile: &Profile, viewer: Option<&Profile>) -> ProfileResponse {
    let privileged = viewer_is_privileged(profile, viewer);

    let (kind, owner_id, max_characters) = match &profile.kind {
        crate::data::AccountKind::User { max_characters } => {
            ("USER".to_string(), None, Some(*max_characters))
        }
        crate::data::AccountKind::Character { owner_id } => {
            ("CHARACTER".to_string(), Some(owner_id.clone()), None)
        }
    };

    let retirement = profile.retirement.as_ref().map(|r| RetirementResponse {
        kind: r.label().to_string(),
        date: match r {
            Retirement::Archived => None,
            Retirement::Deceased { date } | Retirement::Imprisoned { date } => *date,
        },
    });

    let credentials = profile.credentials.as_ref();
    let roblox_username = credentials
        .filter(|_| profile.show_roblox || privileged)
        .map(|c| c.roblox_username.clone());
    let discord_username = credentials
        .filter(|_| profile.show_discord || privileged)
        .map(|c| c.discord_username.clone());

    ProfileResponse {
        id: profile.id.clone(),
        handle: profile.handle.clone(),
        display_name: profile.display_name.clone(),
        avatar_url: profile.avatar_url.clone(),
        banner_url: profile.banner_url.clone(),
        bio: profile.bio.clone(),
        pronouns: profile.pronouns.clone(),
        custom_fields: profile.custom_fields.clone(),
        career: profile.career.clone(),
        home_address: profile.home_address.clone(),
        kind,
        owner_id,
        max_characters,
        status: profile.status.as_str().to_string(),
        retirement,
        is_moderator: profile.is_moderator,
        banned_until: profile.banned_until,
        roblox_username,
        discord_username,
        followers: profile.followers.clone(),
        following: profile.following.clone(),
        blocked_users: profile.blocked_users.clone(),
        past_names: profile.past_names.clone(),
        joined_at: profile.joined_at,
    }
}

fn profile_summary(profile: &Profile) -> ProfileSummary {
    ProfileSummary {
        id: profile.id.clone(),
        handle: profile.handle.clone(),
        display_name: profile.display_name.clone(),
        avatar_url: profile.avatar_url.clone(),
    }
}

/// Convert a post, joining its author from the snapshot
///
/// Returns None when the author does not resolve; the caller drops the
/// post from the view silently.
pub fn post_to_response(post: &Post, snapshot: &Snapshot) -> Option<PostResponse> {
    let author = snapshot.profile(&post.author_id)?;

    Some(PostResponse {
        id: post.id.clone(),
        author: profile_summary(author),
        content: post.content.clone(),
        media_url: post.media.as_ref().map(|m| m.url.clone()),
        media_type: post.media.as_ref().map(|m| m.kind.as_str().to_string()),
        hashtags: post.hashtags.clone(),
        likes: post.likes.clone(),
        likes_count: post.likes.len(),
        comments_count: post.comments_count,
        created_at: post.created_at,
    })
}

/// Convert a comment, joining its author from the snapshot
pub fn comment_to_response(comment: &Comment, snapshot: &Snapshot) -> Option<CommentResponse> {
    let author = snapshot.profile(&comment.author_id)?;

    Some(CommentResponse {
        id: comment.id.clone(),
        post_id: comment.post_id.clone(),
        author: profile_summary(author),
        content: comment.content.clone(),
        likes: comment.likes.clone(),
        created_at: comment.created_at,
    })
}

pub fn maintenance_to_response(maintenance: &Maintenance) -> MaintenanceResponse {
    MaintenanceResponse {
        active: maintenance.active,
        message: maintenance.message.clone(),
        scheduled_restart: maintenance.scheduled_restart,
    }
}

pub fn report_to_response(report: &Report) -> ReportResponse {
    let (reported_profile_id, reported_post_id) = match &report.target {
        ReportTarget::Profile(id) => (Some(id.clone()), None),
        ReportTarget::Post(id) => (None, Some(id.clone())),
    };

    ReportResponse {
        id: report.id.clone(),
        reporter_id: report.reporter_id.clone(),
        reported_profile_id,
        reported_post_id,
        reason: report.reason.clone(),
        status: report.status.as_str().to_string(),
        created_at: report.created_at,
    }
}

pub fn banned_word_to_response(word: &BannedWord) -> BannedWordResponse {
    BannedWordResponse {
        id: word.id.clone(),
        word: word.word.clone(),
        profile_id: word.profile_id.clone(),
    }
}

pub fn support_message_to_response(message: &SupportMessage) -> SupportMessageResponse {
    SupportMessageResponse {
        id: message.id.clone(),
        sender_id: message.sender_id.clone(),
        message: message.message.clone(),
        created_at: message.created_at,
    }
}
