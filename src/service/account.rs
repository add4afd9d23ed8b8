//! Account service
//!
//! Registration, login guards, character sub-accounts, profile edits and
//! the follow/block relations. Every successful write is followed by a
//! full snapshot refresh; the local cache never self-corrects.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::data::{
    AccountKind, Collection, EntityId, Filter, ModerationStatus, Profile, RemoteStore, Retirement,
    DEFAULT_MAX_CHARACTERS,
};
use crate::error::AppError;
use crate::service::Aggregator;

/// A new account application
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub display_name: String,
    pub handle: String,
    pub bio: String,
    pub roblox_username: String,
    pub discord_username: String,
    pub password: String,
}

/// A new character sub-account
#[derive(Debug, Clone)]
pub struct NewCharacter {
    pub display_name: String,
    pub handle: String,
    pub bio: String,
    pub avatar_url: Option<String>,
}

/// Fields a profile edit may touch; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct ProfileEdit {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub banner_url: Option<String>,
    pub pronouns: Option<String>,
    pub custom_fields: Option<Vec<crate::data::CustomField>>,
    pub career: Option<String>,
    pub home_address: Option<String>,
    pub show_roblox: Option<bool>,
    pub show_discord: Option<bool>,
}

/// Account service
pub struct AccountService {
    store: Arc<dyn RemoteStore>,
    aggregator: Arc<Aggregator>,
}

impl AccountService {
    /// Create new account service
    pub fn new(store: Arc<dyn RemoteStore>, aggregator: Arc<Aggregator>) -> Self {
        Self { store, aggregator }
    }

    // =========================================================================
    // Registration and login
    // =========================================================================

    /// Submit an account application
    ///
    /// The profile lands in PENDING and stays invisible until a moderator
    /// approves it.
    ///
    /// # Errors
    /// Validation error on a malformed or taken handle; no write is
    /// attempted in that case.
    pub async fn register(&self, application: NewApplication) -> Result<Profile, AppError> {
        let handle = normalize_handle(&application.handle)?;

        let snapshot = self.aggregator.snapshot();
        if snapshot.profile_by_handle(&handle).is_some() {
            return Err(AppError::Validation(format!(
                "handle {handle} is already taken"
            )));
        }

        let id = EntityId::new().0;
        let row = json!({
            "id": id,
            "handle": handle,
            "display_name": application.display_name.trim(),
            "bio": application.bio,
            "kind": "USER",
            "max_characters": DEFAULT_MAX_CHARACTERS,
            "status": ModerationStatus::Pending.as_str(),
            "password": application.password,
            "roblox_username": application.roblox_username,
            "discord_username": application.discord_username,
            "joined_at": Utc::now(),
        });
        self.store.insert(Collection::Profiles, row).await?;

        let snapshot = self.aggregator.refresh().await?;
        snapshot
            .profile(&id)
            .cloned()
            .ok_or_else(|| AppError::Store("registered profile missing after refresh".to_string()))
    }

    /// Authenticate a user by roblox/discord username and password
    ///
    /// Fails closed: only an APPROVED profile with no ban in force may
    /// log in, and maintenance mode locks out everyone but moderators.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<Profile, AppError> {
        // Always check against fresh state, never a stale snapshot
        let snapshot = self.aggregator.refresh().await?;

        let profile = snapshot
            .profile_by_login_identifier(identifier)
            .ok_or(AppError::Unauthorized)?;
        let credentials = profile.credentials.as_ref().ok_or(AppError::Unauthorized)?;
        if credentials.password != password {
            return Err(AppError::Unauthorized);
        }

        match profile.status {
            ModerationStatus::Approved => {}
            ModerationStatus::Pending => {
                return Err(AppError::Forbidden(
                    "your account is pending approval".to_string(),
                ));
            }
            ModerationStatus::Rejected => {
                return Err(AppError::Forbidden("your account was rejected".to_string()));
            }
        }

        let now = Utc::now();
        if profile.is_banned(now) {
            let until = profile.banned_until.expect("checked by is_banned");
            return Err(AppError::Forbidden(format!(
                "you are banned until {}",
                until.to_rfc3339()
            )));
        }

        if snapshot.maintenance_active() && !profile.is_moderator {
            let message = snapshot
                .maintenance
                .as_ref()
                .map(|m| m.message.clone())
                .unwrap_or_default();
            return Err(AppError::Forbidden(format!(
                "the platform is under maintenance: {message}"
            )));
        }

        tracing::info!(profile = %profile.id, handle = %profile.handle, "Login");
        Ok(profile.clone())
    }

    /// Resolve the profile a session may act as
    ///
    /// The target must be the owner itself or one of its characters.
    /// Retired characters are reachable only by moderators.
    pub fn resolve_active_profile(
        &self,
        owner_id: &str,
        target_id: &str,
    ) -> Result<Profile, AppError> {
        let snapshot = self.aggregator.snapshot();
        let owner = snapshot.profile(owner_id).ok_or(AppError::Unauthorized)?;
        let target = snapshot.profile(target_id).ok_or(AppError::NotFound)?;

        let owned = target.id == owner.id || target.owner_id() == Some(owner.id.as_str());
        if !owned && !owner.is_moderator {
            return Err(AppError::Forbidden(
                "profile is not owned by this account".to_string(),
            ));
        }

        if target.is_retired() && !owner.is_moderator {
            let label = target.retirement.as_ref().expect("retired").label();
            return Err(AppError::Forbidden(format!(
                "character is {label}; ask a moderator to unlock it"
            )));
        }

        Ok(target.clone())
    }

    // =========================================================================
    // Characters
    // =========================================================================

    /// Create a character sub-account for an approved user
    ///
    /// The count of the owner's non-retired characters must stay within
    /// the owner's quota; on violation no write is attempted.
    pub async fn create_character(
        &self,
        owner_id: &str,
        character: NewCharacter,
    ) -> Result<Profile, AppError> {
        let handle = normalize_handle(&character.handle)?;

        let snapshot = self.aggregator.snapshot();
        let owner = snapshot.profile(owner_id).ok_or(AppError::Unauthorized)?;

        let max_characters = match &owner.kind {
            AccountKind::User { max_characters } => *max_characters,
            AccountKind::Character { .. } => {
                return Err(AppError::Validation(
                    "characters cannot own characters".to_string(),
                ));
            }
        };
        if owner.status != ModerationStatus::Approved {
            return Err(AppError::Forbidden(
                "only approved accounts can create characters".to_string(),
            ));
        }

        let active_characters = snapshot
            .characters_of(owner_id)
            .into_iter()
            .filter(|c| !c.is_retired())
            .count();
        if active_characters as u32 >= max_characters {
            return Err(AppError::Validation(format!(
                "character limit reached ({max_characters})"
            )));
        }

        if snapshot.profile_by_handle(&handle).is_some() {
            return Err(AppError::Validation(format!(
                "handle {handle} is already taken"
            )));
        }

        let id = EntityId::new().0;
        let row = json!({
            "id": id,
            "handle": handle,
            "display_name": character.display_name.trim(),
            "bio": character.bio,
            "avatar_url": character.avatar_url,
            "kind": "CHARACTER",
            "owner_id": owner_id,
            // Characters ride on their owner's approval
            "status": ModerationStatus::Approved.as_str(),
            "joined_at": Utc::now(),
        });
        self.store.insert(Collection::Profiles, row).await?;

        let snapshot = self.aggregator.refresh().await?;
        snapshot
            .profile(&id)
            .cloned()
            .ok_or_else(|| AppError::Store("character missing after refresh".to_string()))
    }

    /// Retire one of your characters (archive, deceased, imprisoned)
    ///
    /// Self-service for the owner; only a moderator can undo it.
    pub async fn retire_character(
        &self,
        actor_id: &str,
        character_id: &str,
        reason: Retirement,
    ) -> Result<(), AppError> {
        let snapshot = self.aggregator.snapshot();
        let actor = snapshot.profile(actor_id).ok_or(AppError::Unauthorized)?;
        let character = snapshot.profile(character_id).ok_or(AppError::NotFound)?;

        if !character.is_character() {
            return Err(AppError::Validation(
                "only character accounts can be retired".to_string(),
            ));
        }
        if character.owner_id() != Some(actor.id.as_str()) && !actor.is_moderator {
            return Err(AppError::Forbidden(
                "character is not owned by this account".to_string(),
            ));
        }

        // One reason at a time; setting a new one replaces the old
        let patch = match reason {
            Retirement::Archived => json!({
                "is_archived": true,
                "is_deceased": false,
                "death_date": null,
                "is_imprisoned": false,
                "imprisonment_date": null,
            }),
            Retirement::Deceased { date } => json!({
                "is_archived": false,
                "is_deceased": true,
                "death_date": date.unwrap_or_else(Utc::now),
                "is_imprisoned": false,
                "imprisonment_date": null,
            }),
            Retirement::Imprisoned { date } => json!({
                "is_archived": false,
                "is_deceased": false,
                "death_date": null,
                "is_imprisoned": true,
                "imprisonment_date": date.unwrap_or_else(Utc::now),
            }),
        };

        self.store
            .update(
                Collection::Profiles,
                patch,
                &[Filter::eq("id", character_id)],
            )
            .await?;
        self.aggregator.refresh().await?;
        Ok(())
    }

    // =========================================================================
    // Profile edits
    // =========================================================================

    /// Apply a profile edit
    ///
    /// A display-name change appends the previous name to the past-names
    /// log.
    pub async fn update_profile(
        &self,
        profile_id: &str,
        edit: ProfileEdit,
    ) -> Result<Profile, AppError> {
        let snapshot = self.aggregator.snapshot();
        let profile = snapshot.profile(profile_id).ok_or(AppError::NotFound)?;

        let mut patch = serde_json::Map::new();

        if let Some(display_name) = edit.display_name {
            let display_name = display_name.trim().to_string();
            if display_name.is_empty() {
                return Err(AppError::Validation(
                    "display name cannot be empty".to_string(),
                ));
            }
            if display_name != profile.display_name {
                let mut past_names = profile.past_names.clone();
                past_names.push(profile.display_name.clone());
                patch.insert("past_names".to_string(), json!(past_names));
                patch.insert("display_name".to_string(), json!(display_name));
            }
        }

        if let Some(bio) = edit.bio {
            patch.insert("bio".to_string(), json!(bio));
        }
        if let Some(avatar_url) = edit.avatar_url {
            patch.insert("avatar_url".to_string(), json!(avatar_url));
        }
        if let Some(banner_url) = edit.banner_url {
            patch.insert("banner_url".to_string(), json!(banner_url));
        }
        if let Some(pronouns) = edit.pronouns {
            patch.insert("pronouns".to_string(), json!(pronouns));
        }
        if let Some(custom_fields) = edit.custom_fields {
            patch.insert("custom_fields".to_string(), json!(custom_fields));
        }
        if let Some(career) = edit.career {
            patch.insert("career".to_string(), json!(career));
        }
        if let Some(home_address) = edit.home_address {
            patch.insert("home_address".to_string(), json!(home_address));
        }
        if let Some(show_roblox) = edit.show_roblox {
            patch.insert("show_roblox".to_string(), json!(show_roblox));
        }
        if let Some(show_discord) = edit.show_discord {
            patch.insert("show_discord".to_string(), json!(show_discord));
        }

        if patch.is_empty() {
            return Ok(profile.clone());
        }

        self.store
            .update(
                Collection::Profiles,
                serde_json::Value::Object(patch),
                &[Filter::eq("id", profile_id)],
            )
            .await?;

        let snapshot = self.aggregator.refresh().await?;
        snapshot
            .profile(profile_id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    // =========================================================================
    // Relations
    // =========================================================================

    /// Follow another profile (idempotent)
    pub async fn follow(&self, actor_id: &str, target_id: &str) -> Result<(), AppError> {
        if actor_id == target_id {
            return Err(AppError::Validation("cannot follow yourself".to_string()));
        }

        let snapshot = self.aggregator.snapshot();
        let target = snapshot.profile(target_id).ok_or(AppError::NotFound)?;
        if target.followers.iter().any(|id| id == actor_id) {
            return Ok(());
        }

        self.store
            .insert(
                Collection::Follows,
                json!({ "follower_id": actor_id, "following_id": target_id }),
            )
            .await?;
        self.aggregator.refresh().await?;
        Ok(())
    }

    /// Unfollow a profile
    pub async fn unfollow(&self, actor_id: &str, target_id: &str) -> Result<(), AppError> {
        self.store
            .delete(
                Collection::Follows,
                &[
                    Filter::eq("follower_id", actor_id),
                    Filter::eq("following_id", target_id),
                ],
            )
            .await?;
        self.aggregator.refresh().await?;
        Ok(())
    }

    /// Block another profile (idempotent)
    pub async fn block(&self, actor_id: &str, target_id: &str) -> Result<(), AppError> {
        if actor_id == target_id {
            return Err(AppError::Validation("cannot block yourself".to_string()));
        }

        let snapshot = self.aggregator.snapshot();
        let actor = snapshot.profile(actor_id).ok_or(AppError::Unauthorized)?;
        snapshot.profile(target_id).ok_or(AppError::NotFound)?;
        if actor.has_blocked(target_id) {
            return Ok(());
        }

        self.store
            .insert(
                Collection::Blocks,
                json!({ "blocker_id": actor_id, "blocked_id": target_id }),
            )
            .await?;
        self.aggregator.refresh().await?;
        Ok(())
    }

    /// Unblock a profile
    pub async fn unblock(&self, actor_id: &str, target_id: &str) -> Result<(), AppError> {
        self.store
            .delete(
                Collection::Blocks,
                &[
                    Filter::eq("blocker_id", actor_id),
                    Filter::eq("blocked_id", target_id),
                ],
            )
            .await?;
        self.aggregator.refresh().await?;
        Ok(())
    }
}

/// Normalize a handle to its canonical sigil-prefixed form
///
/// The body must be one or more ASCII letters, digits or underscores.
pub fn normalize_handle(handle: &str) -> Result<String, AppError> {
    let trimmed = handle.trim();
    let body = trimmed.strip_prefix('@').unwrap_or(trimmed);

    if body.is_empty() {
        return Err(AppError::Validation("handle cannot be empty".to_string()));
    }
    if !body
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    {
        return Err(AppError::Validation(format!(
            "handle may only contain letters, digits and underscores: {trimmed}"
        )));
    }

    Ok(format!("@{body}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_handle_adds_sigil_once() {
        assert_eq!(normalize_handle("alice_1").unwrap(), "@alice_1");
        assert_eq!(normalize_handle("@alice_1").unwrap(), "@alice_1");
        assert_eq!(normalize_handle("  @bob  ").unwrap(), "@bob");
    }

    #[test]
    fn normalize_handle_rejects_bad_bodies() {
        assert!(normalize_handle("").is_err());
        assert!(normalize_handle("@").is_err());
        assert!(normalize_handle("a b").is_err());
        assert!(normalize_handle("nope!").is_err());
        assert!(normalize_handle("@@double").is_err());
    }
}
