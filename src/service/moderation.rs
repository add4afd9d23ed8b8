//! Moderation service
//!
//! Application review, reports, banned words, the maintenance flag and
//! character unlocks. All operations except filing a report and writing
//! to the support inbox require a moderator.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::data::{
    BannedWord, Collection, EntityId, Filter, Maintenance, ModerationStatus, Profile,
    RemoteStore, Report, ReportStatus, ReportTarget, Snapshot, SupportMessage,
};
use crate::error::AppError;
use crate::service::Aggregator;

/// Outcome of a report review
#[derive(Debug, Clone)]
pub enum ReportReview {
    Reviewed,
    /// Marks the report actioned; for profile reports an optional ban
    /// timestamp is applied to the reported profile
    Actioned {
        banned_until: Option<DateTime<Utc>>,
    },
}

/// Moderation service
pub struct ModerationService {
    store: Arc<dyn RemoteStore>,
    aggregator: Arc<Aggregator>,
}

impl ModerationService {
    /// Create new moderation service
    pub fn new(store: Arc<dyn RemoteStore>, aggregator: Arc<Aggregator>) -> Self {
        Self { store, aggregator }
    }

    fn require_moderator<'a>(
        snapshot: &'a Snapshot,
        moderator_id: &str,
    ) -> Result<&'a Profile, AppError> {
        let profile = snapshot.profile(moderator_id).ok_or(AppError::Unauthorized)?;
        if !profile.is_moderator {
            return Err(AppError::Forbidden("moderator access required".to_string()));
        }
        Ok(profile)
    }

    // =========================================================================
    // Applications
    // =========================================================================

    /// Pending account applications
    pub fn pending_applications(&self, moderator_id: &str) -> Result<Vec<Profile>, AppError> {
        let snapshot = self.aggregator.snapshot();
        Self::require_moderator(&snapshot, moderator_id)?;

        Ok(snapshot
            .profiles
            .iter()
            .filter(|p| p.status == ModerationStatus::Pending)
            .cloned()
            .collect())
    }

    /// Approve or reject a pending application
    ///
    /// The only legal transition is out of PENDING; there is no way back.
    pub async fn review_application(
        &self,
        moderator_id: &str,
        target_id: &str,
        approve: bool,
    ) -> Result<(), AppError> {
        let snapshot = self.aggregator.snapshot();
        Self::require_moderator(&snapshot, moderator_id)?;

        let target = snapshot.profile(target_id).ok_or(AppError::NotFound)?;
        if target.status != ModerationStatus::Pending {
            return Err(AppError::Validation(format!(
                "application is already {}",
                target.status.as_str().to_lowercase()
            )));
        }

        let status = if approve {
            ModerationStatus::Approved
        } else {
            ModerationStatus::Rejected
        };
        self.store
            .update(
                Collection::Profiles,
                json!({ "status": status.as_str() }),
                &[Filter::eq("id", target_id)],
            )
            .await?;

        tracing::info!(
            moderator = %moderator_id,
            target = %target_id,
            status = status.as_str(),
            "Application reviewed"
        );
        self.aggregator.refresh().await?;
        Ok(())
    }

    // =========================================================================
    // Reports
    // =========================================================================

    /// File a report against a profile or a post
    ///
    /// Open to any authenticated profile, not just moderators.
    pub async fn file_report(
        &self,
        reporter_id: &str,
        target: ReportTarget,
        reason: &str,
    ) -> Result<(), AppError> {
        let snapshot = self.aggregator.snapshot();
        snapshot.profile(reporter_id).ok_or(AppError::Unauthorized)?;

        let (reported_profile_id, reported_post_id) = match &target {
            ReportTarget::Profile(id) => {
                snapshot.profile(id).ok_or(AppError::NotFound)?;
                (Some(id.clone()), None)
            }
            ReportTarget::Post(id) => {
                snapshot.post(id).ok_or(AppError::NotFound)?;
                (None, Some(id.clone()))
            }
        };

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation(
                "report needs a reason".to_string(),
            ));
        }

        let row = json!({
            "id": EntityId::new().0,
            "reporter_id": reporter_id,
            "reported_profile_id": reported_profile_id,
            "reported_post_id": reported_post_id,
            "reason": reason,
            "status": ReportStatus::Pending.as_str(),
            "created_at": Utc::now(),
        });
        self.store.insert(Collection::Reports, row).await?;
        self.aggregator.refresh().await?;
        Ok(())
    }

    /// All reports, for the moderator dashboard
    pub fn list_reports(&self, moderator_id: &str) -> Result<Vec<Report>, AppError> {
        let snapshot = self.aggregator.snapshot();
        Self::require_moderator(&snapshot, moderator_id)?;
        Ok(snapshot.reports.clone())
    }

    /// Close a pending report
    ///
    /// Actioning a profile report with a ban timestamp also patches the
    /// reported profile's `banned_until`.
    pub async fn review_report(
        &self,
        moderator_id: &str,
        report_id: &str,
        review: ReportReview,
    ) -> Result<(), AppError> {
        let snapshot = self.aggregator.snapshot();
        Self::require_moderator(&snapshot, moderator_id)?;

        let report = snapshot
            .reports
            .iter()
            .find(|r| r.id == report_id)
            .ok_or(AppError::NotFound)?;
        if report.status != ReportStatus::Pending {
            return Err(AppError::Validation(format!(
                "report is already {}",
                report.status.as_str().to_lowercase()
            )));
        }

        // Resolve the ban target before any write goes out
        let ban = match &review {
            ReportReview::Actioned {
                banned_until: Some(until),
            } => match &report.target {
                ReportTarget::Profile(profile_id) => Some((profile_id.clone(), *until)),
                ReportTarget::Post(_) => {
                    return Err(AppError::Validation(
                        "a ban can only be applied to a profile report".to_string(),
                    ));
                }
            },
            _ => None,
        };

        let status = match &review {
            ReportReview::Reviewed => ReportStatus::Reviewed,
            ReportReview::Actioned { .. } => ReportStatus::Actioned,
        };
        self.store
            .update(
                Collection::Reports,
                json!({ "status": status.as_str() }),
                &[Filter::eq("id", report_id)],
            )
            .await?;

        if let Some((profile_id, until)) = ban {
            self.store
                .update(
                    Collection::Profiles,
                    json!({ "banned_until": until }),
                    &[Filter::eq("id", profile_id.as_str())],
                )
                .await?;
            tracing::info!(
                moderator = %moderator_id,
                profile = %profile_id,
                until = %until.to_rfc3339(),
                "Profile banned from report review"
            );
        }

        self.aggregator.refresh().await?;
        Ok(())
    }

    // =========================================================================
    // Banned words
    // =========================================================================

    /// The current banned-word list
    pub fn banned_words(&self, moderator_id: &str) -> Result<Vec<BannedWord>, AppError> {
        let snapshot = self.aggregator.snapshot();
        Self::require_moderator(&snapshot, moderator_id)?;
        Ok(snapshot.banned_words.clone())
    }

    /// Add a banned word, global or scoped to one author
    pub async fn add_banned_word(
        &self,
        moderator_id: &str,
        word: &str,
        profile_id: Option<&str>,
    ) -> Result<(), AppError> {
        let snapshot = self.aggregator.snapshot();
        Self::require_moderator(&snapshot, moderator_id)?;

        let word = word.trim();
        if word.is_empty() {
            return Err(AppError::Validation(
                "banned word cannot be empty".to_string(),
            ));
        }
        if let Some(scope) = profile_id {
            snapshot.profile(scope).ok_or(AppError::NotFound)?;
        }

        self.store
            .insert(
                Collection::BannedWords,
                json!({
                    "id": EntityId::new().0,
                    "word": word,
                    "profile_id": profile_id,
                }),
            )
            .await?;
        self.aggregator.refresh().await?;
        Ok(())
    }

    /// Remove a banned word
    pub async fn remove_banned_word(
        &self,
        moderator_id: &str,
        word_id: &str,
    ) -> Result<(), AppError> {
        let snapshot = self.aggregator.snapshot();
        Self::require_moderator(&snapshot, moderator_id)?;

        self.store
            .delete(Collection::BannedWords, &[Filter::eq("id", word_id)])
            .await?;
        self.aggregator.refresh().await?;
        Ok(())
    }

    // =========================================================================
    // Maintenance flag
    // =========================================================================

    /// Set the singleton maintenance flag (update-or-insert)
    pub async fn set_maintenance(
        &self,
        moderator_id: &str,
        active: bool,
        message: &str,
        scheduled_restart: Option<DateTime<Utc>>,
    ) -> Result<Maintenance, AppError> {
        let snapshot = self.aggregator.snapshot();
        Self::require_moderator(&snapshot, moderator_id)?;

        match &snapshot.maintenance {
            Some(existing) => {
                self.store
                    .update(
                        Collection::Maintenance,
                        json!({
                            "active": active,
                            "message": message,
                            "scheduled_restart": scheduled_restart,
                        }),
                        &[Filter::eq("id", existing.id.clone())],
                    )
                    .await?;
            }
            None => {
                self.store
                    .insert(
                        Collection::Maintenance,
                        json!({
                            "id": EntityId::new().0,
                            "active": active,
                            "message": message,
                            "scheduled_restart": scheduled_restart,
                        }),
                    )
                    .await?;
            }
        }

        let snapshot = self.aggregator.refresh().await?;
        snapshot
            .maintenance
            .clone()
            .ok_or_else(|| AppError::Store("maintenance flag missing after refresh".to_string()))
    }

    // =========================================================================
    // Character unlock
    // =========================================================================

    /// Clear a character's retirement (moderator only)
    pub async fn unlock_character(
        &self,
        moderator_id: &str,
        character_id: &str,
    ) -> Result<(), AppError> {
        let snapshot = self.aggregator.snapshot();
        Self::require_moderator(&snapshot, moderator_id)?;

        let character = snapshot.profile(character_id).ok_or(AppError::NotFound)?;
        if !character.is_retired() {
            return Ok(());
        }

        self.store
            .update(
                Collection::Profiles,
                json!({
                    "is_archived": false,
                    "is_deceased": false,
                    "death_date": null,
                    "is_imprisoned": false,
                    "imprisonment_date": null,
                }),
                &[Filter::eq("id", character_id)],
            )
            .await?;
        self.aggregator.refresh().await?;
        Ok(())
    }

    // =========================================================================
    // Support inbox
    // =========================================================================

    /// The support inbox, for moderators
    pub fn support_messages(&self, moderator_id: &str) -> Result<Vec<SupportMessage>, AppError> {
        let snapshot = self.aggregator.snapshot();
        Self::require_moderator(&snapshot, moderator_id)?;
        Ok(snapshot.support_messages.clone())
    }

    /// Send a message to the support inbox (any profile)
    pub async fn send_support_message(
        &self,
        sender_id: &str,
        message: &str,
    ) -> Result<(), AppError> {
        let snapshot = self.aggregator.snapshot();
        snapshot.profile(sender_id).ok_or(AppError::Unauthorized)?;

        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::Validation(
                "support message cannot be empty".to_string(),
            ));
        }

        self.store
            .insert(
                Collection::SupportMessages,
                json!({
                    "id": EntityId::new().0,
                    "sender_id": sender_id,
                    "message": message,
                    "created_at": Utc::now(),
                }),
            )
            .await?;
        self.aggregator.refresh().await?;
        Ok(())
    }
}
