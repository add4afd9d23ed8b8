//! Compose assist
//!
//! Thin client for an external text-completion service, used to rewrite
//! post drafts and to produce a one-line risk note for pending
//! applications. Failure is never fatal: every caller degrades to its
//! fallback and the primary action proceeds without the suggestion.

use serde::Deserialize;
use serde_json::json;

use crate::config::AssistConfig;
use crate::error::AppError;
use crate::metrics::ASSIST_REQUESTS_TOTAL;

const RISK_NOTE_FALLBACK: &str = "Automatic analysis unavailable.";

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    text: String,
}

/// Client for the generative-text collaborator
pub struct ComposeAssist {
    enabled: bool,
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: Option<String>,
}

impl ComposeAssist {
    /// Create the assist client from configuration
    pub fn new(config: &AssistConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("MimicSocial/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            enabled: config.enabled,
            client,
            base_url: config.base_url.clone().unwrap_or_default(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// One prompt in, one text out
    ///
    /// # Errors
    /// Returns error when assist is disabled or the service fails;
    /// callers are expected to degrade, not to propagate.
    pub async fn complete(&self, prompt: &str) -> Result<String, AppError> {
        if !self.enabled {
            return Err(AppError::Assist("assist is disabled".to_string()));
        }

        let mut request = self.client.post(&self.base_url).json(&json!({
            "model": self.model,
            "prompt": prompt,
        }));
        if let Some(api_key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Assist(format!(
                "completion failed ({status}): {body}"
            )));
        }

        let completion: CompletionResponse = response.json().await?;
        Ok(completion.text.trim().to_string())
    }

    /// Rewrite a post draft for engagement
    ///
    /// Falls back to the unmodified draft on any failure.
    pub async fn rewrite_draft(&self, draft: &str) -> String {
        let prompt = format!(
            "You are a social media assistant. Rewrite the following draft to be \
             more engaging and add relevant hashtags. Keep it under 280 characters. \
             Draft: \"{draft}\""
        );

        match self.complete(&prompt).await {
            Ok(text) if !text.is_empty() => {
                ASSIST_REQUESTS_TOTAL
                    .with_label_values(&["rewrite", "success"])
                    .inc();
                text
            }
            Ok(_) => {
                ASSIST_REQUESTS_TOTAL
                    .with_label_values(&["rewrite", "empty"])
                    .inc();
                draft.to_string()
            }
            Err(error) => {
                ASSIST_REQUESTS_TOTAL
                    .with_label_values(&["rewrite", "failure"])
                    .inc();
                tracing::warn!(%error, "Draft rewrite failed; returning draft unchanged");
                draft.to_string()
            }
        }
    }

    /// One-line risk assessment for a pending application
    ///
    /// Opaque advisory text; falls back to a fixed notice on failure.
    pub async fn risk_note(&self, handle: &str, name: &str, bio: &str) -> String {
        let prompt = format!(
            "Analyze this user application for a social media site.\n\
             Handle: {handle}\n\
             Name: {name}\n\
             Bio: {bio}\n\n\
             Provide a brief 1-sentence risk assessment. Is this user likely \
             safe, suspicious, or unsafe?"
        );

        match self.complete(&prompt).await {
            Ok(text) if !text.is_empty() => {
                ASSIST_REQUESTS_TOTAL
                    .with_label_values(&["risk_note", "success"])
                    .inc();
                text
            }
            _ => {
                ASSIST_REQUESTS_TOTAL
                    .with_label_values(&["risk_note", "failure"])
                    .inc();
                RISK_NOTE_FALLBACK.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_assist_degrades_to_fallbacks() {
        let assist = ComposeAssist::new(&AssistConfig::default()).unwrap();
        assert!(!assist.is_enabled());

        let draft = "my plain draft";
        assert_eq!(assist.rewrite_draft(draft).await, draft);
        assert_eq!(
            assist.risk_note("@a", "A", "bio").await,
            RISK_NOTE_FALLBACK
        );

        let error = assist.complete("prompt").await.unwrap_err();
        assert!(matches!(error, AppError::Assist(_)));
    }
}
