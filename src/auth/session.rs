//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies.
//! No server-side session storage needed.
//!
//! The token carries exactly two slots: the authenticated owner and the
//! currently active profile (the owner itself or one of its characters).
//! The client holding the cookie is what survives restarts; a missing or
//! invalid token means logged out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User session data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Authenticated owner profile id
    pub owner_id: String,
    /// Currently active profile id (owner or an owned character)
    pub active_profile_id: String,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// New session acting as the owner itself
    pub fn new(owner_id: String, max_age_seconds: i64) -> Self {
        let now = Utc::now();
        Self {
            active_profile_id: owner_id.clone(),
            owner_id,
            created_at: now,
            expires_at: now + chrono::Duration::seconds(max_age_seconds),
        }
    }

    /// The same session switched to another active profile
    pub fn with_active_profile(&self, active_profile_id: String) -> Self {
        Self {
            active_profile_id,
            ..self.clone()
        }
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
///
/// # Arguments
/// * `session` - Session data to encode
/// * `secret` - HMAC secret key
///
/// # Returns
/// Signed token string
pub fn create_session_token(
    session: &Session,
    secret: &str,
) -> Result<String, crate::error::AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    // 1. Serialize session to JSON
    let payload =
        serde_json::to_string(session).map_err(|e| crate::error::AppError::Internal(e.into()))?;

    // 2. Base64 encode the payload
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    // 3. Create HMAC-SHA256 signature
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| crate::error::AppError::Session(e.to_string()))?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(&signature);

    // 4. Return "{payload}.{signature}"
    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// # Arguments
/// * `token` - Token string to verify
/// * `secret` - HMAC secret key
///
/// # Returns
/// Decoded session if valid
///
/// # Errors
/// Returns error if signature is invalid or token is malformed
pub fn verify_session_token(token: &str, secret: &str) -> Result<Session, crate::error::AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    // 1. Split token into payload and signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 2 {
        return Err(crate::error::AppError::Unauthorized);
    }

    let payload_b64 = parts[0];
    let signature_b64 = parts[1];

    // 2. Verify HMAC signature
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| crate::error::AppError::Session(e.to_string()))?;
    mac.update(payload_b64.as_bytes());

    let expected_signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| crate::error::AppError::Unauthorized)?;

    mac.verify_slice(&expected_signature)
        .map_err(|_| crate::error::AppError::Unauthorized)?;

    // 3. Decode and deserialize payload
    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| crate::error::AppError::Unauthorized)?;

    let payload_str =
        String::from_utf8(payload_bytes).map_err(|_| crate::error::AppError::Unauthorized)?;

    let session: Session =
        serde_json::from_str(&payload_str).map_err(|_| crate::error::AppError::Unauthorized)?;

    // 4. Check if session is expired
    if session.is_expired() {
        return Err(crate::error::AppError::Unauthorized);
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-32-bytes-long!!!";

    #[test]
    fn round_trip_preserves_both_slots() {
        let session = Session::new("u_owner".to_string(), 3600);
        let switched = session.with_active_profile("u_char".to_string());

        let token = create_session_token(&switched, SECRET).unwrap();
        let decoded = verify_session_token(&token, SECRET).unwrap();

        assert_eq!(decoded.owner_id, "u_owner");
        assert_eq!(decoded.active_profile_id, "u_char");
    }

    #[test]
    fn tampered_token_is_rejected() {
        let session = Session::new("u_owner".to_string(), 3600);
        let token = create_session_token(&session, SECRET).unwrap();

        let mut tampered = token.clone();
        tampered.replace_range(0..1, "x");
        assert!(verify_session_token(&tampered, SECRET).is_err());

        assert!(verify_session_token(&token, "another-secret-32-bytes-long!!!!").is_err());
        assert!(verify_session_token("not-a-token", SECRET).is_err());
    }

    #[test]
    fn expired_session_is_rejected() {
        let session = Session::new("u_owner".to_string(), -1);
        let token = create_session_token(&session, SECRET).unwrap();
        assert!(verify_session_token(&token, SECRET).is_err());
    }
}
