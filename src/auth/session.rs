//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies.
//! No server-side session storage needed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::data::AccountId;
use crate::error::AppError;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "jwt";

/// User session data
///
/// Stored in a signed cookie. Carries only the account id; the account
/// itself is loaded on each request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Authenticated account
    pub account_id: AccountId,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Start a session lasting `max_age_secs`
    pub fn new(account_id: AccountId, max_age_secs: i64) -> Self {
        let now = Utc::now();
        Self {
            account_id,
            created_at: now,
            expires_at: now + Duration::seconds(max_age_secs),
        }
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

fn invalid_token() -> AppError {
    AppError::Unauthorized("Unauthorized: Invalid Token".to_string())
}

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
///
/// # Arguments
/// * `session` - Session data to encode
/// * `secret` - HMAC secret key
pub fn create_session_token(session: &Session, secret: &str) -> Result<String, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    // 1. Serialize session to JSON
    let payload = serde_json::to_string(session).map_err(|e| AppError::Internal(e.into()))?;

    // 2. Base64 encode the payload
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    // 3. Create HMAC-SHA256 signature
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Config(e.to_string()))?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    // 4. Return "{payload}.{signature}"
    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// # Errors
/// `Unauthorized` if the signature is invalid, the token is malformed,
/// or the session has expired
pub fn verify_session_token(token: &str, secret: &str) -> Result<Session, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    // 1. Split token into payload and signature
    let (payload_b64, signature_b64) = token.split_once('.').ok_or_else(invalid_token)?;

    // 2. Verify HMAC signature
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Config(e.to_string()))?;
    mac.update(payload_b64.as_bytes());

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| invalid_token())?;

    mac.verify_slice(&signature).map_err(|_| invalid_token())?;

    // 3. Decode and deserialize payload
    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| invalid_token())?;

    let session: Session = serde_json::from_slice(&payload_bytes).map_err(|_| invalid_token())?;

    // 4. Check if session is expired
    if session.is_expired() {
        return Err(invalid_token());
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn token_round_trips_account_id() {
        let account_id = AccountId::new();
        let token = create_session_token(&Session::new(account_id.clone(), 60), SECRET).unwrap();

        let session = verify_session_token(&token, SECRET).unwrap();
        assert_eq!(session.account_id, account_id);
    }

    #[test]
    fn tampered_or_foreign_tokens_are_rejected() {
        let token = create_session_token(&Session::new(AccountId::new(), 60), SECRET).unwrap();

        let other_secret = "fedcba9876543210fedcba9876543210";
        assert!(matches!(
            verify_session_token(&token, other_secret),
            Err(AppError::Unauthorized(_))
        ));

        let (payload, _) = token.split_once('.').unwrap();
        let forged = format!("{}.{}", payload, "AAAA");
        assert!(verify_session_token(&forged, SECRET).is_err());
        assert!(verify_session_token("not-a-token", SECRET).is_err());
    }

    #[test]
    fn expired_sessions_are_rejected() {
        let token = create_session_token(&Session::new(AccountId::new(), -1), SECRET).unwrap();
        assert!(matches!(
            verify_session_token(&token, SECRET),
            Err(AppError::Unauthorized(_))
        ));
    }
}
