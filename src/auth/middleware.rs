//! Authentication extractor
//!
//! Resolves the session token on a request to the signed-in account.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use axum_extra::extract::CookieJar;

use super::session::{SESSION_COOKIE, verify_session_token};
use crate::AppState;
use crate::data::PublicAccount;
use crate::error::AppError;

fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(ToOwned::to_owned)
        .or_else(|| {
            let jar = CookieJar::from_headers(headers);
            jar.get(SESSION_COOKIE)
                .map(|cookie| cookie.value().to_owned())
        })
        .filter(|token| !token.is_empty())
}

/// Extractor for current authenticated user
///
/// Accepts the session cookie or an `Authorization: Bearer` header, and
/// confirms the account still exists.
///
/// # Usage
/// ```ignore
/// async fn handler(
///     CurrentUser(account): CurrentUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}", account.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub PublicAccount);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(account) = parts.extensions.get::<PublicAccount>().cloned() {
            return Ok(CurrentUser(account));
        }

        let state = AppState::from_ref(state);
        let token =
            extract_token_from_headers(&parts.headers).ok_or_else(AppError::unauthenticated)?;
        let session = verify_session_token(&token, &state.config.auth.session_secret)?;

        let account: PublicAccount = state
            .db
            .get_account(&session.account_id)
            .await?
            .ok_or_else(AppError::account_not_found)?
            .into();
        parts.extensions.insert(account.clone());

        Ok(CurrentUser(account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer from-header"));
        headers.insert("Cookie", HeaderValue::from_static("jwt=from-cookie"));
        assert_eq!(
            extract_token_from_headers(&headers).as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn falls_back_to_session_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert("Cookie", HeaderValue::from_static("other=1; jwt=from-cookie"));
        assert_eq!(
            extract_token_from_headers(&headers).as_deref(),
            Some("from-cookie")
        );

        let mut cleared = HeaderMap::new();
        cleared.insert("Cookie", HeaderValue::from_static("jwt="));
        assert_eq!(extract_token_from_headers(&cleared), None);
        assert_eq!(extract_token_from_headers(&HeaderMap::new()), None);
    }
}
