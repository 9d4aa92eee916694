//! Username/password authentication routes

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};

use super::middleware::CurrentUser;
use super::session::{SESSION_COOKIE, Session, create_session_token};
use crate::AppState;
use crate::api::{LoginRequest, MessageResponse, SignupRequest, profile_to_response};
use crate::data::AccountId;
use crate::error::AppError;
use crate::service::{AccountService, Registration};

/// Create authentication router
///
/// Routes:
/// - POST /signup - Register and sign in
/// - POST /login - Sign in
/// - POST /logout - Clear the session cookie
/// - GET /me - Current account
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

fn build_account_service(state: &AppState) -> AccountService {
    AccountService::new(state.db.clone(), state.media.clone())
}

fn build_session_cookie(state: &AppState, account_id: &AccountId) -> Result<Cookie<'static>, AppError> {
    let session = Session::new(account_id.clone(), state.config.auth.session_max_age);
    let token = create_session_token(&session, &state.config.auth.session_secret)?;

    Ok(Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(state.config.should_use_secure_cookies())
        .same_site(SameSite::Strict)
        .max_age(cookie::time::Duration::seconds(
            state.config.auth.session_max_age,
        ))
        .build())
}

fn clear_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    cookie.make_removal();
    cookie
}

/// POST /api/auth/signup
async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let profile = build_account_service(&state)
        .register(Registration {
            full_name: req.full_name,
            username: req.username,
            email: req.email,
            password: req.password,
        })
        .await?;

    let cookie = build_session_cookie(&state, &profile.account.id)?;
    Ok((
        StatusCode::CREATED,
        jar.add(cookie),
        Json(profile_to_response(&profile)),
    ))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let profile = build_account_service(&state)
        .authenticate(&req.username, &req.password)
        .await?;

    let cookie = build_session_cookie(&state, &profile.account.id)?;
    Ok((jar.add(cookie), Json(profile_to_response(&profile))))
}

/// POST /api/auth/logout
async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        jar.add(clear_session_cookie()),
        Json(MessageResponse::new("Logged out successfully")),
    )
}

/// GET /api/auth/me
async fn me(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let profile = build_account_service(&state).get_account(&account.id).await?;
    Ok(Json(profile_to_response(&profile)))
}
