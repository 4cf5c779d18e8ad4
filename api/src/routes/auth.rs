//! Auth Endpoints
//!
//! 세션 secret은 `appwrite-session` 쿠키로 전달됨 (HttpOnly, SameSite=Strict).
//! 사용자 범위 엔드포인트는 모두 이 쿠키로 사용자를 확인함.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

use crate::{db::User, error::ApiError, services::SignUpParams, AppState};

pub const SESSION_COOKIE: &str = "appwrite-session";

// ============ Request/Response Types ============

/// 로그인 요청
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

// ============ Handlers ============

/// POST /auth/sign-up
pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignUpParams>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::ValidationError("email and password are required".to_string()));
    }

    let signed_in = state.identity.sign_up(req).await?;
    let jar = jar.add(session_cookie(signed_in.session_secret, state.config.is_production()));

    Ok((jar, Json(signed_in.user)))
}

/// POST /auth/sign-in
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignInRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let signed_in = state.identity.sign_in(&req.email, &req.password).await?;
    let jar = jar.add(session_cookie(signed_in.session_secret, state.config.is_production()));

    Ok((jar, Json(signed_in.user)))
}

/// GET /auth/me
pub async fn me(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<User>, ApiError> {
    Ok(Json(current_user(&state, &jar).await?))
}

/// POST /auth/logout
///
/// 쿠키는 Appwrite 응답과 무관하게 삭제
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> impl IntoResponse {
    if let Some(secret) = session_secret(&jar) {
        if let Err(e) = state.identity.logout(&secret).await {
            tracing::warn!("Session delete failed during logout: {}", e);
        }
    }

    (StatusCode::NO_CONTENT, jar.remove(removal_cookie()))
}

/// GET /users/:user_id
///
/// 본인 계정만 조회 가능
pub async fn get_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user = current_user(&state, &jar).await?;
    if user.user_id != user_id {
        return Err(ApiError::NotFound(format!("User {}", user_id)));
    }

    Ok(Json(user))
}

// ============ Helpers ============

/// 세션 쿠키 → 로그인 사용자
pub async fn current_user(state: &AppState, jar: &CookieJar) -> Result<User, ApiError> {
    let secret = session_secret(jar).ok_or(ApiError::Unauthorized)?;
    state.identity.logged_in_user(&secret).await
}

/// 요청에 담긴 사용자 레코드 ID가 세션 사용자와 같은지 확인
///
/// 다른 사용자 ID는 존재 여부를 드러내지 않도록 404
pub fn ensure_owner(user: &User, requested_id: &str) -> Result<(), ApiError> {
    if user.id == requested_id {
        Ok(())
    } else {
        Err(ApiError::NotFound(format!("User {}", requested_id)))
    }
}

/// 쿠키에서 세션 secret 추출 (빈 값은 없음으로 취급)
pub fn session_secret(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|secret| !secret.is_empty())
}

fn session_cookie(secret: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, secret))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .build()
}

fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build()
}
