//! Bank Link Endpoints
//!
//! 대시보드의 "Connect Bank" 버튼이 호출하는 엔드포인트.
//! 1. `POST /link/token` → Plaid Link 초기화
//! 2. Plaid Link 성공 콜백의 public token → `POST /link/exchange`

use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, routes::auth::current_user, services::ExchangeOutcome, AppState};

/// link token 응답
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkTokenResponse {
    pub link_token: String,
}

/// public token 교환 요청
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRequest {
    pub public_token: String,
}

/// POST /link/token
pub async fn create_link_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<LinkTokenResponse>, ApiError> {
    let user = current_user(&state, &jar).await?;
    let link_token = state.link.create_link_token(&user).await?;

    Ok(Json(LinkTokenResponse { link_token }))
}

/// POST /link/exchange
pub async fn exchange_public_token(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<ExchangeRequest>,
) -> Result<Json<ExchangeOutcome>, ApiError> {
    let user = current_user(&state, &jar).await?;
    let outcome = state.link.exchange_public_token(&req.public_token, &user).await?;

    Ok(Json(outcome))
}
