//! Wallet Endpoints (experimental)
//!
//! 세션 확인 후에는 항상 200 + `{ success, ... }` 형태로 응답.
//! 실패는 `success: false, error`. 세션이 없으면 401.

use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::{
    error::ApiError,
    routes::auth::{current_user, ensure_owner},
    services::wallet::{ConnectedWallet, WalletAccounts, WalletTransactions},
    types::WalletResponse,
    AppState,
};

/// 지갑 연결 요청
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectWalletRequest {
    /// 생략하면 세션 사용자
    #[serde(default)]
    pub user_id: Option<String>,
}

/// POST /wallet/connect
pub async fn connect_wallet(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<ConnectWalletRequest>,
) -> Result<Json<WalletResponse<ConnectedWallet>>, ApiError> {
    let user = current_user(&state, &jar).await?;
    if let Some(requested) = req.user_id.as_deref() {
        ensure_owner(&user, requested)?;
    }

    Ok(Json(state.wallet.connect_wallet(&user.id).await))
}

/// GET /wallet/accounts/:user_id
pub async fn list_wallet_accounts(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<String>,
) -> Result<Json<WalletResponse<WalletAccounts>>, ApiError> {
    let user = current_user(&state, &jar).await?;
    ensure_owner(&user, &user_id)?;

    Ok(Json(state.wallet.list_wallet_accounts(&user.id).await))
}

/// GET /wallet/transactions/:address
///
/// 체인 공개 데이터라 세션 불필요.
/// 최근 100 블록 순차 스캔 → 응답까지 수 초 걸릴 수 있음
pub async fn list_transactions(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Json<WalletResponse<WalletTransactions>> {
    Json(state.wallet.list_transactions(&address).await)
}
