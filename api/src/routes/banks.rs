//! Bank Account Endpoints
//!
//! 연결된 계좌 레코드 조회 (읽기 전용)
//! - 목록 / 문서 ID 조회: 세션 사용자 본인 계좌만
//! - account id / shareable id 조회: 송금 상대 계좌 확인용, 세션 불필요

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::{
    db::BankAccount,
    error::ApiError,
    routes::auth::{current_user, ensure_owner},
    types::decode_shareable_id,
    AppState,
};

/// 계좌 목록 쿼리 파라미터
#[derive(Debug, Deserialize)]
pub struct BanksQuery {
    /// 생략하면 세션 사용자
    #[serde(alias = "userId")]
    pub user_id: Option<String>,
}

/// GET /banks?user_id=
pub async fn list_banks(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<BanksQuery>,
) -> Result<Json<Vec<BankAccount>>, ApiError> {
    let user = current_user(&state, &jar).await?;
    if let Some(requested) = query.user_id.as_deref() {
        ensure_owner(&user, requested)?;
    }

    let banks = state
        .store
        .list_bank_accounts(&user.id)
        .await
        .map_err(ApiError::store)?;

    Ok(Json(banks))
}

/// GET /banks/:document_id
pub async fn get_bank(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(document_id): Path<String>,
) -> Result<Json<BankAccount>, ApiError> {
    let user = current_user(&state, &jar).await?;

    state
        .store
        .find_bank_account(&document_id)
        .await
        .map_err(ApiError::store)?
        .filter(|bank| bank.user_id == user.id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Bank {}", document_id)))
}

/// GET /banks/account/:account_id
///
/// account_id가 정확히 한 레코드에 매칭될 때만 반환
pub async fn get_bank_by_account_id(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<BankAccount>, ApiError> {
    find_by_account_id(&state, &account_id).await.map(Json)
}

/// GET /banks/shared/:shareable_id
pub async fn get_bank_by_shareable_id(
    State(state): State<AppState>,
    Path(shareable_id): Path<String>,
) -> Result<Json<BankAccount>, ApiError> {
    let account_id = decode_shareable_id(&shareable_id)
        .ok_or_else(|| ApiError::BadRequest("Invalid shareable id".to_string()))?;

    find_by_account_id(&state, &account_id).await.map(Json)
}

async fn find_by_account_id(state: &AppState, account_id: &str) -> Result<BankAccount, ApiError> {
    state
        .store
        .find_bank_account_by_account_id(account_id)
        .await
        .map_err(ApiError::store)?
        .ok_or_else(|| ApiError::NotFound(format!("Bank for account {}", account_id)))
}
