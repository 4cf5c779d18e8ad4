//! Database Models
//!
//! 레코드 저장소 모델: 사용자, 연결된 은행 계좌, 외부 지갑 주소.
//! JSON 필드명은 대시보드 클라이언트 형식을 따름 (`$id`, camelCase).
//! 민감 필드(`ssn`, `access_token`)는 응답에서 제외.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 사용자 레코드
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// 레코드 ID
    #[serde(rename = "$id")]
    pub id: String,

    /// Appwrite 계정 ID
    pub user_id: String,

    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub date_of_birth: String,

    /// 응답에 포함하지 않음
    #[serde(skip_serializing, default)]
    pub ssn: String,

    pub dwolla_customer_id: String,
    pub dwolla_customer_url: String,

    pub created_at: DateTime<Utc>,
}

impl User {
    /// "First Last"
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// 사용자 생성 입력
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub date_of_birth: String,
    pub ssn: String,
    pub dwolla_customer_id: String,
    pub dwolla_customer_url: String,
}

/// 연결된 은행 계좌
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    #[serde(rename = "$id")]
    pub id: String,

    pub user_id: String,

    /// Plaid item ID
    pub bank_id: String,

    /// Plaid account ID
    pub account_id: String,

    /// Plaid access token (응답에 포함하지 않음)
    #[serde(skip_serializing, default)]
    pub access_token: String,

    /// Dwolla funding source URL
    pub funding_source_url: String,

    /// account_id의 공유용 인코딩
    pub shareable_id: String,

    pub created_at: DateTime<Utc>,
}

/// 은행 계좌 생성 입력
#[derive(Debug, Clone)]
pub struct NewBankAccount {
    pub user_id: String,
    pub bank_id: String,
    pub account_id: String,
    pub access_token: String,
    pub funding_source_url: String,
    pub shareable_id: String,
}

/// 외부 지갑 주소
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAccount {
    #[serde(rename = "$id")]
    pub id: String,

    pub user_id: String,

    /// EIP-55 체크섬 주소
    pub address: String,

    pub created_at: DateTime<Utc>,
}
