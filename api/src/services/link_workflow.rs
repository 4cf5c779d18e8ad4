//! Bank Link Workflow
//!
//! Plaid Link로 계좌를 연결하고 Dwolla funding source로 등록하는 파이프라인.
//!
//! # Pipeline
//!
//! ```text
//! public token ─▶ access token + item id
//!              ─▶ 첫 번째 계좌 메타데이터
//!              ─▶ processor token (dwolla)
//!              ─▶ funding source URL
//!              ─▶ bank_accounts 레코드 저장   ◀── 유일한 로컬 side effect, 항상 마지막
//!              ─▶ "/" 무효화 신호
//! ```
//!
//! 저장 전 단계에서 실패하면 레코드는 남지 않음.

use std::sync::Arc;

use serde::Serialize;

use crate::db::{BankAccount, NewBankAccount, RecordStore, User};
use crate::error::ApiError;
use crate::services::dwolla::{AddFundingSourceParams, DwollaClient};
use crate::services::invalidation::InvalidationHub;
use crate::services::plaid::{LinkTokenRequest, PlaidClient};
use crate::types::encode_shareable_id;

/// processor token 발급 대상
const PROCESSOR: &str = "dwolla";

/// 계좌 연결 완료 결과
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeOutcome {
    /// 항상 "complete"
    pub public_token_exchange: &'static str,
    pub bank: BankAccount,
}

pub struct LinkWorkflow {
    plaid: Arc<PlaidClient>,
    dwolla: Arc<DwollaClient>,
    store: Arc<dyn RecordStore>,
    hub: Arc<InvalidationHub>,
}

impl LinkWorkflow {
    pub fn new(
        plaid: Arc<PlaidClient>,
        dwolla: Arc<DwollaClient>,
        store: Arc<dyn RecordStore>,
        hub: Arc<InvalidationHub>,
    ) -> Self {
        Self { plaid, dwolla, store, hub }
    }

    /// Plaid link token 생성
    ///
    /// 사용자 식별 필드가 비어 있으면 외부 호출 없이 실패
    pub async fn create_link_token(&self, user: &User) -> Result<String, ApiError> {
        validate_link_user(user)?;
        tracing::info!("Creating link token for user: {}", user.id);

        let request = LinkTokenRequest {
            client_user_id: user.id.clone(),
            client_name: user.full_name(),
            products: vec!["auth".to_string()],
            language: "en".to_string(),
            country_codes: vec!["US".to_string()],
        };

        let token = self.plaid.link_token_create(&request).await?;
        if token.is_empty() {
            return Err(ApiError::upstream("plaid", "empty link token"));
        }

        tracing::info!("Link token created for user: {}", user.id);
        Ok(token)
    }

    /// public token 교환 → 계좌 등록
    pub async fn exchange_public_token(
        &self,
        public_token: &str,
        user: &User,
    ) -> Result<ExchangeOutcome, ApiError> {
        if public_token.trim().is_empty() {
            return Err(ApiError::ValidationError("publicToken is required".to_string()));
        }
        tracing::info!("Exchanging public token for user: {}", user.id);

        let exchange = self.plaid.item_public_token_exchange(public_token).await?;
        tracing::debug!("Item linked: {}", exchange.item_id);

        let account = self
            .plaid
            .accounts_get(&exchange.access_token)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NotFound(format!("Accounts for item {}", exchange.item_id)))?;
        tracing::debug!("Bank account data retrieved: {} ({})", account.name, account.account_id);

        let processor_token = self
            .plaid
            .processor_token_create(&exchange.access_token, &account.account_id, PROCESSOR)
            .await?;

        let funding_source_url = self
            .dwolla
            .add_funding_source(&AddFundingSourceParams {
                dwolla_customer_id: user.dwolla_customer_id.clone(),
                processor_token,
                bank_name: account.name.clone(),
            })
            .await?;

        // 여기까지 모든 외부 호출 성공 → 저장
        let bank = self
            .store
            .create_bank_account(NewBankAccount {
                user_id: user.id.clone(),
                bank_id: exchange.item_id,
                shareable_id: encode_shareable_id(&account.account_id),
                account_id: account.account_id,
                access_token: exchange.access_token,
                funding_source_url,
            })
            .await
            .map_err(ApiError::store)?;

        self.hub.revalidate("/", "bank account linked");

        tracing::info!("Public token exchange completed: bank {}", bank.id);
        Ok(ExchangeOutcome {
            public_token_exchange: "complete",
            bank,
        })
    }
}

/// link token 발급에 필요한 필드 확인
fn validate_link_user(user: &User) -> Result<(), ApiError> {
    let missing: Vec<&str> = [
        ("$id", user.id.as_str()),
        ("firstName", user.first_name.as_str()),
        ("lastName", user.last_name.as_str()),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(field, _)| field)
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ApiError::ValidationError(format!(
            "user is missing required fields: {}",
            missing.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: &str, first: &str, last: &str) -> User {
        User {
            id: id.into(),
            user_id: "acct-1".into(),
            email: "a@b.com".into(),
            first_name: first.into(),
            last_name: last.into(),
            address1: String::new(),
            city: String::new(),
            state: String::new(),
            postal_code: String::new(),
            date_of_birth: String::new(),
            ssn: String::new(),
            dwolla_customer_id: "cust-1".into(),
            dwolla_customer_url: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_complete_user() {
        assert!(validate_link_user(&user("u1", "A", "B")).is_ok());
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        let err = validate_link_user(&user("u1", " ", "")).unwrap_err();
        match err {
            ApiError::ValidationError(msg) => {
                assert!(msg.contains("firstName"));
                assert!(msg.contains("lastName"));
                assert!(!msg.contains("$id"));
            }
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }
}
