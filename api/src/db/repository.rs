//! Record Store
//!
//! 워크플로우는 `RecordStore` trait에만 의존함.
//! - `Database` (db/mod.rs): PostgreSQL 구현
//! - `MemoryStore`: 프로세스 내 구현 (테스트, 로컬 개발)

use async_trait::async_trait;
use anyhow::Result;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{BankAccount, NewBankAccount, NewUser, User, WalletAccount};

/// 레코드 저장소 인터페이스
///
/// 생성과 단일 필드 동등 조건 조회만 제공 (수정 / 삭제 경로 없음)
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn health_check(&self) -> Result<()>;

    // ============ users ============
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn find_user_by_user_id(&self, user_id: &str) -> Result<Option<User>>;

    // ============ bank_accounts ============
    async fn create_bank_account(&self, account: NewBankAccount) -> Result<BankAccount>;
    async fn list_bank_accounts(&self, user_id: &str) -> Result<Vec<BankAccount>>;
    async fn find_bank_account(&self, document_id: &str) -> Result<Option<BankAccount>>;

    /// account_id로 조회. 정확히 1건일 때만 반환
    async fn find_bank_account_by_account_id(&self, account_id: &str) -> Result<Option<BankAccount>>;

    // ============ wallet_accounts ============
    async fn create_wallet_account(&self, user_id: &str, address: &str) -> Result<WalletAccount>;
    async fn list_wallet_accounts(&self, user_id: &str) -> Result<Vec<WalletAccount>>;
}

/// 인메모리 레코드 저장소
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    banks: RwLock<Vec<BankAccount>>,
    wallets: RwLock<Vec<WalletAccount>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn bank_account_count(&self) -> usize {
        self.banks.read().await.len()
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let record = User {
            id: Uuid::new_v4().to_string(),
            user_id: user.user_id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            address1: user.address1,
            city: user.city,
            state: user.state,
            postal_code: user.postal_code,
            date_of_birth: user.date_of_birth,
            ssn: user.ssn,
            dwolla_customer_id: user.dwolla_customer_id,
            dwolla_customer_url: user.dwolla_customer_url,
            created_at: Utc::now(),
        };
        self.users.write().await.push(record.clone());
        Ok(record)
    }

    async fn find_user_by_user_id(&self, user_id: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.user_id == user_id).cloned())
    }

    async fn create_bank_account(&self, account: NewBankAccount) -> Result<BankAccount> {
        let record = BankAccount {
            id: Uuid::new_v4().to_string(),
            user_id: account.user_id,
            bank_id: account.bank_id,
            account_id: account.account_id,
            access_token: account.access_token,
            funding_source_url: account.funding_source_url,
            shareable_id: account.shareable_id,
            created_at: Utc::now(),
        };
        self.banks.write().await.push(record.clone());
        Ok(record)
    }

    async fn list_bank_accounts(&self, user_id: &str) -> Result<Vec<BankAccount>> {
        let banks = self.banks.read().await;
        Ok(banks.iter().filter(|b| b.user_id == user_id).cloned().collect())
    }

    async fn find_bank_account(&self, document_id: &str) -> Result<Option<BankAccount>> {
        let banks = self.banks.read().await;
        Ok(banks.iter().find(|b| b.id == document_id).cloned())
    }

    async fn find_bank_account_by_account_id(&self, account_id: &str) -> Result<Option<BankAccount>> {
        let banks = self.banks.read().await;
        let mut matches = banks.iter().filter(|b| b.account_id == account_id);
        match (matches.next(), matches.next()) {
            (Some(bank), None) => Ok(Some(bank.clone())),
            _ => Ok(None),
        }
    }

    async fn create_wallet_account(&self, user_id: &str, address: &str) -> Result<WalletAccount> {
        let record = WalletAccount {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            address: address.to_string(),
            created_at: Utc::now(),
        };
        self.wallets.write().await.push(record.clone());
        Ok(record)
    }

    async fn list_wallet_accounts(&self, user_id: &str) -> Result<Vec<WalletAccount>> {
        let wallets = self.wallets.read().await;
        Ok(wallets.iter().filter(|w| w.user_id == user_id).cloned().collect())
    }
}
