//! Database Module
//!
//! PostgreSQL 기반 `RecordStore` 구현.
//!
//! # Tables
//! - `users`: 사용자 프로필 + Dwolla customer 참조
//! - `bank_accounts`: Plaid 연결 계좌 + Dwolla funding source
//! - `wallet_accounts`: 외부 지갑 주소
//!
//! 모든 ID는 UUID v4 문자열. 업데이트 / 삭제 쿼리 없음.

mod models;
mod repository;

pub use models::*;
pub use repository::{MemoryStore, RecordStore};

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

/// 데이터베이스 연결 및 쿼리 담당
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 데이터베이스 연결
    ///
    /// # Connection Pool Settings
    ///
    /// - max_connections: 10
    /// - min_connections: 1
    /// - acquire_timeout: 3초
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(std::time::Duration::from_secs(3))
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        Ok(Self { pool })
    }

    /// 마이그레이션 실행
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await?;
        Ok(())
    }
}

const USER_COLUMNS: &str = r#"
    id, user_id, email, first_name, last_name, address1, city, state,
    postal_code, date_of_birth, ssn, dwolla_customer_id, dwolla_customer_url,
    created_at
"#;

const BANK_COLUMNS: &str = r#"
    id, user_id, bank_id, account_id, access_token, funding_source_url,
    shareable_id, created_at
"#;

#[async_trait]
impl RecordStore for Database {
    /// Health check
    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let sql = format!(
            r#"
            INSERT INTO users (
                id, user_id, email, first_name, last_name, address1, city, state,
                postal_code, date_of_birth, ssn, dwolla_customer_id, dwolla_customer_url,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NOW())
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let record = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4().to_string())
            .bind(&user.user_id)
            .bind(&user.email)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.address1)
            .bind(&user.city)
            .bind(&user.state)
            .bind(&user.postal_code)
            .bind(&user.date_of_birth)
            .bind(&user.ssn)
            .bind(&user.dwolla_customer_id)
            .bind(&user.dwolla_customer_url)
            .fetch_one(&self.pool)
            .await?;

        Ok(record)
    }

    async fn find_user_by_user_id(&self, user_id: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE user_id = $1 LIMIT 1", USER_COLUMNS);

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn create_bank_account(&self, account: NewBankAccount) -> Result<BankAccount> {
        let sql = format!(
            r#"
            INSERT INTO bank_accounts (
                id, user_id, bank_id, account_id, access_token, funding_source_url,
                shareable_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            RETURNING {}
            "#,
            BANK_COLUMNS
        );

        let record = sqlx::query_as::<_, BankAccount>(&sql)
            .bind(Uuid::new_v4().to_string())
            .bind(&account.user_id)
            .bind(&account.bank_id)
            .bind(&account.account_id)
            .bind(&account.access_token)
            .bind(&account.funding_source_url)
            .bind(&account.shareable_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(record)
    }

    async fn list_bank_accounts(&self, user_id: &str) -> Result<Vec<BankAccount>> {
        let sql = format!(
            "SELECT {} FROM bank_accounts WHERE user_id = $1 ORDER BY created_at",
            BANK_COLUMNS
        );

        let banks = sqlx::query_as::<_, BankAccount>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(banks)
    }

    async fn find_bank_account(&self, document_id: &str) -> Result<Option<BankAccount>> {
        let sql = format!("SELECT {} FROM bank_accounts WHERE id = $1", BANK_COLUMNS);

        let bank = sqlx::query_as::<_, BankAccount>(&sql)
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(bank)
    }

    async fn find_bank_account_by_account_id(&self, account_id: &str) -> Result<Option<BankAccount>> {
        // 2건까지만 가져와서 유일성 확인
        let sql = format!(
            "SELECT {} FROM bank_accounts WHERE account_id = $1 LIMIT 2",
            BANK_COLUMNS
        );

        let mut banks = sqlx::query_as::<_, BankAccount>(&sql)
            .bind(account_id)
            .fetch_all(&self.pool)
            .await?;

        if banks.len() != 1 {
            return Ok(None);
        }
        Ok(banks.pop())
    }

    async fn create_wallet_account(&self, user_id: &str, address: &str) -> Result<WalletAccount> {
        let wallet = sqlx::query_as::<_, WalletAccount>(
            r#"
            INSERT INTO wallet_accounts (id, user_id, address, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING id, user_id, address, created_at
            "#
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(address)
        .fetch_one(&self.pool)
        .await?;

        Ok(wallet)
    }

    async fn list_wallet_accounts(&self, user_id: &str) -> Result<Vec<WalletAccount>> {
        let wallets = sqlx::query_as::<_, WalletAccount>(
            r#"
            SELECT id, user_id, address, created_at
            FROM wallet_accounts
            WHERE user_id = $1
            ORDER BY created_at
            "#
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(wallets)
    }
}
