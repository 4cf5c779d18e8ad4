//! Common Types Module
//!
//! 애플리케이션 전반에서 사용되는 공통 타입 정의

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

/// 지갑 API 응답 래퍼
///
/// 지갑 관련 작업은 에러를 던지지 않고 `success: false`로 변환함
#[derive(Debug, Serialize)]
pub struct WalletResponse<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> WalletResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// 공유 링크용 계좌 ID 인코딩
///
/// 암호화가 아닌 가역 난독화 (Base64)
pub fn encode_shareable_id(account_id: &str) -> String {
    STANDARD.encode(account_id.as_bytes())
}

/// `encode_shareable_id`의 역변환
pub fn decode_shareable_id(shareable_id: &str) -> Option<String> {
    let bytes = STANDARD.decode(shareable_id).ok()?;
    String::from_utf8(bytes).ok()
}

/// Ethereum 주소 타입
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EthAddress(String);

impl EthAddress {
    pub fn new(addr: &str) -> Result<Self, String> {
        let addr = addr.to_lowercase();
        if addr.starts_with("0x") && addr.len() == 42 && addr[2..].chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(Self(addr))
        } else {
            Err("Invalid Ethereum address format".to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
