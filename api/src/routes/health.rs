//! Health Check Endpoint
//!
//! 레코드 저장소까지 확인하는 deep health check.
//! Plaid / Dwolla / Appwrite는 호출하지 않음 (요청마다 외부 과금 방지).

use std::time::Instant;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// "healthy" | "degraded"
    pub status: &'static str,
    pub version: &'static str,
    pub environment: String,
    pub store: StoreStatus,
    pub wallet_provider: bool,
    pub websocket_connections: usize,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct StoreStatus {
    pub reachable: bool,
    pub latency_ms: Option<u64>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let started = Instant::now();
    let store = match state.store.health_check().await {
        Ok(()) => StoreStatus {
            reachable: true,
            latency_ms: Some(started.elapsed().as_millis() as u64),
        },
        Err(e) => {
            tracing::warn!("Record store health check failed: {:#}", e);
            StoreStatus {
                reachable: false,
                latency_ms: None,
            }
        }
    };

    Json(HealthResponse {
        status: if store.reachable { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        environment: format!("{:?}", state.config.environment).to_lowercase(),
        store,
        wallet_provider: state.config.wallet_provider_url.is_some(),
        websocket_connections: state.hub.active_connections().await,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
