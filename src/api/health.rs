//! Health check endpoint

use axum::Json;
use chrono::Utc;
use serde::Serialize;

/// Health check response body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "healthy" when the service can respond at all
    pub status: String,
    /// Current server time, RFC 3339
    pub timestamp: String,
}

/// GET /api/health - service liveness
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_reports_healthy_with_timestamp() {
        let response = health_check().await;
        assert_eq!(response.status, "healthy");
        assert!(
            chrono::DateTime::parse_from_rfc3339(&response.timestamp).is_ok(),
            "Timestamp should be RFC 3339, got: {}",
            response.timestamp
        );
    }
}
