//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use serde::{Deserialize, Serialize};

// ============================================
// INGEST DTOs
// ============================================

/// Reading posted by the device
///
/// Fields are optional at the wire level so a missing value becomes a
/// validation error rather than a deserializer message. Readings are always
/// stamped by the store; any other field in the body is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
}

/// Ingest acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub success: bool,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" or "unhealthy"
    pub status: String,
    /// "ok" or "error"
    pub storage: String,
    /// Currently connected live viewers
    pub observers: usize,
    pub uptime_seconds: u64,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_request_missing_fields() {
        let req: IngestRequest = serde_json::from_str(r#"{"temperature": 20.0}"#).unwrap();
        assert_eq!(req.temperature, Some(20.0));
        assert!(req.humidity.is_none());
    }

    #[test]
    fn test_ingest_request_integer_values() {
        let req: IngestRequest =
            serde_json::from_str(r#"{"temperature": 21, "humidity": 60}"#).unwrap();
        assert_eq!(req.temperature, Some(21.0));
        assert_eq!(req.humidity, Some(60.0));
    }

    #[test]
    fn test_ingest_request_ignores_extra_fields() {
        let req: IngestRequest = serde_json::from_str(
            r#"{"temperature": 21.5, "humidity": 60, "timestamp": "2030-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(req.temperature, Some(21.5));
        assert_eq!(req.humidity, Some(60.0));
    }

    #[test]
    fn test_ingest_request_rejects_strings() {
        let result =
            serde_json::from_str::<IngestRequest>(r#"{"temperature": "21.5", "humidity": 60}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_ingest_response_shape() {
        let json = serde_json::to_string(&IngestResponse { success: true }).unwrap();
        assert_eq!(json, r#"{"success":true}"#);
    }
}
