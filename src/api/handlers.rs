//! HTTP request handlers for the Storefront Insights API
//!
//! Handlers only read: they pull a snapshot (or a live acquisition) from the
//! store, run the aggregates and serialize the result.

use axum::{
    extract::{Path, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{error, warn};

use crate::core::config::InsightsMode;
use crate::core::{AppState, EntityType, Envelope, Error, SnapshotSummary};
use crate::system::metrics;

// Response types
/// Standard API response wrapper for command endpoints
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Whether the operation was successful
    pub success: bool,
    /// Response data (if successful)
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create a successful API response with data
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Whether the operation was successful (always false)
    pub success: bool,
    /// Error message
    pub error: String,
    /// Optional details about what was invalid
    pub details: Option<Value>,
}

impl ErrorResponse {
    /// Create an error response with details
    pub fn with_details(error: impl Into<String>, details: Value) -> Self {
        Self {
            success: false,
            error: error.into(),
            details: Some(details),
        }
    }
}

/// Crate error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            error!(error = %self.0, "Request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = ErrorResponse {
            success: false,
            error: self.0.to_string(),
            details: None,
        };
        (status, Json(body)).into_response()
    }
}

/// Spending per user
#[derive(Debug, Serialize)]
pub struct UserInsightsResponse {
    /// Total spent per user phone
    pub user_spending: BTreeMap<String, f64>,
    /// Total of transactions without a user phone, null when there were none
    pub unattributed_spending: Option<f64>,
}

/// Category popularity
#[derive(Debug, Serialize)]
pub struct ProductInsightsResponse {
    /// Category with the most purchases
    pub most_popular_category: Option<String>,
    /// Purchases in that category
    pub purchase_count: u64,
    /// Purchases per category
    pub category_data: BTreeMap<String, u64>,
}

/// Average order value
#[derive(Debug, Serialize)]
pub struct TransactionInsightsResponse {
    /// Mean transaction value
    pub average_transaction_value: f64,
    /// Number of transactions averaged
    pub transaction_count: usize,
}

/// Result of an explicit refresh
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// When the new snapshot was assembled
    pub taken_at: DateTime<Utc>,
    /// Record counts of the new snapshot
    #[serde(flatten)]
    pub counts: SnapshotSummary,
}

/// System health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Current system status
    pub status: String,
    /// Process uptime
    pub uptime: String,
    /// Service version
    pub version: String,
    /// Age of the current snapshot
    pub snapshot_taken_at: DateTime<Utc>,
}

/// Service information
#[derive(Debug, Serialize)]
pub struct InfoResponse {
    /// Service name
    pub name: String,
    /// Service version
    pub version: String,
    /// Entity types served
    pub entity_types: Vec<&'static str>,
    /// Upstream URL per entity type
    pub sources: BTreeMap<&'static str, String>,
    /// Data source behind `/insights/products`
    pub product_insights: InsightsMode,
}

fn format_uptime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Service banner and endpoint list
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "name": "Storefront Insights",
        "version": crate::VERSION,
        "endpoints": [
            "GET /data/{entity_type}",
            "GET /insights/users",
            "GET /insights/products",
            "GET /insights/transactions",
            "POST /refresh",
            "GET /health",
            "GET /info",
            "GET /metrics"
        ]
    }))
}

/// Enveloped records of one entity type from the current snapshot
pub async fn get_data(
    State(state): State<AppState>,
    Path(entity_type): Path<String>,
) -> Result<Json<Vec<Envelope>>, (StatusCode, Json<ErrorResponse>)> {
    let entity_type = entity_type.parse::<EntityType>().map_err(|e| {
        warn!(error = %e, "Rejected data request");
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::with_details(
                "Invalid entity type",
                json!({
                    "entity_type": entity_type,
                    "valid": EntityType::ALL.iter().map(EntityType::as_str).collect::<Vec<_>>(),
                }),
            )),
        )
    })?;

    let snapshot = state.store.current();
    Ok(Json(snapshot.records(entity_type).to_vec()))
}

/// Total spending per user, from the current snapshot
pub async fn user_insights(State(state): State<AppState>) -> Json<UserInsightsResponse> {
    let insights = state.store.current().insights();

    Json(UserInsightsResponse {
        user_spending: insights.attributed_spending(),
        unattributed_spending: insights.unattributed_spending(),
    })
}

/// Most popular product category
pub async fn product_insights(State(state): State<AppState>) -> Json<ProductInsightsResponse> {
    let insights = match state.config.pipeline.product_insights {
        InsightsMode::Live => state.store.live().await.insights(),
        InsightsMode::Snapshot => state.store.current().insights(),
    };

    let (most_popular_category, purchase_count) = match insights.most_popular_category() {
        Some((category, count)) => (Some(category.to_string()), count),
        None => (None, 0),
    };

    Json(ProductInsightsResponse {
        most_popular_category,
        purchase_count,
        category_data: insights.categories,
    })
}

/// Average transaction value, from the current snapshot
pub async fn transaction_insights(State(state): State<AppState>) -> Json<TransactionInsightsResponse> {
    let insights = state.store.current().insights();

    Json(TransactionInsightsResponse {
        average_transaction_value: insights.average_value,
        transaction_count: insights.transaction_count,
    })
}

/// Re-acquire and replace the current snapshot
pub async fn refresh(State(state): State<AppState>) -> Json<ApiResponse<RefreshResponse>> {
    let snapshot = state.store.refresh().await;

    Json(ApiResponse::success(RefreshResponse {
        taken_at: snapshot.taken_at,
        counts: SnapshotSummary::from(snapshot.as_ref()),
    }))
}

/// Liveness check
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime: format_uptime(state.started_at.elapsed()),
        version: crate::VERSION.to_string(),
        snapshot_taken_at: state.store.current().taken_at,
    })
}

/// Service information
pub async fn system_info(State(state): State<AppState>) -> Json<InfoResponse> {
    let sources = EntityType::ALL
        .iter()
        .map(|entity_type| (entity_type.as_str(), state.config.sources.endpoint(*entity_type).url.clone()))
        .collect();

    Json(InfoResponse {
        name: "Storefront Insights".to_string(),
        version: crate::VERSION.to_string(),
        entity_types: EntityType::ALL.iter().map(EntityType::as_str).collect(),
        sources,
        product_insights: state.config.pipeline.product_insights,
    })
}

/// Prometheus text exposition
pub async fn metrics_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    if !state.config.metrics.enable_prometheus {
        return Ok(StatusCode::NOT_FOUND.into_response());
    }

    let body = metrics::render()?;
    Ok(([(CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(5025)), "1h 23m 45s");
        assert_eq!(format_uptime(Duration::ZERO), "0h 0m 0s");
    }

    #[test]
    fn test_client_errors_map_to_bad_request() {
        let response = ApiError(Error::invalid_input("bad")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError(Error::internal("boom")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
