//! Directory integration API routes
//!
//! # Route Structure
//!
//! - `GET /api/directory/status` - Integration status and resolved ids
//! - `GET /api/directory/columns` - Column metadata of the backing list
//!
//! When the integration is not configured both endpoints answer with a
//! disabled marker instead of an error, so dashboards can probe safely.

use crate::api::response::{ApiResponse, ErrorResponse};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use super::client::{DirectoryError, DirectoryHandle};

// ============================================================================
// Router Configuration
// ============================================================================

/// Creates the directory router with all routes configured
pub fn directory_routes() -> Router<DirectoryHandle> {
    Router::new()
        .route("/status", get(directory_status))
        .route("/columns", get(directory_columns))
}

// ============================================================================
// Handlers
// ============================================================================

/// Report integration status
///
/// # Endpoint
///
/// `GET /api/directory/status`
///
/// Resolves and caches the site and list ids when configured.
///
/// # Response
///
/// - `200 OK` - `{"configured": false}` or the resolved ids
/// - `502 Bad Gateway` - Directory service unreachable or refused
#[tracing::instrument(skip(client))]
async fn directory_status(
    State(client): State<DirectoryHandle>,
) -> Result<Response, DirectoryApiError> {
    let Some(client) = client else {
        return Ok(disabled_marker());
    };

    let site_id = client.site_id().await?;
    let list_id = client.list_id().await?;

    let data = json!({
        "configured": true,
        "site_id": site_id,
        "list_id": list_id,
        "list_name": client.list_name(),
    });

    Ok((StatusCode::OK, Json(ApiResponse::success(data))).into_response())
}

/// Enumerate columns of the backing list
///
/// # Endpoint
///
/// `GET /api/directory/columns`
///
/// # Response
///
/// - `200 OK` - Column definitions, or `{"configured": false}`
/// - `502 Bad Gateway` - Directory service unreachable or refused
#[tracing::instrument(skip(client))]
async fn directory_columns(
    State(client): State<DirectoryHandle>,
) -> Result<Response, DirectoryApiError> {
    let Some(client) = client else {
        return Ok(disabled_marker());
    };

    let columns = client.columns().await?;

    let meta = json!({ "count": columns.len() });

    Ok((StatusCode::OK, Json(ApiResponse::success_with_meta(columns, meta))).into_response())
}

fn disabled_marker() -> Response {
    let data = json!({ "configured": false });
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

// ============================================================================
// Error Handling
// ============================================================================

/// Error type for directory API endpoints
#[derive(Debug)]
struct DirectoryApiError(DirectoryError);

impl From<DirectoryError> for DirectoryApiError {
    fn from(err: DirectoryError) -> Self {
        Self(err)
    }
}

impl IntoResponse for DirectoryApiError {
    fn into_response(self) -> Response {
        tracing::error!("Directory API call failed: {}", self.0);
        let error = ErrorResponse::new("DIRECTORY_ERROR", self.0.to_string());
        (StatusCode::BAD_GATEWAY, Json(error)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[test]
    fn test_routes_structure() {
        let router = directory_routes();
        assert!(format!("{:?}", router).contains("Router"));
    }

    #[tokio::test]
    async fn test_status_reports_disabled_when_unconfigured() {
        let app = directory_routes().with_state(None);

        let response = app
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["configured"], json!(false));
    }

    #[tokio::test]
    async fn test_columns_report_disabled_when_unconfigured() {
        let app = directory_routes().with_state(None);

        let response = app
            .oneshot(Request::builder().uri("/columns").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["data"]["configured"], json!(false));
    }
}
