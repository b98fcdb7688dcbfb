use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::database::AppState;

/// Middleware guarding the admin routes
///
/// When an admin token is configured, the request must carry it in the
/// `Authorization` header, either bare or as `Bearer <token>`.
///
/// If no token is configured, the check is skipped.
pub async fn admin_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    if let Some(expected) = state.config.admin_token.as_deref() {
        let provided = headers
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.strip_prefix("Bearer ").unwrap_or(value));

        if provided != Some(expected) {
            tracing::warn!(path = %request.uri().path(), "rejected admin request");
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "Invalid or missing authorization header",
                    "code": "unauthorized"
                })),
            )
                .into_response());
        }
    }

    Ok(next.run(request).await)
}
