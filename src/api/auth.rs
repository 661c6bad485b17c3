// =============================================================================
// Bearer Token Authentication
// =============================================================================
//
// Admin endpoints call `authorize` with the request headers and the token
// configured at startup (`VOLATISENSE_ADMIN_TOKEN`).  Comparison is performed
// in constant time.  With no token configured every admin request is
// rejected.
// =============================================================================

use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

/// Compare two byte slices in constant time.  Returns `true` if they are
/// identical.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Rejection returned when authentication fails.
#[derive(Debug)]
pub struct AuthRejection {
    status: StatusCode,
    message: &'static str,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
        });
        (self.status, axum::Json(body)).into_response()
    }
}

fn reject(status: StatusCode, message: &'static str) -> AuthRejection {
    AuthRejection { status, message }
}

/// Validate `Authorization: Bearer <token>` against `expected`.
pub fn authorize(headers: &HeaderMap, expected: Option<&str>) -> Result<(), AuthRejection> {
    let Some(expected) = expected else {
        warn!("admin token is not configured; rejecting admin request");
        return Err(reject(StatusCode::FORBIDDEN, "Server authentication not configured"));
    };

    let token = match headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value.starts_with("Bearer ") => &value[7..],
        _ => {
            warn!("missing or malformed Authorization header");
            return Err(reject(StatusCode::UNAUTHORIZED, "Missing or invalid authorization token"));
        }
    };

    if !constant_time_eq(token.as_bytes(), expected.as_bytes()) {
        warn!("invalid admin token presented");
        return Err(reject(StatusCode::FORBIDDEN, "Invalid authorization token"));
    }
    Ok(())
}
