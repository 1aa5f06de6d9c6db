//! Staff identity middleware.
//!
//! Authentication itself lives in front of this service; the gateway
//! passes the verified identity down in `X-Staff-Id` / `X-Staff-Role`.
//! This layer turns the pair into a `StaffContext` extension and rejects
//! requests that arrive without one.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::StaffContext;

pub async fn require_staff(mut req: Request<axum::body::Body>, next: Next) -> Response {
    let staff_id = req
        .headers()
        .get("X-Staff-Id")
        .and_then(|v| v.to_str().ok());
    let role = req
        .headers()
        .get("X-Staff-Role")
        .and_then(|v| v.to_str().ok());

    let Some(staff) = StaffContext::from_headers(staff_id, role) else {
        return ApiError::Unauthorized.into_response();
    };

    req.extensions_mut().insert(staff);
    next.run(req).await
}
