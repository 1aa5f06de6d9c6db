//! Request audit middleware.
//!
//! Logs every API request with actor, method, path and response status.
//! Runs innermost, after the staff middleware has injected `StaffContext`.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::{ApiContext, StaffContext};

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let ctx = req.extensions().get::<ApiContext>().cloned();
    let actor = req
        .extensions()
        .get::<StaffContext>()
        .map(|s| s.staff_id.clone())
        .unwrap_or_else(|| "anonymous".to_string());

    let response = next.run(req).await;

    if let Some(ctx) = ctx {
        let status = response.status().as_u16().to_string();
        ctx.state
            .record_audit(&actor, &format!("{method} {path}"), "http_request", &path, &status);
    }

    response
}
