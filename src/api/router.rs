//! REST router for the front-desk terminals.
//!
//! Routes are nested under `/api/`. All routes except `/api/health`
//! require the staff identity headers set by the upstream authenticator.
//!
//! Middleware stack (outermost → innermost):
//! 1. Staff identity → 2. Audit logger → handler

use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::state::AppState;

/// Build the API router.
pub fn api_router(state: Arc<AppState>) -> Router {
    let ctx = ApiContext::new(state);

    // Protected routes — staff headers required.
    //
    // Layers are applied bottom (innermost) to top (outermost): the staff
    // middleware must run before the audit logger can name the actor.
    let protected = Router::new()
        .route("/patients", post(endpoints::patients::create).get(endpoints::patients::list))
        .route(
            "/patients/:id",
            get(endpoints::patients::detail)
                .put(endpoints::patients::update)
                .delete(endpoints::patients::remove),
        )
        .route(
            "/appointments",
            post(endpoints::appointments::book).get(endpoints::appointments::for_day),
        )
        .route("/appointments/:id", get(endpoints::appointments::detail))
        .route("/queue/walk-in", post(endpoints::queue::walk_in))
        .route("/queue/:id/check-in", put(endpoints::queue::check_in))
        .route("/queue/:id/start", put(endpoints::queue::start))
        .route("/queue/:id/complete", put(endpoints::queue::complete))
        .route("/queue/:id/cancel", put(endpoints::queue::cancel))
        .route("/queue/:id/no-show", put(endpoints::queue::no_show))
        .route("/queue/:id/reschedule", put(endpoints::queue::reschedule))
        .route("/queue/reorder", put(endpoints::queue::reorder))
        .route("/queue/today", get(endpoints::queue::today))
        .route("/queue/next", get(endpoints::queue::next))
        .route("/queue/stats", get(endpoints::queue::stats))
        .route("/queue/reset", delete(endpoints::queue::reset))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::staff::require_staff))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    // Unprotected routes — liveness only.
    let unprotected = Router::new()
        .route("/health", get(endpoints::health::check))
        .with_state(ctx.clone())
        .layer(axum::Extension(ctx));

    Router::new()
        .nest("/api", protected)
        .nest("/api", unprotected)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
