use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Unauthenticated, read-only endpoints.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /api/v1/reviews?page=&limit=&sort=
        // Paginated listing of every review.
        .route("/api/v1/reviews", get(handlers::get_reviews))
        // GET /api/v1/reviews/{id}
        // One review, bootcamp expanded to name and description.
        .route("/api/v1/reviews/{id}", get(handlers::get_review))
        // GET /api/v1/bootcamps/{bootcamp_id}/reviews
        // Every review of one bootcamp, unpaginated.
        .route(
            "/api/v1/bootcamps/{bootcamp_id}/reviews",
            get(handlers::get_bootcamp_reviews),
        )
}
