use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{post, put},
};

/// Authenticated Router Module
///
/// Review writes. The router is layered with `auth_middleware` in `create_router`, so every
/// handler here receives an `AuthUser` whose role may write reviews. Owner-or-admin checks
/// for existing reviews happen in `ReviewService`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /api/v1/reviews
        // Creates a review; the bootcamp comes from the body, the owner from the caller.
        .route("/api/v1/reviews", post(handlers::add_review))
        // PUT/DELETE /api/v1/reviews/{id}
        // Owner-or-admin modification and removal.
        .route(
            "/api/v1/reviews/{id}",
            put(handlers::update_review).delete(handlers::delete_review),
        )
        // POST /api/v1/bootcamps/{bootcamp_id}/reviews
        // Creates a review for the bootcamp in the path.
        .route(
            "/api/v1/bootcamps/{bootcamp_id}/reviews",
            post(handlers::add_bootcamp_review),
        )
}
