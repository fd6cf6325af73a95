use crate::{
    AppState,
    auth::AuthUser,
    error::ApiResult,
    extract::{ApiJson, ApiPath, ApiQuery},
    models::{
        ApiResponse, CreateReviewRequest, Empty, ListQuery, Review, ReviewDetail,
        UpdateReviewRequest,
    },
};
use axum::{Json, extract::State};
use uuid::Uuid;

// --- Public Handlers ---

/// get_reviews
///
/// [Public Route] Pages through every review. Supports `page`, `limit` and `sort`.
#[utoipa::path(
    get,
    path = "/api/v1/reviews",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of reviews with pagination links", body = [Review]),
        (status = 400, description = "Unknown sort field")
    )
)]
pub async fn get_reviews(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Review>>>> {
    let response = state.reviews().list_reviews(None, &query).await?;
    Ok(Json(response))
}

/// get_bootcamp_reviews
///
/// [Public Route] Every review of one bootcamp, unpaginated.
#[utoipa::path(
    get,
    path = "/api/v1/bootcamps/{bootcamp_id}/reviews",
    params(("bootcamp_id" = Uuid, Path, description = "Bootcamp ID")),
    responses((status = 200, description = "Reviews of the bootcamp", body = [Review]))
)]
pub async fn get_bootcamp_reviews(
    State(state): State<AppState>,
    ApiPath(bootcamp_id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<Review>>>> {
    let response = state
        .reviews()
        .list_reviews(Some(bootcamp_id), &ListQuery::default())
        .await?;
    Ok(Json(response))
}

/// get_review
///
/// [Public Route] One review with its bootcamp expanded to name and description.
/// A missing review is reported as 400.
#[utoipa::path(
    get,
    path = "/api/v1/reviews/{id}",
    params(("id" = Uuid, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Found", body = ReviewDetail),
        (status = 400, description = "Not Found")
    )
)]
pub async fn get_review(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<ReviewDetail>>> {
    let review = state.reviews().get_review(id).await?;
    Ok(Json(ApiResponse::ok(review)))
}

// --- Authenticated Handlers ---

/// add_review
///
/// [Authenticated Route] Creates a review for the bootcamp named in the body.
/// The owner is always the caller.
#[utoipa::path(
    post,
    path = "/api/v1/reviews",
    request_body = CreateReviewRequest,
    responses(
        (status = 200, description = "Created", body = Review),
        (status = 400, description = "Unknown bootcamp, invalid payload or duplicate review"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Role may not write reviews")
    )
)]
pub async fn add_review(
    auth_user: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateReviewRequest>,
) -> ApiResult<Json<ApiResponse<Review>>> {
    let review = state.reviews().add_review(&auth_user, None, payload).await?;
    Ok(Json(ApiResponse::ok(review)))
}

/// add_bootcamp_review
///
/// [Authenticated Route] Same as `add_review`, with the bootcamp taken from the path.
#[utoipa::path(
    post,
    path = "/api/v1/bootcamps/{bootcamp_id}/reviews",
    params(("bootcamp_id" = Uuid, Path, description = "Bootcamp ID")),
    request_body = CreateReviewRequest,
    responses(
        (status = 200, description = "Created", body = Review),
        (status = 400, description = "Unknown bootcamp, invalid payload or duplicate review")
    )
)]
pub async fn add_bootcamp_review(
    auth_user: AuthUser,
    State(state): State<AppState>,
    ApiPath(bootcamp_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CreateReviewRequest>,
) -> ApiResult<Json<ApiResponse<Review>>> {
    let review = state
        .reviews()
        .add_review(&auth_user, Some(bootcamp_id), payload)
        .await?;
    Ok(Json(ApiResponse::ok(review)))
}

/// update_review
///
/// [Authenticated Route] Partial update; owner or admin only.
#[utoipa::path(
    put,
    path = "/api/v1/reviews/{id}",
    params(("id" = Uuid, Path, description = "Review ID")),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Updated", body = Review),
        (status = 401, description = "Not the owner"),
        (status = 404, description = "Review Not Found")
    )
)]
pub async fn update_review(
    auth_user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateReviewRequest>,
) -> ApiResult<Json<ApiResponse<Review>>> {
    let review = state.reviews().update_review(id, &auth_user, payload).await?;
    Ok(Json(ApiResponse::ok(review)))
}

/// delete_review
///
/// [Authenticated Route] Permanent delete; owner or admin only.
#[utoipa::path(
    delete,
    path = "/api/v1/reviews/{id}",
    params(("id" = Uuid, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Deleted", body = Empty),
        (status = 401, description = "Not the owner"),
        (status = 404, description = "Review Not Found")
    )
)]
pub async fn delete_review(
    auth_user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Empty>>> {
    state.reviews().delete_review(id, &auth_user).await?;
    Ok(Json(ApiResponse::ok(Empty {})))
}
