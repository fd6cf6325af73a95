mod common;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use bootcamp_reviews::{
    extract::{ApiJson, ApiPath, ApiQuery},
    handlers,
    models::{CreateReviewRequest, Empty, ListQuery, ReviewDetail, UpdateReviewRequest},
};
use common::*;
use tokio::test;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// --- Public handlers ---

#[test]
async fn test_get_review_success() {
    let (state, _) = state_with(seeded_repo());

    let Json(response) = handlers::get_review(State(state), ApiPath(REVIEW_ID))
        .await
        .unwrap();

    assert!(response.success);
    let detail: ReviewDetail = response.data;
    assert_eq!(detail.id, REVIEW_ID);
    assert_eq!(detail.bootcamp.name, "Devworks Bootcamp");
}

#[test]
async fn test_get_review_not_found_body() {
    let (state, _) = state_with(seeded_repo());

    let err = handlers::get_review(State(state), ApiPath(MISSING_REVIEW_ID))
        .await
        .unwrap_err();
    let response = err.into_response();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body, serde_json::json!({ "success": false, "error": "Not Found" }));
}

#[test]
async fn test_get_bootcamp_reviews_counts() {
    let (state, _) = state_with(seeded_repo());

    let Json(response) = handlers::get_bootcamp_reviews(State(state), ApiPath(BOOTCAMP_ID))
        .await
        .unwrap();

    assert_eq!(response.count, Some(1));
    assert_eq!(response.data[0].id, REVIEW_ID);
}

#[test]
async fn test_get_reviews_includes_pagination() {
    let (state, _) = state_with(seeded_repo());

    let result = handlers::get_reviews(State(state), ApiQuery(ListQuery::default())).await;
    let body = body_json(result.into_response()).await;

    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 1);
    // Single page: neither link is present.
    assert_eq!(body["pagination"], serde_json::json!({}));
}

// --- Authenticated handlers ---

#[test]
async fn test_add_review_success() {
    let (state, _) = state_with(seeded_repo());
    let payload = CreateReviewRequest {
        title: Some("Solid curriculum".to_string()),
        text: Some("Would recommend".to_string()),
        rating: Some(7),
        bootcamp: Some(EMPTY_BOOTCAMP_ID),
        user: Some(ADMIN_ID),
    };

    let Json(response) = handlers::add_review(other_user(), State(state), ApiJson(payload))
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(response.data.user, OTHER_USER_ID);
    assert_eq!(response.data.rating, 7);
}

#[test]
async fn test_add_review_missing_bootcamp_is_bare_failure() {
    let (state, repo) = state_with(seeded_repo());
    let payload = CreateReviewRequest {
        title: Some("Ghost".to_string()),
        text: Some("Does not exist".to_string()),
        rating: Some(5),
        bootcamp: Some(MISSING_BOOTCAMP_ID),
        user: None,
    };

    let err = handlers::add_review(other_user(), State(state), ApiJson(payload))
        .await
        .unwrap_err();
    let response = err.into_response();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, serde_json::json!({ "success": false }));
    assert_eq!(repo.review_count().await, 1);
}

#[test]
async fn test_update_review_forbidden_for_other_user() {
    let (state, _) = state_with(seeded_repo());

    let err = handlers::update_review(
        other_user(),
        State(state),
        ApiPath(REVIEW_ID),
        ApiJson(UpdateReviewRequest::default()),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[test]
async fn test_update_review_by_owner() {
    let (state, _) = state_with(seeded_repo());
    let payload = UpdateReviewRequest {
        text: Some("Even better the second time".to_string()),
        ..UpdateReviewRequest::default()
    };

    let Json(response) =
        handlers::update_review(owner(), State(state), ApiPath(REVIEW_ID), ApiJson(payload))
            .await
            .unwrap();

    assert_eq!(response.data.text, "Even better the second time");
}

#[test]
async fn test_delete_review_returns_empty_object() {
    let (state, repo) = state_with(seeded_repo());

    let Json(response) = handlers::delete_review(owner(), State(state), ApiPath(REVIEW_ID))
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(response.data, Empty {});
    assert_eq!(serde_json::to_value(&response).unwrap()["data"], serde_json::json!({}));
    assert_eq!(repo.review_count().await, 0);
}

#[test]
async fn test_delete_missing_review_is_404() {
    let (state, _) = state_with(seeded_repo());

    let err = handlers::delete_review(admin(), State(state), ApiPath(MISSING_REVIEW_ID))
        .await
        .unwrap_err();
    let response = err.into_response();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "success": false, "error": "Review Not Found" })
    );
}
