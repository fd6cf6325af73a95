use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

// Drop-in replacements for axum's `Json`, `Path` and `Query`. A body, path segment or
// query string that fails to parse is rejected through `ApiError`, so the client gets the
// usual `{"success": false, "error": "..."}` envelope instead of axum's plain-text reply.

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
