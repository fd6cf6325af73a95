use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Role value granting override rights over any review.
pub const ADMIN_ROLE: &str = "admin";

/// Roles allowed to create, update or delete reviews.
pub const REVIEW_WRITER_ROLES: &[&str] = &["user", ADMIN_ROLE];

pub const TITLE_MAX_LEN: usize = 100;
pub const RATING_RANGE: std::ops::RangeInclusive<i32> = 1..=10;

/// Hard ceiling on the page size a client may request.
pub const MAX_PAGE_LIMIT: u32 = 100;

// --- Stored Records ---

/// User
///
/// Identity record from the `users` table. Only `id` and `role` matter to this service;
/// they are resolved on every authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    // 'user', 'publisher' or 'admin'.
    pub role: String,
}

/// Bootcamp
///
/// The parent resource a review is written about. Read-only from this service's point of
/// view, except for `average_rating` which is recomputed whenever its reviews change.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Bootcamp {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub website: Option<String>,
    pub average_rating: Option<f64>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// BootcampSummary
///
/// The slice of a bootcamp exposed when a single review is fetched.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct BootcampSummary {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

impl From<&Bootcamp> for BootcampSummary {
    fn from(bootcamp: &Bootcamp) -> Self {
        Self {
            id: bootcamp.id,
            name: bootcamp.name.clone(),
            description: bootcamp.description.clone(),
        }
    }
}

/// Review
///
/// A row of the `reviews` table. `bootcamp` and `user` are foreign keys; the SQL column
/// names carry an `_id` suffix.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Review {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub rating: i32,
    #[sqlx(rename = "bootcamp_id")]
    pub bootcamp: Uuid,
    #[sqlx(rename = "user_id")]
    pub user: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// ReviewDetail
///
/// A review with its bootcamp reference expanded to `{id, name, description}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct ReviewDetail {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub rating: i32,
    pub bootcamp: BootcampSummary,
    pub user: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl ReviewDetail {
    pub fn new(review: Review, bootcamp: BootcampSummary) -> Self {
        Self {
            id: review.id,
            title: review.title,
            text: review.text,
            rating: review.rating,
            bootcamp,
            user: review.user,
            created_at: review.created_at,
        }
    }
}

// --- Request Payloads ---

/// CreateReviewRequest
///
/// Body of `POST /reviews`. Every field is optional at the JSON level so that a missing
/// field is reported as a validation message. A `bootcamp` that is not a UUID reads as
/// absent and so fails like an unknown bootcamp. `user` is accepted for compatibility but
/// always replaced by the caller's id.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateReviewRequest {
    pub title: Option<String>,
    pub text: Option<String>,
    pub rating: Option<i32>,
    #[serde(default, deserialize_with = "lenient_uuid")]
    pub bootcamp: Option<Uuid>,
    #[serde(default, deserialize_with = "lenient_uuid")]
    pub user: Option<Uuid>,
}

/// NewReview
///
/// A validated review ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub title: String,
    pub text: String,
    pub rating: i32,
    pub bootcamp: Uuid,
    pub user: Uuid,
}

impl CreateReviewRequest {
    /// Checks every field and produces the insertable record. `bootcamp` must already be
    /// resolved by the caller.
    pub fn into_new_review(self, bootcamp: Uuid) -> ApiResult<NewReview> {
        let mut problems = Vec::new();

        match self.title.as_deref().map(str::trim) {
            None | Some("") => problems.push("Please add a title for the review".to_string()),
            Some(title) => check_title(title, &mut problems),
        }
        if self.text.as_deref().map(str::trim).unwrap_or_default().is_empty() {
            problems.push("Please add some text".to_string());
        }
        match self.rating {
            Some(rating) => check_rating(rating, &mut problems),
            None => problems.push(rating_message()),
        }

        if !problems.is_empty() {
            return Err(ApiError::Validation(problems.join(", ")));
        }
        // Injected server-side from the authenticated caller before this runs.
        let user = self.user.ok_or(ApiError::Unauthorized)?;

        Ok(NewReview {
            title: self.title.unwrap_or_default().trim().to_string(),
            text: self.text.unwrap_or_default(),
            rating: self.rating.unwrap_or_default(),
            bootcamp,
            user,
        })
    }
}

/// UpdateReviewRequest
///
/// Partial update payload for `PUT /reviews/{id}`. Only provided fields are changed.
/// Ownership fields (`user`, `bootcamp`) are not part of the payload and cannot be moved.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateReviewRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
}

impl UpdateReviewRequest {
    /// Re-runs the field rules on whatever the payload provides.
    pub fn validate(&self) -> ApiResult<()> {
        let mut problems = Vec::new();

        if let Some(title) = self.title.as_deref().map(str::trim) {
            if title.is_empty() {
                problems.push("Please add a title for the review".to_string());
            } else {
                check_title(title, &mut problems);
            }
        }
        if let Some(text) = &self.text {
            if text.trim().is_empty() {
                problems.push("Please add some text".to_string());
            }
        }
        if let Some(rating) = self.rating {
            check_rating(rating, &mut problems);
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(problems.join(", ")))
        }
    }

    /// Merges the provided fields into an existing review.
    pub fn apply_to(&self, review: &mut Review) {
        if let Some(title) = &self.title {
            review.title = title.trim().to_string();
        }
        if let Some(text) = &self.text {
            review.text = text.clone();
        }
        if let Some(rating) = self.rating {
            review.rating = rating;
        }
    }
}

/// Reads any JSON value as an optional reference id; anything but a UUID string is `None`.
fn lenient_uuid<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok()))
}

fn check_title(title: &str, problems: &mut Vec<String>) {
    if title.chars().count() > TITLE_MAX_LEN {
        problems.push(format!("Title can not be more than {TITLE_MAX_LEN} characters"));
    }
}

fn check_rating(rating: i32, problems: &mut Vec<String>) {
    if !RATING_RANGE.contains(&rating) {
        problems.push(rating_message());
    }
}

fn rating_message() -> String {
    format!(
        "Please add a rating between {} and {}",
        RATING_RANGE.start(),
        RATING_RANGE.end()
    )
}

// --- Listing ---

/// ListQuery
///
/// Query parameters accepted by the unscoped listing (`GET /reviews`).
#[derive(Debug, Clone, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// 1-based page number.
    pub page: Option<u32>,
    /// Page size, capped at 100.
    pub limit: Option<u32>,
    /// `createdAt`, `rating` or `title`; prefix with `-` for descending order.
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    Rating,
    Title,
}

impl SortField {
    /// SQL column for ORDER BY. Never derived from user input directly.
    pub fn column(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Rating => "rating",
            SortField::Title => "title",
        }
    }
}

/// PageRequest
///
/// A `ListQuery` with defaults applied and the sort key parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
    pub sort: SortField,
    pub descending: bool,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

impl ListQuery {
    pub fn resolve(&self, default_limit: u32) -> ApiResult<PageRequest> {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_LIMIT);

        let raw = self.sort.as_deref().unwrap_or("-created_at").trim();
        let (descending, field) = match raw.strip_prefix('-') {
            Some(field) => (true, field),
            None => (false, raw),
        };
        let sort = match field {
            "created_at" | "createdAt" => SortField::CreatedAt,
            "rating" => SortField::Rating,
            "title" => SortField::Title,
            other => {
                return Err(ApiError::Validation(format!("Cannot sort reviews by '{other}'")));
            }
        };

        Ok(PageRequest {
            page,
            limit,
            sort,
            descending,
        })
    }
}

/// ReviewPage
///
/// One page of reviews plus the size of the whole collection.
#[derive(Debug, Clone, Default)]
pub struct ReviewPage {
    pub reviews: Vec<Review>,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct PageLink {
    pub page: u32,
    pub limit: u32,
}

/// Pagination
///
/// Links to the neighbouring pages, present only when those pages exist.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageLink>,
}

impl Pagination {
    pub fn new(request: &PageRequest, total: u64) -> Self {
        let end = request.offset() + u64::from(request.limit);
        let next = (end < total).then(|| PageLink {
            page: request.page + 1,
            limit: request.limit,
        });
        let prev = (request.offset() > 0).then(|| PageLink {
            page: request.page - 1,
            limit: request.limit,
        });
        Self { next, prev }
    }
}

// --- Response Envelopes ---

/// ApiResponse
///
/// Success envelope shared by every review endpoint: `{success, count?, pagination?, data}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            count: None,
            pagination: None,
            data,
        }
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn list(data: Vec<T>) -> Self {
        Self {
            success: true,
            count: Some(data.len()),
            pagination: None,
            data,
        }
    }

    pub fn paginated(data: Vec<T>, pagination: Pagination) -> Self {
        Self {
            pagination: Some(pagination),
            ..Self::list(data)
        }
    }
}

/// Serializes as `{}`; the payload of a successful delete.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Empty {}
