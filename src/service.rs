use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::{
        ApiResponse, CreateReviewRequest, ListQuery, Pagination, Review, ReviewDetail,
        UpdateReviewRequest,
    },
    repository::RepositoryState,
};

/// Message for a missing review on the single-review lookup (reported as 400).
pub const LOOKUP_NOT_FOUND: &str = "Not Found";
/// Message for a missing review on update/delete (reported as 404).
pub const REVIEW_NOT_FOUND: &str = "Review Not Found";
/// Shared by update and delete when the caller neither owns the review nor is an admin.
pub const NOT_REVIEW_OWNER: &str = "You can not delete another review";

/// ReviewService
///
/// The review operations, independent of HTTP. Handlers extract the request pieces and
/// delegate here; every authorization decision takes the acting user as an explicit
/// argument.
#[derive(Clone)]
pub struct ReviewService {
    repo: RepositoryState,
    page_limit: u32,
}

impl ReviewService {
    pub fn new(repo: RepositoryState, page_limit: u32) -> Self {
        Self { repo, page_limit }
    }

    /// list_reviews
    ///
    /// Scoped to a bootcamp: every review of it, no pagination.
    /// Unscoped: one page of the whole collection with `next`/`prev` links.
    pub async fn list_reviews(
        &self,
        bootcamp_id: Option<Uuid>,
        query: &ListQuery,
    ) -> ApiResult<ApiResponse<Vec<Review>>> {
        match bootcamp_id {
            Some(bootcamp_id) => {
                let reviews = self.repo.get_bootcamp_reviews(bootcamp_id).await?;
                Ok(ApiResponse::list(reviews))
            }
            None => {
                let page = query.resolve(self.page_limit)?;
                let result = self.repo.list_reviews(page).await?;
                let pagination = Pagination::new(&page, result.total);
                Ok(ApiResponse::paginated(result.reviews, pagination))
            }
        }
    }

    pub async fn get_review(&self, id: Uuid) -> ApiResult<ReviewDetail> {
        self.repo
            .get_review_detail(id)
            .await?
            .ok_or_else(|| ApiError::BadRequest(LOOKUP_NOT_FOUND.to_string()))
    }

    /// add_review
    ///
    /// The caller always becomes the owner, whatever `user` the payload carried. A bootcamp
    /// id from the route takes precedence over the one in the body.
    pub async fn add_review(
        &self,
        actor: &AuthUser,
        route_bootcamp: Option<Uuid>,
        mut payload: CreateReviewRequest,
    ) -> ApiResult<Review> {
        payload.user = Some(actor.id);

        let bootcamp_id = route_bootcamp
            .or(payload.bootcamp)
            .ok_or(ApiError::BootcampNotFound)?;

        if self.repo.get_bootcamp(bootcamp_id).await?.is_none() {
            tracing::debug!(%bootcamp_id, "review rejected: unknown bootcamp");
            return Err(ApiError::BootcampNotFound);
        }

        let new_review = payload.into_new_review(bootcamp_id)?;
        let review = self.repo.create_review(new_review).await?;

        tracing::info!(review_id = %review.id, user_id = %actor.id, %bootcamp_id, "review created");
        Ok(review)
    }

    /// update_review
    ///
    /// Runs as one conditional write scoped to the caller (or unscoped for admins). Only
    /// when nothing matched is the review looked up again, to tell "absent" from "not yours".
    pub async fn update_review(
        &self,
        id: Uuid,
        actor: &AuthUser,
        payload: UpdateReviewRequest,
    ) -> ApiResult<Review> {
        if let Err(invalid) = payload.validate() {
            // Existence and ownership are reported ahead of payload problems.
            self.check_access(id, actor).await?;
            return Err(invalid);
        }

        let updated = if actor.is_admin() {
            self.repo.update_review_admin(id, payload).await?
        } else {
            self.repo.update_review(id, actor.id, payload).await?
        };

        match updated {
            Some(review) => {
                tracing::info!(review_id = %id, user_id = %actor.id, "review updated");
                Ok(review)
            }
            None => Err(self.explain_miss(id, actor).await),
        }
    }

    pub async fn delete_review(&self, id: Uuid, actor: &AuthUser) -> ApiResult<()> {
        let deleted = if actor.is_admin() {
            self.repo.delete_review_admin(id).await?
        } else {
            self.repo.delete_review(id, actor.id).await?
        };

        if deleted {
            tracing::info!(review_id = %id, user_id = %actor.id, "review deleted");
            Ok(())
        } else {
            Err(self.explain_miss(id, actor).await)
        }
    }

    /// Existence + owner-or-admin check against the current stored state.
    async fn check_access(&self, id: Uuid, actor: &AuthUser) -> ApiResult<Review> {
        let review = self
            .repo
            .get_review(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(REVIEW_NOT_FOUND.to_string()))?;

        if may_modify(&review, actor) {
            Ok(review)
        } else {
            Err(ApiError::Forbidden(NOT_REVIEW_OWNER.to_string()))
        }
    }

    /// Picks the error for a conditional write that matched no row.
    async fn explain_miss(&self, id: Uuid, actor: &AuthUser) -> ApiError {
        match self.check_access(id, actor).await {
            Err(e) => e,
            // Row reappeared after the write; treat as absent at write time.
            Ok(_) => ApiError::NotFound(REVIEW_NOT_FOUND.to_string()),
        }
    }
}

/// Owner-or-admin predicate.
pub fn may_modify(review: &Review, actor: &AuthUser) -> bool {
    review.user == actor.id || actor.is_admin()
}
