use crate::error::{ApiError, ApiResult};
use crate::models::{
    Bootcamp, BootcampSummary, NewReview, PageRequest, Review, ReviewDetail, ReviewPage, SortField,
    UpdateReviewRequest, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction, query_builder::QueryBuilder};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Repository Trait
///
/// Abstract contract for every persistence operation the service needs. Handlers and the
/// `ReviewService` only ever see `Arc<dyn Repository>`, so the Postgres implementation and
/// the in-memory one used by tests are interchangeable.
///
/// Failures are returned as `ApiError`, never swallowed: constraint violations arrive
/// already mapped to their domain meaning (see `From<sqlx::Error> for ApiError`).
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Identity / References ---
    async fn get_user(&self, id: Uuid) -> ApiResult<Option<User>>;
    async fn get_bootcamp(&self, id: Uuid) -> ApiResult<Option<Bootcamp>>;

    // --- Review Retrieval ---
    // Every review of one bootcamp, unpaginated, newest first.
    async fn get_bootcamp_reviews(&self, bootcamp_id: Uuid) -> ApiResult<Vec<Review>>;
    // One page of the whole collection plus its total size.
    async fn list_reviews(&self, page: PageRequest) -> ApiResult<ReviewPage>;
    async fn get_review(&self, id: Uuid) -> ApiResult<Option<Review>>;
    // Review joined with its bootcamp's name and description.
    async fn get_review_detail(&self, id: Uuid) -> ApiResult<Option<ReviewDetail>>;

    // --- Review Writes ---
    async fn create_review(&self, review: NewReview) -> ApiResult<Review>;

    /// Owner-Only: updates only if `user_id` matches the review's owner.
    /// `None` means no row matched (absent or not owned).
    async fn update_review(
        &self,
        id: Uuid,
        user_id: Uuid,
        req: UpdateReviewRequest,
    ) -> ApiResult<Option<Review>>;

    /// Admin Override: updates any review by id.
    async fn update_review_admin(
        &self,
        id: Uuid,
        req: UpdateReviewRequest,
    ) -> ApiResult<Option<Review>>;

    /// Owner-Only: returns true if a row was deleted.
    async fn delete_review(&self, id: Uuid, user_id: Uuid) -> ApiResult<bool>;

    /// Admin Override: deletes any review by id.
    async fn delete_review_admin(&self, id: Uuid) -> ApiResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

const REVIEW_COLUMNS: &str = "id, title, text, rating, bootcamp_id, user_id, created_at";

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Every write that changes a bootcamp's set of ratings
/// runs in a transaction together with the refresh of `bootcamps.average_rating`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Conditional update keyed on id and, when given, the owner. A single statement, so
    /// there is no window between the ownership check and the write.
    async fn update_where(
        &self,
        id: Uuid,
        owner: Option<Uuid>,
        req: UpdateReviewRequest,
    ) -> ApiResult<Option<Review>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Review>(&format!(
            r#"
            UPDATE reviews
            SET title = COALESCE($3, title),
                text = COALESCE($4, text),
                rating = COALESCE($5, rating)
            WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner)
        .bind(req.title.as_deref().map(str::trim))
        .bind(req.text)
        .bind(req.rating)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(review) = &updated {
            refresh_average_rating(&mut tx, review.bootcamp).await?;
        }
        tx.commit().await?;

        Ok(updated)
    }

    async fn delete_where(&self, id: Uuid, owner: Option<Uuid>) -> ApiResult<bool> {
        let mut tx = self.pool.begin().await?;

        let bootcamp_id = sqlx::query_scalar::<_, Uuid>(
            "DELETE FROM reviews WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2) RETURNING bootcamp_id",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(bootcamp_id) = bootcamp_id {
            refresh_average_rating(&mut tx, bootcamp_id).await?;
        }
        tx.commit().await?;

        Ok(bootcamp_id.is_some())
    }
}

/// Recomputes the mean rating of a bootcamp from its remaining reviews (NULL when none).
async fn refresh_average_rating(
    tx: &mut Transaction<'_, Postgres>,
    bootcamp_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE bootcamps
        SET average_rating = (SELECT AVG(rating)::float8 FROM reviews WHERE bootcamp_id = $1)
        WHERE id = $1
        "#,
    )
    .bind(bootcamp_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Flat row produced by the review/bootcamp join.
#[derive(FromRow)]
struct ReviewDetailRow {
    id: Uuid,
    title: String,
    text: String,
    rating: i32,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    bootcamp_id: Uuid,
    bootcamp_name: String,
    bootcamp_description: String,
}

impl From<ReviewDetailRow> for ReviewDetail {
    fn from(row: ReviewDetailRow) -> Self {
        ReviewDetail {
            id: row.id,
            title: row.title,
            text: row.text,
            rating: row.rating,
            bootcamp: BootcampSummary {
                id: row.bootcamp_id,
                name: row.bootcamp_name,
                description: row.bootcamp_description,
            },
            user: row.user_id,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, name, email, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_bootcamp(&self, id: Uuid) -> ApiResult<Option<Bootcamp>> {
        let bootcamp = sqlx::query_as::<_, Bootcamp>(
            "SELECT id, name, description, website, average_rating, created_at FROM bootcamps WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(bootcamp)
    }

    async fn get_bootcamp_reviews(&self, bootcamp_id: Uuid) -> ApiResult<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE bootcamp_id = $1 ORDER BY created_at DESC, id ASC"
        ))
        .bind(bootcamp_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }

    /// list_reviews
    ///
    /// Builds the ORDER BY from the parsed `SortField` (a fixed column name, never raw
    /// client input) and binds LIMIT/OFFSET.
    async fn list_reviews(&self, page: PageRequest) -> ApiResult<ReviewPage> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {REVIEW_COLUMNS} FROM reviews ORDER BY "));
        builder.push(page.sort.column());
        builder.push(if page.descending { " DESC" } else { " ASC" });
        builder.push(", id ASC LIMIT ");
        builder.push_bind(i64::from(page.limit));
        builder.push(" OFFSET ");
        builder.push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));

        let reviews = builder
            .build_query_as::<Review>()
            .fetch_all(&self.pool)
            .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reviews")
            .fetch_one(&self.pool)
            .await?;

        Ok(ReviewPage {
            reviews,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn get_review(&self, id: Uuid) -> ApiResult<Option<Review>> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(review)
    }

    async fn get_review_detail(&self, id: Uuid) -> ApiResult<Option<ReviewDetail>> {
        let row = sqlx::query_as::<_, ReviewDetailRow>(
            r#"
            SELECT
                r.id, r.title, r.text, r.rating, r.user_id, r.created_at,
                b.id AS bootcamp_id, b.name AS bootcamp_name, b.description AS bootcamp_description
            FROM reviews r
            JOIN bootcamps b ON r.bootcamp_id = b.id
            WHERE r.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ReviewDetail::from))
    }

    /// create_review
    ///
    /// Inserts the review and refreshes the bootcamp's average in one transaction.
    /// The foreign key on `bootcamp_id` and the unique `(bootcamp_id, user_id)` index
    /// surface as `BootcampNotFound` and `Duplicate`.
    async fn create_review(&self, review: NewReview) -> ApiResult<Review> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Review>(&format!(
            r#"
            INSERT INTO reviews (id, title, text, rating, bootcamp_id, user_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&review.title)
        .bind(&review.text)
        .bind(review.rating)
        .bind(review.bootcamp)
        .bind(review.user)
        .fetch_one(&mut *tx)
        .await?;

        refresh_average_rating(&mut tx, created.bootcamp).await?;
        tx.commit().await?;

        tracing::debug!(review_id = %created.id, bootcamp_id = %created.bootcamp, "review inserted");
        Ok(created)
    }

    async fn update_review(
        &self,
        id: Uuid,
        user_id: Uuid,
        req: UpdateReviewRequest,
    ) -> ApiResult<Option<Review>> {
        self.update_where(id, Some(user_id), req).await
    }

    async fn update_review_admin(
        &self,
        id: Uuid,
        req: UpdateReviewRequest,
    ) -> ApiResult<Option<Review>> {
        self.update_where(id, None, req).await
    }

    async fn delete_review(&self, id: Uuid, user_id: Uuid) -> ApiResult<bool> {
        self.delete_where(id, Some(user_id)).await
    }

    async fn delete_review_admin(&self, id: Uuid) -> ApiResult<bool> {
        self.delete_where(id, None).await
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Store {
    users: HashMap<Uuid, User>,
    bootcamps: HashMap<Uuid, Bootcamp>,
    // Insertion order is kept so that equal sort keys stay stable.
    reviews: Vec<Review>,
}

impl Store {
    fn refresh_average_rating(&mut self, bootcamp_id: Uuid) {
        let ratings: Vec<i32> = self
            .reviews
            .iter()
            .filter(|r| r.bootcamp == bootcamp_id)
            .map(|r| r.rating)
            .collect();
        if let Some(bootcamp) = self.bootcamps.get_mut(&bootcamp_id) {
            bootcamp.average_rating = (!ratings.is_empty())
                .then(|| f64::from(ratings.iter().sum::<i32>()) / ratings.len() as f64);
        }
    }

    fn update_where(
        &mut self,
        id: Uuid,
        owner: Option<Uuid>,
        req: &UpdateReviewRequest,
    ) -> Option<Review> {
        let review = self
            .reviews
            .iter_mut()
            .find(|r| r.id == id && owner.is_none_or(|user| r.user == user))?;
        req.apply_to(review);
        let updated = review.clone();
        self.refresh_average_rating(updated.bootcamp);
        Some(updated)
    }

    fn delete_where(&mut self, id: Uuid, owner: Option<Uuid>) -> bool {
        let Some(index) = self
            .reviews
            .iter()
            .position(|r| r.id == id && owner.is_none_or(|user| r.user == user))
        else {
            return false;
        };
        let removed = self.reviews.remove(index);
        self.refresh_average_rating(removed.bootcamp);
        true
    }
}

/// InMemoryRepository
///
/// A `Repository` holding everything in process memory. It enforces the same constraints
/// as the SQL schema (bootcamp foreign key, one review per user per bootcamp) and is used
/// by the handler, service and router tests.
#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
    /// When true, every operation fails as if the database were unreachable.
    pub should_fail: bool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.store.get_mut().users.insert(user.id, user);
        self
    }

    pub fn with_bootcamp(mut self, bootcamp: Bootcamp) -> Self {
        self.store.get_mut().bootcamps.insert(bootcamp.id, bootcamp);
        self
    }

    /// Seeds a review as-is, bypassing validation.
    pub fn with_review(mut self, review: Review) -> Self {
        let store = self.store.get_mut();
        let bootcamp_id = review.bootcamp;
        store.reviews.push(review);
        store.refresh_average_rating(bootcamp_id);
        self
    }

    pub async fn review_count(&self) -> usize {
        self.store.read().await.reviews.len()
    }

    fn check(&self) -> ApiResult<()> {
        if self.should_fail {
            return Err(ApiError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

fn compare_reviews(a: &Review, b: &Review, sort: SortField) -> Ordering {
    match sort {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::Rating => a.rating.cmp(&b.rating),
        SortField::Title => a.title.cmp(&b.title),
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> ApiResult<Option<User>> {
        self.check()?;
        Ok(self.store.read().await.users.get(&id).cloned())
    }

    async fn get_bootcamp(&self, id: Uuid) -> ApiResult<Option<Bootcamp>> {
        self.check()?;
        Ok(self.store.read().await.bootcamps.get(&id).cloned())
    }

    async fn get_bootcamp_reviews(&self, bootcamp_id: Uuid) -> ApiResult<Vec<Review>> {
        self.check()?;
        let store = self.store.read().await;
        let mut reviews: Vec<Review> = store
            .reviews
            .iter()
            .filter(|r| r.bootcamp == bootcamp_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(reviews)
    }

    async fn list_reviews(&self, page: PageRequest) -> ApiResult<ReviewPage> {
        self.check()?;
        let store = self.store.read().await;

        let mut all = store.reviews.clone();
        all.sort_by(|a, b| {
            let ordering = compare_reviews(a, b, page.sort);
            if page.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });

        let total = all.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let reviews = all
            .into_iter()
            .skip(offset)
            .take(page.limit as usize)
            .collect();

        Ok(ReviewPage { reviews, total })
    }

    async fn get_review(&self, id: Uuid) -> ApiResult<Option<Review>> {
        self.check()?;
        let store = self.store.read().await;
        Ok(store.reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn get_review_detail(&self, id: Uuid) -> ApiResult<Option<ReviewDetail>> {
        self.check()?;
        let store = self.store.read().await;
        let detail = store.reviews.iter().find(|r| r.id == id).and_then(|review| {
            let bootcamp = store.bootcamps.get(&review.bootcamp)?;
            Some(ReviewDetail::new(review.clone(), BootcampSummary::from(bootcamp)))
        });
        Ok(detail)
    }

    async fn create_review(&self, review: NewReview) -> ApiResult<Review> {
        self.check()?;
        let mut store = self.store.write().await;

        if !store.bootcamps.contains_key(&review.bootcamp) {
            return Err(ApiError::BootcampNotFound);
        }
        if store
            .reviews
            .iter()
            .any(|r| r.bootcamp == review.bootcamp && r.user == review.user)
        {
            return Err(ApiError::Duplicate);
        }

        let created = Review {
            id: Uuid::new_v4(),
            title: review.title,
            text: review.text,
            rating: review.rating,
            bootcamp: review.bootcamp,
            user: review.user,
            created_at: Utc::now(),
        };
        store.reviews.push(created.clone());
        store.refresh_average_rating(created.bootcamp);

        Ok(created)
    }

    async fn update_review(
        &self,
        id: Uuid,
        user_id: Uuid,
        req: UpdateReviewRequest,
    ) -> ApiResult<Option<Review>> {
        self.check()?;
        Ok(self.store.write().await.update_where(id, Some(user_id), &req))
    }

    async fn update_review_admin(
        &self,
        id: Uuid,
        req: UpdateReviewRequest,
    ) -> ApiResult<Option<Review>> {
        self.check()?;
        Ok(self.store.write().await.update_where(id, None, &req))
    }

    async fn delete_review(&self, id: Uuid, user_id: Uuid) -> ApiResult<bool> {
        self.check()?;
        Ok(self.store.write().await.delete_where(id, Some(user_id)))
    }

    async fn delete_review_admin(&self, id: Uuid) -> ApiResult<bool> {
        self.check()?;
        Ok(self.store.write().await.delete_where(id, None))
    }
}
