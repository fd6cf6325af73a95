//! Exercises `PostgresRepository` against a live database. Each test returns early
//! when `DATABASE_URL` is not set.

use bootcamp_reviews::{
    ApiError,
    models::{ListQuery, NewReview, UpdateReviewRequest},
    repository::{PostgresRepository, Repository},
};
use sqlx::PgPool;
use uuid::Uuid;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Option<Self> {
        dotenv::dotenv().ok();

        let Ok(db_url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping Postgres repository test");
            return None;
        };

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        Some(DbTestContext { pool })
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

async fn create_test_user(pool: &PgPool, role: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, name, email, role) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(format!("{role} tester"))
        .bind(format!("{id}@test.com"))
        .bind(role)
        .execute(pool)
        .await
        .expect("Failed to create test user");
    id
}

async fn create_test_bootcamp(pool: &PgPool, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO bootcamps (id, name, description) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(name)
        .bind("Integration test bootcamp")
        .execute(pool)
        .await
        .expect("Failed to create test bootcamp");
    id
}

fn new_review(bootcamp: Uuid, user: Uuid, rating: i32) -> NewReview {
    NewReview {
        title: "Integration".to_string(),
        text: "Written by the repository tests".to_string(),
        rating,
        bootcamp,
        user,
    }
}

// --- Tests ---

#[tokio::test]
async fn test_review_crud_and_average_rating() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let owner = create_test_user(&ctx.pool, "user").await;
    let other = create_test_user(&ctx.pool, "user").await;
    let bootcamp = create_test_bootcamp(&ctx.pool, "Repo Camp").await;

    let first = repo.create_review(new_review(bootcamp, owner, 4)).await.unwrap();
    repo.create_review(new_review(bootcamp, other, 8)).await.unwrap();

    let stored = repo.get_bootcamp(bootcamp).await.unwrap().unwrap();
    assert_eq!(stored.average_rating, Some(6.0));

    let detail = repo.get_review_detail(first.id).await.unwrap().unwrap();
    assert_eq!(detail.bootcamp.name, "Repo Camp");

    // Owner-scoped update does not match for another user.
    let update = UpdateReviewRequest {
        rating: Some(10),
        ..UpdateReviewRequest::default()
    };
    assert!(repo.update_review(first.id, other, update.clone()).await.unwrap().is_none());
    let updated = repo.update_review(first.id, owner, update).await.unwrap().unwrap();
    assert_eq!(updated.rating, 10);

    assert!(!repo.delete_review(first.id, other).await.unwrap());
    assert!(repo.delete_review_admin(first.id).await.unwrap());
    assert!(repo.get_review(first.id).await.unwrap().is_none());

    let stored = repo.get_bootcamp(bootcamp).await.unwrap().unwrap();
    assert_eq!(stored.average_rating, Some(8.0));
}

#[tokio::test]
async fn test_constraints_map_to_domain_errors() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let user = create_test_user(&ctx.pool, "user").await;
    let bootcamp = create_test_bootcamp(&ctx.pool, "Constraint Camp").await;

    repo.create_review(new_review(bootcamp, user, 5)).await.unwrap();

    let duplicate = repo.create_review(new_review(bootcamp, user, 6)).await.unwrap_err();
    assert!(matches!(duplicate, ApiError::Duplicate));

    let orphan = repo
        .create_review(new_review(Uuid::new_v4(), user, 6))
        .await
        .unwrap_err();
    assert!(matches!(orphan, ApiError::BootcampNotFound));
}

#[tokio::test]
async fn test_list_reviews_pages_whole_collection() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let bootcamp = create_test_bootcamp(&ctx.pool, "Paging Camp").await;
    for rating in 1..=3 {
        let user = create_test_user(&ctx.pool, "user").await;
        repo.create_review(new_review(bootcamp, user, rating)).await.unwrap();
    }

    let page = ListQuery {
        page: Some(1),
        limit: Some(2),
        sort: Some("-rating".to_string()),
    }
    .resolve(25)
    .unwrap();
    let result = repo.list_reviews(page).await.unwrap();

    assert_eq!(result.reviews.len(), 2);
    assert!(result.total >= 3);
    assert!(result.reviews[0].rating >= result.reviews[1].rating);

    let scoped = repo.get_bootcamp_reviews(bootcamp).await.unwrap();
    assert_eq!(scoped.len(), 3);
}

#[tokio::test]
async fn test_admin_writes_ignore_ownership() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let owner = create_test_user(&ctx.pool, "user").await;
    let bootcamp = create_test_bootcamp(&ctx.pool, "Admin Camp").await;
    let review = repo.create_review(new_review(bootcamp, owner, 2)).await.unwrap();

    let update = UpdateReviewRequest {
        title: Some("Moderated".to_string()),
        ..UpdateReviewRequest::default()
    };
    let updated = repo
        .update_review_admin(review.id, update)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.title, "Moderated");
    assert_eq!(updated.user, owner);

    assert!(repo.delete_review(review.id, owner).await.unwrap());
    assert!(!repo.delete_review_admin(review.id).await.unwrap());
    let stored = repo.get_bootcamp(bootcamp).await.unwrap().unwrap();
    assert_eq!(stored.average_rating, None);
}
