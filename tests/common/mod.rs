// Shared fixtures for the integration tests. Not every test binary uses every helper.
#![allow(dead_code)]

use bootcamp_reviews::{
    AppState, InMemoryRepository,
    auth::AuthUser,
    config::AppConfig,
    models::{Bootcamp, Review, User},
    repository::RepositoryState,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

pub const OWNER_ID: Uuid = Uuid::from_u128(1);
pub const OTHER_USER_ID: Uuid = Uuid::from_u128(2);
pub const ADMIN_ID: Uuid = Uuid::from_u128(3);
pub const PUBLISHER_ID: Uuid = Uuid::from_u128(4);

pub const BOOTCAMP_ID: Uuid = Uuid::from_u128(100);
pub const EMPTY_BOOTCAMP_ID: Uuid = Uuid::from_u128(101);
pub const MISSING_BOOTCAMP_ID: Uuid = Uuid::from_u128(199);

pub const REVIEW_ID: Uuid = Uuid::from_u128(1000);
pub const MISSING_REVIEW_ID: Uuid = Uuid::from_u128(1999);

pub fn user(id: Uuid, role: &str) -> User {
    User {
        id,
        name: format!("{role}-{}", id.as_u128()),
        email: format!("{role}{}@devcamper.io", id.as_u128()),
        role: role.to_string(),
    }
}

pub fn bootcamp(id: Uuid, name: &str) -> Bootcamp {
    Bootcamp {
        id,
        name: name.to_string(),
        description: format!("{name} teaches full stack development"),
        website: Some("https://bootcamp.example".to_string()),
        average_rating: None,
        created_at: at(0),
    }
}

/// Fixed timestamps so ordering assertions are deterministic.
pub fn at(offset_secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + offset_secs, 0).expect("valid timestamp")
}

pub fn review(id: Uuid, bootcamp: Uuid, user: Uuid, rating: i32, offset_secs: i64) -> Review {
    Review {
        id,
        title: format!("Review {}", id.as_u128()),
        text: "Learned a lot".to_string(),
        rating,
        bootcamp,
        user,
        created_at: at(offset_secs),
    }
}

pub fn owner() -> AuthUser {
    AuthUser {
        id: OWNER_ID,
        role: "user".to_string(),
    }
}

pub fn other_user() -> AuthUser {
    AuthUser {
        id: OTHER_USER_ID,
        role: "user".to_string(),
    }
}

pub fn admin() -> AuthUser {
    AuthUser {
        id: ADMIN_ID,
        role: "admin".to_string(),
    }
}

/// Users of every role, two bootcamps (one without reviews), and review r1 written by
/// the owner on BOOTCAMP_ID with rating 8.
pub fn seeded_repo() -> InMemoryRepository {
    InMemoryRepository::new()
        .with_user(user(OWNER_ID, "user"))
        .with_user(user(OTHER_USER_ID, "user"))
        .with_user(user(ADMIN_ID, "admin"))
        .with_user(user(PUBLISHER_ID, "publisher"))
        .with_bootcamp(bootcamp(BOOTCAMP_ID, "Devworks Bootcamp"))
        .with_bootcamp(bootcamp(EMPTY_BOOTCAMP_ID, "ModernTech Bootcamp"))
        .with_review(review(REVIEW_ID, BOOTCAMP_ID, OWNER_ID, 8, 0))
}

/// AppState over the given repository, keeping a typed handle for inspection.
pub fn state_with(repo: InMemoryRepository) -> (AppState, Arc<InMemoryRepository>) {
    let repo = Arc::new(repo);
    let state = AppState {
        repo: repo.clone() as RepositoryState,
        config: AppConfig::default(),
    };
    (state, repo)
}
