//! PostgreSQL store tests.
//!
//! These run against the database named by `DATABASE_URL` and are skipped
//! when it is not set. Every test creates its own rows, so they can share a
//! database and run in parallel.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use campsite_services::pg::PgCampsiteStore;
use campsite_services::rating::average_rating;
use campsite_services::repository::{
    AccountRepository, CampsiteRepository, Relations, ReviewRepository,
};
use campsite_services::types::{CampsiteError, CreateCampsiteRequest, NewAccount, ReviewChanges};
use sqlx::PgPool;
use tokio::task::JoinSet;

static COUNTER: AtomicU32 = AtomicU32::new(0);

fn unique(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}_{:x}{:x}", prefix, nanos & 0xffff_ffff_ffff, n)
}

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL is not set, skipping PostgreSQL store tests");
        return None;
    };

    let pool = postgres::database::create_connection_pool(&database_url, 20)
        .await
        .expect("Failed to create test database pool");
    postgres::database::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    Some(pool)
}

struct Seeded {
    store: PgCampsiteStore,
    user_id: i32,
    account_id: i32,
    category_id: i32,
    campsite_id: i32,
}

async fn seed_account(pool: &PgPool, store: &PgCampsiteStore) -> (i32, i32) {
    let user_id: i32 = sqlx::query_scalar(
        "INSERT INTO user_credentials (username, hashed_password) VALUES ($1, $2) RETURNING user_id",
    )
    .bind(unique("camper"))
    .bind(b"not-a-real-digest".to_vec())
    .fetch_one(pool)
    .await
    .unwrap();

    let account = store
        .create_account(&NewAccount {
            user_id,
            user_firstname: NewAccount::PLACEHOLDER.to_string(),
            user_lastname: NewAccount::PLACEHOLDER.to_string(),
            user_email: NewAccount::PLACEHOLDER.to_string(),
            camera_permission: false,
        })
        .await
        .unwrap();

    (user_id, account.user_account_id)
}

fn campsite_request(user_account_id: i32, category_id: i32) -> CreateCampsiteRequest {
    CreateCampsiteRequest {
        user_account_id,
        campsite_name: unique("Riverside"),
        campsite_longitude: -2.9,
        campsite_latitude: 54.4,
        category_id,
        parking_cost: Some(4.5),
        facilities_cost: None,
        opening_month: Some("March".to_string()),
        closing_month: Some("November".to_string()),
        description: None,
        photos: Vec::new(),
        contacts: Vec::new(),
    }
}

async fn seed(pool: PgPool) -> Seeded {
    let store = PgCampsiteStore::new(pool.clone());
    let (user_id, account_id) = seed_account(&pool, &store).await;

    let category_id: i32 = sqlx::query_scalar(
        "INSERT INTO categories (category_name, category_img_url) VALUES ($1, $2) RETURNING category_id",
    )
    .bind(unique("Riverside"))
    .bind("https://example.com/riverside.png")
    .fetch_one(&pool)
    .await
    .unwrap();

    let campsite = store
        .create_campsite(&campsite_request(account_id, category_id))
        .await
        .unwrap();

    Seeded {
        store,
        user_id,
        account_id,
        category_id,
        campsite_id: campsite.campsite_id,
    }
}

async fn stored_average(seeded: &Seeded) -> f64 {
    seeded
        .store
        .find_campsite(seeded.campsite_id, Relations::Skip)
        .await
        .unwrap()
        .unwrap()
        .average_rating
}

async fn actual_average(seeded: &Seeded) -> f64 {
    let ratings: Vec<i32> = seeded
        .store
        .list_reviews(seeded.campsite_id)
        .await
        .unwrap()
        .iter()
        .map(|r| r.review.rating)
        .collect();
    average_rating(&ratings)
}

#[tokio::test]
async fn concurrent_review_writers_keep_the_average_consistent() {
    let Some(pool) = test_pool().await else { return };
    let seeded = seed(pool).await;

    let mut writers = JoinSet::new();
    for i in 0..40 {
        let store = seeded.store.clone();
        let (campsite_id, account_id) = (seeded.campsite_id, seeded.account_id);
        writers.spawn(async move {
            store
                .create_review(campsite_id, account_id, (i % 5) + 1, None)
                .await
        });
    }
    while let Some(result) = writers.join_next().await {
        result.unwrap().unwrap();
    }

    assert_eq!(seeded.store.list_reviews(seeded.campsite_id).await.unwrap().len(), 40);
    assert!((stored_average(&seeded).await - 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn concurrent_updates_and_deletes_keep_the_average_consistent() {
    let Some(pool) = test_pool().await else { return };
    let seeded = seed(pool).await;

    let mut review_ids = Vec::new();
    for i in 0..30 {
        let review = seeded
            .store
            .create_review(seeded.campsite_id, seeded.account_id, (i % 5) + 1, None)
            .await
            .unwrap();
        review_ids.push(review.review_id);
    }

    let mut writers = JoinSet::new();
    for (i, review_id) in review_ids.into_iter().enumerate() {
        let store = seeded.store.clone();
        writers.spawn(async move {
            if i % 3 == 0 {
                store.delete_review(review_id).await.map(|_| ())
            } else {
                let changes = ReviewChanges {
                    rating: Some(((i as i32 * 7) % 5) + 1),
                    comment: Some("Changed my mind".to_string()),
                };
                store.update_review(review_id, &changes).await.map(|_| ())
            }
        });
    }
    while let Some(result) = writers.join_next().await {
        result.unwrap().unwrap();
    }

    assert_eq!(seeded.store.list_reviews(seeded.campsite_id).await.unwrap().len(), 20);
    let stored = stored_average(&seeded).await;
    let actual = actual_average(&seeded).await;
    assert!((stored - actual).abs() < 1e-9, "stored {stored}, actual {actual}");
}

#[tokio::test]
async fn deleting_the_last_review_resets_the_average() {
    let Some(pool) = test_pool().await else { return };
    let seeded = seed(pool).await;

    let review = seeded
        .store
        .create_review(seeded.campsite_id, seeded.account_id, 4, Some("Quiet pitch"))
        .await
        .unwrap();
    assert!((stored_average(&seeded).await - 4.0).abs() < 1e-9);

    let deleted = seeded.store.delete_review(review.review_id).await.unwrap();
    assert_eq!(deleted.comment.as_deref(), Some("Quiet pitch"));
    assert_eq!(stored_average(&seeded).await, 0.0);

    assert!(matches!(
        seeded.store.delete_review(review.review_id).await,
        Err(CampsiteError::ReviewNotFound)
    ));
}

#[tokio::test]
async fn foreign_key_failures_map_to_domain_errors() {
    let Some(pool) = test_pool().await else { return };
    let seeded = seed(pool).await;

    let unknown_category = seeded
        .store
        .create_campsite(&campsite_request(seeded.account_id, i32::MAX))
        .await;
    assert!(matches!(unknown_category, Err(CampsiteError::CategoryNotFound)));

    let unknown_owner = seeded
        .store
        .create_campsite(&campsite_request(i32::MAX, seeded.category_id))
        .await;
    assert!(matches!(unknown_owner, Err(CampsiteError::CampsiteOwnerNotFound)));

    let unknown_reviewer = seeded
        .store
        .create_review(seeded.campsite_id, i32::MAX, 3, None)
        .await;
    assert!(matches!(unknown_reviewer, Err(CampsiteError::ReviewerNotFound)));

    let unknown_campsite = seeded
        .store
        .create_review(i32::MAX, seeded.account_id, 3, None)
        .await;
    assert!(matches!(unknown_campsite, Err(CampsiteError::CampsiteNotFound)));

    // the failed review left the average untouched
    assert_eq!(stored_average(&seeded).await, 0.0);
}

#[tokio::test]
async fn xp_overflow_is_rejected_without_changes() {
    let Some(pool) = test_pool().await else { return };
    let seeded = seed(pool).await;

    let account = seeded.store.add_xp(seeded.account_id, i32::MAX).await.unwrap();
    assert_eq!(account.xp, i32::MAX);

    let overflow = seeded.store.add_xp(seeded.account_id, 1).await;
    assert!(matches!(overflow, Err(CampsiteError::InvalidXp)));

    let account = seeded
        .store
        .find_account_by_user(seeded.user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.xp, i32::MAX);

    assert!(matches!(
        seeded.store.add_xp(i32::MAX, 5).await,
        Err(CampsiteError::AccountNotFound)
    ));
}

#[tokio::test]
async fn accounts_and_favourites_enforce_uniqueness() {
    let Some(pool) = test_pool().await else { return };
    let seeded = seed(pool).await;

    let again = seeded
        .store
        .create_account(&NewAccount {
            user_id: seeded.user_id,
            user_firstname: "Second".to_string(),
            user_lastname: "Try".to_string(),
            user_email: "second@example.com".to_string(),
            camera_permission: true,
        })
        .await;
    assert!(matches!(again, Err(CampsiteError::AccountExists)));

    seeded
        .store
        .add_favourite(seeded.account_id, seeded.campsite_id)
        .await
        .unwrap();
    assert!(matches!(
        seeded.store.add_favourite(seeded.account_id, seeded.campsite_id).await,
        Err(CampsiteError::FavouriteExists)
    ));

    let favourites = seeded.store.list_favourites(seeded.account_id).await.unwrap();
    assert_eq!(favourites.len(), 1);
    assert_eq!(favourites[0].campsite_id, seeded.campsite_id);

    seeded
        .store
        .remove_favourite(seeded.account_id, seeded.campsite_id)
        .await
        .unwrap();
    assert!(matches!(
        seeded.store.remove_favourite(seeded.account_id, seeded.campsite_id).await,
        Err(CampsiteError::FavouriteNotFound)
    ));
}
