use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};

use crate::rating::average_rating;
use crate::repository::{AccountRepository, CampsiteRepository, Relations, ReviewRepository};
use crate::types::{
    Account, Campsite, CampsiteError, Category, Contact, CreateCampsiteRequest, NewAccount, Photo,
    Review, ReviewChanges, ReviewWithUsername,
};

const CAMPSITE_SELECT: &str = r#"
    SELECT c.campsite_id, c.campsite_name, c.campsite_longitude, c.campsite_latitude,
           c.parking_cost, c.facilities_cost, c.opening_month, c.closing_month,
           c.description, c.date_added, c.approved, c.average_rating, c.user_account_id,
           cat.category_id, cat.category_name, cat.category_img_url
    FROM campsites c
    JOIN categories cat ON cat.category_id = c.category_id
"#;

const REVIEW_COLUMNS: &str = "review_id, rating, comment, user_account_id, campsite_id";

const ACCOUNT_COLUMNS: &str = "user_account_id, user_id, user_firstname, user_lastname, \
     user_email, xp, user_type, camera_permission";

const CATEGORY_FK: &str = "campsites_category_id_fkey";

/// SQLSTATE for `numeric_value_out_of_range`.
const NUMERIC_OUT_OF_RANGE: &str = "22003";

/// Campsite, review and account store backed by PostgreSQL.
///
/// Review mutations run in a transaction that holds a row lock on the
/// campsite, so the stored average always reflects the committed review set.
#[derive(Clone)]
pub struct PgCampsiteStore {
    pool: PgPool,
}

impl PgCampsiteStore {
    /// Creates a new instance of `PgCampsiteStore` with the provided database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_campsites(
        &self,
        query: sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>,
        relations: Relations,
    ) -> Result<Vec<Campsite>, CampsiteError> {
        let rows = query.fetch_all(&self.pool).await?;
        let mut campsites: Vec<Campsite> = rows.iter().map(campsite_from_row).collect();

        if relations == Relations::Load {
            self.attach_relations(&mut campsites).await?;
        }

        Ok(campsites)
    }

    async fn attach_relations(&self, campsites: &mut [Campsite]) -> Result<(), CampsiteError> {
        if campsites.is_empty() {
            return Ok(());
        }

        let ids: Vec<i32> = campsites.iter().map(|c| c.campsite_id).collect();

        let photos = sqlx::query_as::<_, Photo>(
            r#"
            SELECT campsite_photo_id, campsite_photo_url, campsite_id
            FROM campsite_photos
            WHERE campsite_id = ANY($1)
            ORDER BY campsite_photo_id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let contacts = sqlx::query_as::<_, Contact>(
            r#"
            SELECT campsite_contact_id, campsite_contact_name, campsite_contact_phone,
                   campsite_contact_email, campsite_id
            FROM campsite_contacts
            WHERE campsite_id = ANY($1)
            ORDER BY campsite_contact_id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut photos_by_site: HashMap<i32, Vec<Photo>> = HashMap::new();
        for photo in photos {
            photos_by_site.entry(photo.campsite_id).or_default().push(photo);
        }
        let mut contacts_by_site: HashMap<i32, Vec<Contact>> = HashMap::new();
        for contact in contacts {
            contacts_by_site
                .entry(contact.campsite_id)
                .or_default()
                .push(contact);
        }

        for campsite in campsites.iter_mut() {
            campsite.photos = photos_by_site.remove(&campsite.campsite_id).unwrap_or_default();
            campsite.contacts = contacts_by_site
                .remove(&campsite.campsite_id)
                .unwrap_or_default();
        }

        Ok(())
    }
}

fn campsite_from_row(row: &PgRow) -> Campsite {
    Campsite {
        campsite_id: row.get("campsite_id"),
        campsite_name: row.get("campsite_name"),
        campsite_longitude: row.get("campsite_longitude"),
        campsite_latitude: row.get("campsite_latitude"),
        parking_cost: row.get("parking_cost"),
        facilities_cost: row.get("facilities_cost"),
        opening_month: row.get("opening_month"),
        closing_month: row.get("closing_month"),
        description: row.get("description"),
        date_added: row.get("date_added"),
        approved: row.get("approved"),
        average_rating: row.get("average_rating"),
        user_account_id: row.get("user_account_id"),
        category: Category {
            category_id: row.get("category_id"),
            category_name: row.get("category_name"),
            category_img_url: row.get("category_img_url"),
        },
        photos: Vec::new(),
        contacts: Vec::new(),
    }
}

/// Locks the campsite row for the rest of the transaction. `false` if it does not exist.
async fn lock_campsite(conn: &mut PgConnection, campsite_id: i32) -> Result<bool, sqlx::Error> {
    let locked: Option<i32> =
        sqlx::query_scalar("SELECT campsite_id FROM campsites WHERE campsite_id = $1 FOR UPDATE")
            .bind(campsite_id)
            .fetch_optional(&mut *conn)
            .await?;

    Ok(locked.is_some())
}

async fn lock_review(conn: &mut PgConnection, review_id: i32) -> Result<Option<Review>, sqlx::Error> {
    sqlx::query_as::<_, Review>(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews WHERE review_id = $1 FOR UPDATE"
    ))
    .bind(review_id)
    .fetch_optional(&mut *conn)
    .await
}

/// Writes the mean of the campsite's current ratings into `average_rating`.
async fn store_average(conn: &mut PgConnection, campsite_id: i32) -> Result<f64, sqlx::Error> {
    let ratings: Vec<i32> = sqlx::query_scalar("SELECT rating FROM reviews WHERE campsite_id = $1")
        .bind(campsite_id)
        .fetch_all(&mut *conn)
        .await?;

    let average = average_rating(&ratings);

    sqlx::query("UPDATE campsites SET average_rating = $1 WHERE campsite_id = $2")
        .bind(average)
        .bind(campsite_id)
        .execute(&mut *conn)
        .await?;

    Ok(average)
}

#[async_trait]
impl CampsiteRepository for PgCampsiteStore {
    async fn list_categories(&self) -> Result<Vec<Category>, CampsiteError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT category_id, category_name, category_img_url FROM categories ORDER BY category_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    async fn find_category(&self, category_id: i32) -> Result<Option<Category>, CampsiteError> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT category_id, category_name, category_img_url FROM categories WHERE category_id = $1",
        )
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    async fn create_campsite(
        &self,
        request: &CreateCampsiteRequest,
    ) -> Result<Campsite, CampsiteError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO campsites (
                campsite_name, campsite_longitude, campsite_latitude, parking_cost,
                facilities_cost, opening_month, closing_month, description,
                user_account_id, category_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING campsite_id
            "#,
        )
        .bind(&request.campsite_name)
        .bind(request.campsite_longitude)
        .bind(request.campsite_latitude)
        .bind(request.parking_cost)
        .bind(request.facilities_cost)
        .bind(&request.opening_month)
        .bind(&request.closing_month)
        .bind(&request.description)
        .bind(request.user_account_id)
        .bind(request.category_id)
        .fetch_one(&mut *tx)
        .await;

        let campsite_id = match inserted {
            Ok(id) => id,
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                return Err(if e.constraint() == Some(CATEGORY_FK) {
                    CampsiteError::CategoryNotFound
                } else {
                    CampsiteError::CampsiteOwnerNotFound
                });
            }
            Err(e) => return Err(e.into()),
        };

        for photo in &request.photos {
            sqlx::query(
                "INSERT INTO campsite_photos (campsite_photo_url, campsite_id) VALUES ($1, $2)",
            )
            .bind(&photo.campsite_photo_url)
            .bind(campsite_id)
            .execute(&mut *tx)
            .await?;
        }

        for contact in &request.contacts {
            sqlx::query(
                r#"
                INSERT INTO campsite_contacts (
                    campsite_contact_name, campsite_contact_phone, campsite_contact_email, campsite_id
                )
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(&contact.campsite_contact_name)
            .bind(&contact.campsite_contact_phone)
            .bind(&contact.campsite_contact_email)
            .bind(campsite_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.find_campsite(campsite_id, Relations::Load)
            .await?
            .ok_or(CampsiteError::CampsiteNotFound)
    }

    async fn list_campsites(
        &self,
        skip: i64,
        limit: i64,
        relations: Relations,
    ) -> Result<Vec<Campsite>, CampsiteError> {
        let sql = format!("{CAMPSITE_SELECT} ORDER BY c.campsite_id LIMIT $1 OFFSET $2");
        let query = sqlx::query(&sql).bind(limit).bind(skip);
        self.fetch_campsites(query, relations).await
    }

    async fn find_campsite(
        &self,
        campsite_id: i32,
        relations: Relations,
    ) -> Result<Option<Campsite>, CampsiteError> {
        let sql = format!("{CAMPSITE_SELECT} WHERE c.campsite_id = $1");
        let query = sqlx::query(&sql).bind(campsite_id);
        Ok(self.fetch_campsites(query, relations).await?.pop())
    }
}

#[async_trait]
impl ReviewRepository for PgCampsiteStore {
    async fn list_reviews(
        &self,
        campsite_id: i32,
    ) -> Result<Vec<ReviewWithUsername>, CampsiteError> {
        let rows = sqlx::query(
            r#"
            SELECT r.review_id, r.rating, r.comment, r.user_account_id, r.campsite_id, uc.username
            FROM reviews r
            JOIN user_accounts ua ON ua.user_account_id = r.user_account_id
            JOIN user_credentials uc ON uc.user_id = ua.user_id
            WHERE r.campsite_id = $1
            ORDER BY r.review_id
            "#,
        )
        .bind(campsite_id)
        .fetch_all(&self.pool)
        .await?;

        let reviews = rows
            .iter()
            .map(|row| ReviewWithUsername {
                review: Review {
                    review_id: row.get("review_id"),
                    rating: row.get("rating"),
                    comment: row.get("comment"),
                    user_account_id: row.get("user_account_id"),
                    campsite_id: row.get("campsite_id"),
                },
                username: row.get("username"),
            })
            .collect();

        Ok(reviews)
    }

    async fn find_review(&self, review_id: i32) -> Result<Option<Review>, CampsiteError> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE review_id = $1"
        ))
        .bind(review_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(review)
    }

    async fn create_review(
        &self,
        campsite_id: i32,
        user_account_id: i32,
        rating: i32,
        comment: Option<&str>,
    ) -> Result<Review, CampsiteError> {
        let mut tx = self.pool.begin().await?;

        if !lock_campsite(&mut tx, campsite_id).await? {
            return Err(CampsiteError::CampsiteNotFound);
        }

        let inserted = sqlx::query_as::<_, Review>(&format!(
            r#"
            INSERT INTO reviews (rating, comment, user_account_id, campsite_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(rating)
        .bind(comment)
        .bind(user_account_id)
        .bind(campsite_id)
        .fetch_one(&mut *tx)
        .await;

        let review = match inserted {
            Ok(review) => review,
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                return Err(CampsiteError::ReviewerNotFound);
            }
            Err(e) => return Err(e.into()),
        };

        let average = store_average(&mut tx, campsite_id).await?;
        tx.commit().await?;

        log::debug!("Campsite {} average rating is now {}", campsite_id, average);
        Ok(review)
    }

    async fn update_review(
        &self,
        review_id: i32,
        changes: &ReviewChanges,
    ) -> Result<Review, CampsiteError> {
        let mut tx = self.pool.begin().await?;

        let current = lock_review(&mut tx, review_id)
            .await?
            .ok_or(CampsiteError::ReviewNotFound)?;
        lock_campsite(&mut tx, current.campsite_id).await?;

        let review = sqlx::query_as::<_, Review>(&format!(
            r#"
            UPDATE reviews
            SET rating = COALESCE($1, rating), comment = COALESCE($2, comment)
            WHERE review_id = $3
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(changes.rating)
        .bind(&changes.comment)
        .bind(review_id)
        .fetch_one(&mut *tx)
        .await?;

        if changes.rating.is_some() {
            store_average(&mut tx, review.campsite_id).await?;
        }
        tx.commit().await?;

        Ok(review)
    }

    async fn delete_review(&self, review_id: i32) -> Result<Review, CampsiteError> {
        let mut tx = self.pool.begin().await?;

        let review = lock_review(&mut tx, review_id)
            .await?
            .ok_or(CampsiteError::ReviewNotFound)?;
        lock_campsite(&mut tx, review.campsite_id).await?;

        sqlx::query("DELETE FROM reviews WHERE review_id = $1")
            .bind(review_id)
            .execute(&mut *tx)
            .await?;

        store_average(&mut tx, review.campsite_id).await?;
        tx.commit().await?;

        Ok(review)
    }

    async fn recompute_rating(&self, campsite_id: i32) -> Result<f64, CampsiteError> {
        let mut tx = self.pool.begin().await?;

        if !lock_campsite(&mut tx, campsite_id).await? {
            return Err(CampsiteError::CampsiteNotFound);
        }

        let average = store_average(&mut tx, campsite_id).await?;
        tx.commit().await?;

        Ok(average)
    }
}

#[async_trait]
impl AccountRepository for PgCampsiteStore {
    async fn find_account_by_user(&self, user_id: i32) -> Result<Option<Account>, CampsiteError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM user_accounts WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_username(&self, user_account_id: i32) -> Result<Option<String>, CampsiteError> {
        let username = sqlx::query_scalar::<_, String>(
            r#"
            SELECT uc.username
            FROM user_credentials uc
            JOIN user_accounts ua ON ua.user_id = uc.user_id
            WHERE ua.user_account_id = $1
            "#,
        )
        .bind(user_account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(username)
    }

    async fn create_account(&self, account: &NewAccount) -> Result<Account, CampsiteError> {
        let result = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO user_accounts (
                user_id, user_firstname, user_lastname, user_email, camera_permission
            )
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(account.user_id)
        .bind(&account.user_firstname)
        .bind(&account.user_lastname)
        .bind(&account.user_email)
        .bind(account.camera_permission)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(account) => Ok(account),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(CampsiteError::AccountExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn add_xp(&self, user_account_id: i32, delta: i32) -> Result<Account, CampsiteError> {
        let result = sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE user_accounts SET xp = xp + $1
            WHERE user_account_id = $2
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(delta)
        .bind(user_account_id)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(Some(account)) => Ok(account),
            Ok(None) => Err(CampsiteError::AccountNotFound),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE) => {
                Err(CampsiteError::InvalidXp)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_favourites(&self, user_account_id: i32) -> Result<Vec<Campsite>, CampsiteError> {
        let sql = format!(
            r#"{CAMPSITE_SELECT}
            JOIN user_campsite_favourites f ON f.campsite_id = c.campsite_id
            WHERE f.user_account_id = $1
            ORDER BY c.campsite_id"#
        );
        let query = sqlx::query(&sql).bind(user_account_id);
        self.fetch_campsites(query, Relations::Load).await
    }

    async fn add_favourite(
        &self,
        user_account_id: i32,
        campsite_id: i32,
    ) -> Result<(), CampsiteError> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_campsite_favourites (user_account_id, campsite_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_account_id)
        .bind(campsite_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Err(CampsiteError::FavouriteExists),
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                Err(CampsiteError::CampsiteNotFound)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_favourite(
        &self,
        user_account_id: i32,
        campsite_id: i32,
    ) -> Result<(), CampsiteError> {
        let done = sqlx::query(
            "DELETE FROM user_campsite_favourites WHERE user_account_id = $1 AND campsite_id = $2",
        )
        .bind(user_account_id)
        .bind(campsite_id)
        .execute(&self.pool)
        .await?;

        if done.rows_affected() == 0 {
            return Err(CampsiteError::FavouriteNotFound);
        }

        Ok(())
    }
}
