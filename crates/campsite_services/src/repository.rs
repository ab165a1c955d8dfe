use async_trait::async_trait;

use crate::types::{
    Account, Campsite, CampsiteError, Category, CreateCampsiteRequest, NewAccount, Review,
    ReviewChanges, ReviewWithUsername,
};

/// Whether a campsite fetch also loads its photos and contacts.
///
/// The category is always joined in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relations {
    /// Load photos and contacts
    Load,
    /// Leave photos and contacts empty
    Skip,
}

/// Access to campsites and their reference data.
#[async_trait]
pub trait CampsiteRepository: Send + Sync {
    /// All categories, ordered by id.
    async fn list_categories(&self) -> Result<Vec<Category>, CampsiteError>;

    /// Looks up a single category.
    async fn find_category(&self, category_id: i32) -> Result<Option<Category>, CampsiteError>;

    /// Inserts a campsite together with its photos and contacts.
    async fn create_campsite(
        &self,
        request: &CreateCampsiteRequest,
    ) -> Result<Campsite, CampsiteError>;

    /// Campsites ordered by id.
    async fn list_campsites(
        &self,
        skip: i64,
        limit: i64,
        relations: Relations,
    ) -> Result<Vec<Campsite>, CampsiteError>;

    /// Looks up a single campsite.
    async fn find_campsite(
        &self,
        campsite_id: i32,
        relations: Relations,
    ) -> Result<Option<Campsite>, CampsiteError>;
}

/// Access to reviews. Every mutation recomputes the average rating of the
/// affected campsite before it becomes visible.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Reviews of a campsite with their authors' usernames, ordered by id.
    async fn list_reviews(&self, campsite_id: i32)
    -> Result<Vec<ReviewWithUsername>, CampsiteError>;

    /// Looks up a single review.
    async fn find_review(&self, review_id: i32) -> Result<Option<Review>, CampsiteError>;

    /// Adds a review. Fails with [`CampsiteError::CampsiteNotFound`] when the
    /// campsite is gone.
    async fn create_review(
        &self,
        campsite_id: i32,
        user_account_id: i32,
        rating: i32,
        comment: Option<&str>,
    ) -> Result<Review, CampsiteError>;

    /// Applies `changes` to a review. Fails with [`CampsiteError::ReviewNotFound`].
    async fn update_review(
        &self,
        review_id: i32,
        changes: &ReviewChanges,
    ) -> Result<Review, CampsiteError>;

    /// Removes a review and returns it. Fails with [`CampsiteError::ReviewNotFound`].
    async fn delete_review(&self, review_id: i32) -> Result<Review, CampsiteError>;

    /// Recomputes and stores the average rating of a campsite.
    async fn recompute_rating(&self, campsite_id: i32) -> Result<f64, CampsiteError>;
}

/// Access to user accounts and their favourites.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// The account belonging to a credential.
    async fn find_account_by_user(&self, user_id: i32) -> Result<Option<Account>, CampsiteError>;

    /// Username of the credential behind an account.
    async fn find_username(&self, user_account_id: i32) -> Result<Option<String>, CampsiteError>;

    /// Creates the account of a credential. Fails with
    /// [`CampsiteError::AccountExists`] when one is already there.
    async fn create_account(&self, account: &NewAccount) -> Result<Account, CampsiteError>;

    /// Adds a signed delta to an account's XP.
    async fn add_xp(&self, user_account_id: i32, delta: i32) -> Result<Account, CampsiteError>;

    /// Favourite campsites of an account, with relations loaded.
    async fn list_favourites(&self, user_account_id: i32) -> Result<Vec<Campsite>, CampsiteError>;

    /// Marks a campsite as favourite. Fails with [`CampsiteError::FavouriteExists`].
    async fn add_favourite(
        &self,
        user_account_id: i32,
        campsite_id: i32,
    ) -> Result<(), CampsiteError>;

    /// Unmarks a favourite. Fails with [`CampsiteError::FavouriteNotFound`].
    async fn remove_favourite(
        &self,
        user_account_id: i32,
        campsite_id: i32,
    ) -> Result<(), CampsiteError>;
}
