use std::sync::Arc;

use validator::Validate;

use crate::repository::{AccountRepository, CampsiteRepository, Relations, ReviewRepository};
use crate::types::{
    Account, Campsite, CampsiteDetailed, CampsiteError, Category, CreateCampsiteRequest,
    CreateReviewRequest, ListCampsitesQuery, NewAccount, ProvisionAccountRequest, Review,
    ReviewChanges, ReviewWithUsername, UpdateReviewRequest,
};

/// Page size used when a listing does not ask for one.
pub const DEFAULT_LIST_LIMIT: i64 = 250;

/// Parses an XP delta taken from a URL segment.
///
/// A leading `-` negates whatever follows it, the rest must be a base-10 integer.
pub fn parse_xp_delta(raw: &str) -> Result<i32, CampsiteError> {
    let parsed = match raw.strip_prefix('-') {
        Some(rest) => rest.parse::<i32>().ok().and_then(i32::checked_neg),
        None => raw.parse::<i32>().ok(),
    };

    parsed.ok_or(CampsiteError::InvalidXp)
}

/// Campsite catalogue operations.
pub struct CampsiteService {
    campsites: Arc<dyn CampsiteRepository>,
    accounts: Arc<dyn AccountRepository>,
}

impl CampsiteService {
    /// Creates a new instance of `CampsiteService`.
    pub fn new(campsites: Arc<dyn CampsiteRepository>, accounts: Arc<dyn AccountRepository>) -> Self {
        Self {
            campsites,
            accounts,
        }
    }

    /// All categories.
    pub async fn categories(&self) -> Result<Vec<Category>, CampsiteError> {
        self.campsites.list_categories().await
    }

    /// Creates a campsite with its photos and contacts.
    pub async fn create(
        &self,
        request: &CreateCampsiteRequest,
    ) -> Result<CampsiteDetailed, CampsiteError> {
        request.validate()?;

        if self
            .campsites
            .find_category(request.category_id)
            .await?
            .is_none()
        {
            return Err(CampsiteError::CategoryNotFound);
        }

        let username = self
            .accounts
            .find_username(request.user_account_id)
            .await?
            .ok_or(CampsiteError::CampsiteOwnerNotFound)?;

        let campsite = self.campsites.create_campsite(request).await?;

        log::info!(
            "🏕️ Campsite {} ({}) added by {}",
            campsite.campsite_id,
            campsite.campsite_name,
            username
        );

        Ok(CampsiteDetailed { campsite, username })
    }

    /// A page of campsites with their relations loaded.
    pub async fn list(&self, query: &ListCampsitesQuery) -> Result<Vec<Campsite>, CampsiteError> {
        let skip = query.skip.unwrap_or(0).max(0);
        let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).max(0);

        self.campsites
            .list_campsites(skip, limit, Relations::Load)
            .await
    }

    /// A single campsite with relations and the poster's username.
    pub async fn get(&self, campsite_id: i32) -> Result<CampsiteDetailed, CampsiteError> {
        let campsite = self
            .campsites
            .find_campsite(campsite_id, Relations::Load)
            .await?
            .ok_or(CampsiteError::CampsiteNotFound)?;

        let username = self
            .accounts
            .find_username(campsite.user_account_id)
            .await?
            .ok_or(CampsiteError::CampsiteNotFound)?;

        Ok(CampsiteDetailed { campsite, username })
    }
}

/// Review operations. Each mutation leaves the campsite's average rating
/// consistent with its reviews.
pub struct ReviewService {
    reviews: Arc<dyn ReviewRepository>,
    campsites: Arc<dyn CampsiteRepository>,
    accounts: Arc<dyn AccountRepository>,
}

impl ReviewService {
    /// Creates a new instance of `ReviewService`.
    pub fn new(
        reviews: Arc<dyn ReviewRepository>,
        campsites: Arc<dyn CampsiteRepository>,
        accounts: Arc<dyn AccountRepository>,
    ) -> Self {
        Self {
            reviews,
            campsites,
            accounts,
        }
    }

    /// Reviews of a campsite; empty for unknown campsites.
    pub async fn list(&self, campsite_id: i32) -> Result<Vec<ReviewWithUsername>, CampsiteError> {
        self.reviews.list_reviews(campsite_id).await
    }

    /// Posts a review and refreshes the campsite's average rating.
    pub async fn create(
        &self,
        campsite_id: i32,
        request: &CreateReviewRequest,
    ) -> Result<ReviewWithUsername, CampsiteError> {
        request.validate()?;

        if self
            .campsites
            .find_campsite(campsite_id, Relations::Skip)
            .await?
            .is_none()
        {
            return Err(CampsiteError::CampsiteNotFound);
        }

        let username = self
            .accounts
            .find_username(request.user_account_id)
            .await?
            .ok_or(CampsiteError::ReviewerNotFound)?;

        let review = self
            .reviews
            .create_review(
                campsite_id,
                request.user_account_id,
                request.rating,
                request.comment.as_deref(),
            )
            .await?;

        log::info!(
            "⭐ Review {} ({}/5) posted on campsite {} by {}",
            review.review_id,
            review.rating,
            campsite_id,
            username
        );

        Ok(ReviewWithUsername { review, username })
    }

    /// Updates a review's rating and/or comment.
    ///
    /// The review is looked up before the campsite in the path, and the
    /// rating recompute targets the review's own campsite.
    pub async fn update(
        &self,
        campsite_id: i32,
        review_id: i32,
        request: &UpdateReviewRequest,
    ) -> Result<Review, CampsiteError> {
        request.validate()?;

        if self.reviews.find_review(review_id).await?.is_none() {
            return Err(CampsiteError::ReviewNotFound);
        }
        if self
            .campsites
            .find_campsite(campsite_id, Relations::Skip)
            .await?
            .is_none()
        {
            return Err(CampsiteError::CampsiteNotFound);
        }

        let changes = ReviewChanges {
            rating: request.rating,
            comment: request.comment.clone().filter(|c| !c.is_empty()),
        };

        self.reviews.update_review(review_id, &changes).await
    }

    /// Deletes a review by id and refreshes its campsite's average rating.
    pub async fn delete(&self, review_id: i32) -> Result<(), CampsiteError> {
        let review = self.reviews.delete_review(review_id).await?;

        log::info!(
            "🗑️ Review {} removed from campsite {}",
            review.review_id,
            review.campsite_id
        );
        Ok(())
    }

    /// Recomputes a campsite's average rating from its current reviews.
    pub async fn recompute(&self, campsite_id: i32) -> Result<f64, CampsiteError> {
        self.reviews.recompute_rating(campsite_id).await
    }
}

/// Account, XP and favourites operations, addressed by credential id.
pub struct AccountService {
    accounts: Arc<dyn AccountRepository>,
    campsites: Arc<dyn CampsiteRepository>,
}

impl AccountService {
    /// Creates a new instance of `AccountService`.
    pub fn new(accounts: Arc<dyn AccountRepository>, campsites: Arc<dyn CampsiteRepository>) -> Self {
        Self {
            accounts,
            campsites,
        }
    }

    /// The account of a credential.
    pub async fn get(&self, user_id: i32) -> Result<Account, CampsiteError> {
        self.accounts
            .find_account_by_user(user_id)
            .await?
            .ok_or(CampsiteError::AccountNotFound)
    }

    /// Creates the account of a credential, filling missing profile fields
    /// with a placeholder.
    pub async fn provision(
        &self,
        user_id: i32,
        request: ProvisionAccountRequest,
    ) -> Result<Account, CampsiteError> {
        request.validate()?;

        let account = self
            .accounts
            .create_account(&NewAccount::from_request(user_id, request))
            .await?;

        log::info!(
            "👤 Account {} provisioned for user {}",
            account.user_account_id,
            user_id
        );
        Ok(account)
    }

    /// Applies an XP delta given as a signed integer string.
    ///
    /// The account is resolved before the delta is parsed.
    pub async fn add_xp(&self, user_id: i32, raw_delta: &str) -> Result<Account, CampsiteError> {
        let account = self.get(user_id).await?;
        let delta = parse_xp_delta(raw_delta)?;

        self.accounts.add_xp(account.user_account_id, delta).await
    }

    /// Favourite campsites of a credential's account.
    pub async fn favourites(&self, user_id: i32) -> Result<Vec<Campsite>, CampsiteError> {
        let account = self.get(user_id).await?;
        self.accounts.list_favourites(account.user_account_id).await
    }

    /// Adds a campsite to the favourites.
    pub async fn add_favourite(&self, user_id: i32, campsite_id: i32) -> Result<(), CampsiteError> {
        let account = self.get(user_id).await?;
        self.require_campsite(campsite_id).await?;

        self.accounts
            .add_favourite(account.user_account_id, campsite_id)
            .await
    }

    /// Removes a campsite from the favourites.
    pub async fn remove_favourite(
        &self,
        user_id: i32,
        campsite_id: i32,
    ) -> Result<(), CampsiteError> {
        let account = self.get(user_id).await?;
        self.require_campsite(campsite_id).await?;

        self.accounts
            .remove_favourite(account.user_account_id, campsite_id)
            .await
    }

    async fn require_campsite(&self, campsite_id: i32) -> Result<(), CampsiteError> {
        match self
            .campsites
            .find_campsite(campsite_id, Relations::Skip)
            .await?
        {
            Some(_) => Ok(()),
            None => Err(CampsiteError::CampsiteNotFound),
        }
    }
}

/// The three services wired over one store.
pub struct Services {
    /// Campsite catalogue
    pub campsites: CampsiteService,
    /// Reviews and ratings
    pub reviews: ReviewService,
    /// Accounts and favourites
    pub accounts: AccountService,
}

impl Services {
    /// Builds every service on top of a store that implements all repositories.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: CampsiteRepository + ReviewRepository + AccountRepository + 'static,
    {
        Self {
            campsites: CampsiteService::new(store.clone(), store.clone()),
            reviews: ReviewService::new(store.clone(), store.clone(), store.clone()),
            accounts: AccountService::new(store.clone(), store),
        }
    }
}
