use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::rating::average_rating;
use crate::repository::{AccountRepository, CampsiteRepository, Relations, ReviewRepository};
use crate::types::{
    Account, Campsite, CampsiteError, Category, Contact, CreateCampsiteRequest, NewAccount, Photo,
    Review, ReviewChanges, ReviewWithUsername,
};

#[derive(Default)]
struct MemoryState {
    usernames: HashMap<i32, String>,
    categories: BTreeMap<i32, Category>,
    campsites: BTreeMap<i32, Campsite>,
    reviews: BTreeMap<i32, Review>,
    accounts: BTreeMap<i32, Account>,
    favourites: BTreeSet<(i32, i32)>,
    last_category_id: i32,
    last_campsite_id: i32,
    last_photo_id: i32,
    last_contact_id: i32,
    last_review_id: i32,
    last_account_id: i32,
}

impl MemoryState {
    fn username_of(&self, user_account_id: i32) -> Option<String> {
        self.accounts
            .get(&user_account_id)
            .and_then(|account| self.usernames.get(&account.user_id))
            .cloned()
    }

    fn store_average(&mut self, campsite_id: i32) -> Result<f64, CampsiteError> {
        let ratings: Vec<i32> = self
            .reviews
            .values()
            .filter(|review| review.campsite_id == campsite_id)
            .map(|review| review.rating)
            .collect();
        let average = average_rating(&ratings);

        let campsite = self
            .campsites
            .get_mut(&campsite_id)
            .ok_or(CampsiteError::CampsiteNotFound)?;
        campsite.average_rating = average;

        Ok(average)
    }
}

fn with_relations(campsite: &Campsite, relations: Relations) -> Campsite {
    let mut campsite = campsite.clone();
    if relations == Relations::Skip {
        campsite.photos.clear();
        campsite.contacts.clear();
    }
    campsite
}

/// In-process campsite, review and account store for tests and local runs
/// without a database.
///
/// All state sits behind one mutex, so a review mutation and the rating
/// recompute that follows it are never interleaved with another writer.
#[derive(Default)]
pub struct MemoryCampsiteStore {
    inner: Mutex<MemoryState>,
}

impl MemoryCampsiteStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the username of a credential, standing in for the credentials table.
    pub fn add_user(&self, user_id: i32, username: &str) {
        self.state().usernames.insert(user_id, username.to_string());
    }

    /// Adds a category and returns it with its assigned id.
    pub fn add_category(&self, name: &str, img_url: &str) -> Category {
        let mut state = self.state();
        state.last_category_id += 1;
        let category = Category {
            category_id: state.last_category_id,
            category_name: name.to_string(),
            category_img_url: img_url.to_string(),
        };
        state
            .categories
            .insert(category.category_id, category.clone());
        category
    }
}

#[async_trait]
impl CampsiteRepository for MemoryCampsiteStore {
    async fn list_categories(&self) -> Result<Vec<Category>, CampsiteError> {
        Ok(self.state().categories.values().cloned().collect())
    }

    async fn find_category(&self, category_id: i32) -> Result<Option<Category>, CampsiteError> {
        Ok(self.state().categories.get(&category_id).cloned())
    }

    async fn create_campsite(
        &self,
        request: &CreateCampsiteRequest,
    ) -> Result<Campsite, CampsiteError> {
        let mut state = self.state();

        let category = state
            .categories
            .get(&request.category_id)
            .cloned()
            .ok_or(CampsiteError::CategoryNotFound)?;
        if !state.accounts.contains_key(&request.user_account_id) {
            return Err(CampsiteError::CampsiteOwnerNotFound);
        }

        state.last_campsite_id += 1;
        let campsite_id = state.last_campsite_id;

        let mut photos = Vec::with_capacity(request.photos.len());
        for photo in &request.photos {
            state.last_photo_id += 1;
            photos.push(Photo {
                campsite_photo_id: state.last_photo_id,
                campsite_photo_url: photo.campsite_photo_url.clone(),
                campsite_id,
            });
        }

        let mut contacts = Vec::with_capacity(request.contacts.len());
        for contact in &request.contacts {
            state.last_contact_id += 1;
            contacts.push(Contact {
                campsite_contact_id: state.last_contact_id,
                campsite_contact_name: contact.campsite_contact_name.clone(),
                campsite_contact_phone: contact.campsite_contact_phone.clone(),
                campsite_contact_email: contact.campsite_contact_email.clone(),
                campsite_id,
            });
        }

        let campsite = Campsite {
            campsite_id,
            campsite_name: request.campsite_name.clone(),
            campsite_longitude: request.campsite_longitude,
            campsite_latitude: request.campsite_latitude,
            parking_cost: request.parking_cost,
            facilities_cost: request.facilities_cost,
            opening_month: request.opening_month.clone(),
            closing_month: request.closing_month.clone(),
            description: request.description.clone(),
            date_added: chrono::Utc::now().date_naive(),
            approved: false,
            average_rating: 0.0,
            user_account_id: request.user_account_id,
            category,
            photos,
            contacts,
        };
        state.campsites.insert(campsite_id, campsite.clone());

        Ok(campsite)
    }

    async fn list_campsites(
        &self,
        skip: i64,
        limit: i64,
        relations: Relations,
    ) -> Result<Vec<Campsite>, CampsiteError> {
        let skip = usize::try_from(skip).unwrap_or(0);
        let limit = usize::try_from(limit).unwrap_or(0);

        Ok(self
            .state()
            .campsites
            .values()
            .skip(skip)
            .take(limit)
            .map(|campsite| with_relations(campsite, relations))
            .collect())
    }

    async fn find_campsite(
        &self,
        campsite_id: i32,
        relations: Relations,
    ) -> Result<Option<Campsite>, CampsiteError> {
        Ok(self
            .state()
            .campsites
            .get(&campsite_id)
            .map(|campsite| with_relations(campsite, relations)))
    }
}

#[async_trait]
impl ReviewRepository for MemoryCampsiteStore {
    async fn list_reviews(
        &self,
        campsite_id: i32,
    ) -> Result<Vec<ReviewWithUsername>, CampsiteError> {
        let state = self.state();

        Ok(state
            .reviews
            .values()
            .filter(|review| review.campsite_id == campsite_id)
            .filter_map(|review| {
                state
                    .username_of(review.user_account_id)
                    .map(|username| ReviewWithUsername {
                        review: review.clone(),
                        username,
                    })
            })
            .collect())
    }

    async fn find_review(&self, review_id: i32) -> Result<Option<Review>, CampsiteError> {
        Ok(self.state().reviews.get(&review_id).cloned())
    }

    async fn create_review(
        &self,
        campsite_id: i32,
        user_account_id: i32,
        rating: i32,
        comment: Option<&str>,
    ) -> Result<Review, CampsiteError> {
        let mut state = self.state();

        if !state.campsites.contains_key(&campsite_id) {
            return Err(CampsiteError::CampsiteNotFound);
        }
        if !state.accounts.contains_key(&user_account_id) {
            return Err(CampsiteError::ReviewerNotFound);
        }

        state.last_review_id += 1;
        let review = Review {
            review_id: state.last_review_id,
            rating,
            comment: comment.map(str::to_string),
            user_account_id,
            campsite_id,
        };
        state.reviews.insert(review.review_id, review.clone());
        state.store_average(campsite_id)?;

        Ok(review)
    }

    async fn update_review(
        &self,
        review_id: i32,
        changes: &ReviewChanges,
    ) -> Result<Review, CampsiteError> {
        let mut state = self.state();

        let review = state
            .reviews
            .get_mut(&review_id)
            .ok_or(CampsiteError::ReviewNotFound)?;
        if let Some(rating) = changes.rating {
            review.rating = rating;
        }
        if let Some(comment) = &changes.comment {
            review.comment = Some(comment.clone());
        }
        let review = review.clone();

        if changes.rating.is_some() {
            state.store_average(review.campsite_id)?;
        }

        Ok(review)
    }

    async fn delete_review(&self, review_id: i32) -> Result<Review, CampsiteError> {
        let mut state = self.state();

        let review = state
            .reviews
            .remove(&review_id)
            .ok_or(CampsiteError::ReviewNotFound)?;
        state.store_average(review.campsite_id)?;

        Ok(review)
    }

    async fn recompute_rating(&self, campsite_id: i32) -> Result<f64, CampsiteError> {
        self.state().store_average(campsite_id)
    }
}

#[async_trait]
impl AccountRepository for MemoryCampsiteStore {
    async fn find_account_by_user(&self, user_id: i32) -> Result<Option<Account>, CampsiteError> {
        Ok(self
            .state()
            .accounts
            .values()
            .find(|account| account.user_id == user_id)
            .cloned())
    }

    async fn find_username(&self, user_account_id: i32) -> Result<Option<String>, CampsiteError> {
        Ok(self.state().username_of(user_account_id))
    }

    async fn create_account(&self, account: &NewAccount) -> Result<Account, CampsiteError> {
        let mut state = self.state();

        if state.accounts.values().any(|a| a.user_id == account.user_id) {
            return Err(CampsiteError::AccountExists);
        }

        state.last_account_id += 1;
        let created = Account {
            user_account_id: state.last_account_id,
            user_id: account.user_id,
            user_firstname: account.user_firstname.clone(),
            user_lastname: account.user_lastname.clone(),
            user_email: account.user_email.clone(),
            xp: 0,
            user_type: "NORMAL".to_string(),
            camera_permission: account.camera_permission,
        };
        state
            .accounts
            .insert(created.user_account_id, created.clone());

        Ok(created)
    }

    async fn add_xp(&self, user_account_id: i32, delta: i32) -> Result<Account, CampsiteError> {
        let mut state = self.state();

        let account = state
            .accounts
            .get_mut(&user_account_id)
            .ok_or(CampsiteError::AccountNotFound)?;
        account.xp = account
            .xp
            .checked_add(delta)
            .ok_or(CampsiteError::InvalidXp)?;

        Ok(account.clone())
    }

    async fn list_favourites(&self, user_account_id: i32) -> Result<Vec<Campsite>, CampsiteError> {
        let state = self.state();

        Ok(state
            .favourites
            .range((user_account_id, i32::MIN)..=(user_account_id, i32::MAX))
            .filter_map(|(_, campsite_id)| state.campsites.get(campsite_id).cloned())
            .collect())
    }

    async fn add_favourite(
        &self,
        user_account_id: i32,
        campsite_id: i32,
    ) -> Result<(), CampsiteError> {
        let mut state = self.state();

        if !state.campsites.contains_key(&campsite_id) {
            return Err(CampsiteError::CampsiteNotFound);
        }
        if !state.accounts.contains_key(&user_account_id) {
            return Err(CampsiteError::AccountNotFound);
        }
        if !state.favourites.insert((user_account_id, campsite_id)) {
            return Err(CampsiteError::FavouriteExists);
        }

        Ok(())
    }

    async fn remove_favourite(
        &self,
        user_account_id: i32,
        campsite_id: i32,
    ) -> Result<(), CampsiteError> {
        if !self
            .state()
            .favourites
            .remove(&(user_account_id, campsite_id))
        {
            return Err(CampsiteError::FavouriteNotFound);
        }

        Ok(())
    }
}
