use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Campsite category (reference data)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    /// Unique identifier for the category
    pub category_id: i32,
    /// Display name of the category
    pub category_name: String,
    /// Image shown for the category
    pub category_img_url: String,
}

/// Photo attached to a campsite
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Photo {
    /// Unique identifier for the photo
    pub campsite_photo_id: i32,
    /// Location of the photo
    pub campsite_photo_url: String,
    /// Campsite the photo belongs to
    pub campsite_id: i32,
}

/// Contact details attached to a campsite
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Contact {
    /// Unique identifier for the contact
    pub campsite_contact_id: i32,
    /// Contact name
    pub campsite_contact_name: String,
    /// Contact phone number
    pub campsite_contact_phone: String,
    /// Contact email, if any
    pub campsite_contact_email: Option<String>,
    /// Campsite the contact belongs to
    pub campsite_id: i32,
}

/// Campsite with its category and, when loaded, photos and contacts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Campsite {
    /// Unique identifier for the campsite
    pub campsite_id: i32,
    /// Name of the campsite
    pub campsite_name: String,
    /// Longitude in degrees
    pub campsite_longitude: f64,
    /// Latitude in degrees
    pub campsite_latitude: f64,
    /// Parking cost, if known
    pub parking_cost: Option<f64>,
    /// Facilities cost, if known
    pub facilities_cost: Option<f64>,
    /// Month the campsite opens
    pub opening_month: Option<String>,
    /// Month the campsite closes
    pub closing_month: Option<String>,
    /// Free-text description
    pub description: Option<String>,
    /// Date the campsite was added
    pub date_added: NaiveDate,
    /// Whether the campsite has been approved
    pub approved: bool,
    /// Mean rating of the campsite's reviews, 0.0 without reviews
    pub average_rating: f64,
    /// Account that posted the campsite
    pub user_account_id: i32,
    /// Category of the campsite
    pub category: Category,
    /// Photos, empty unless relations were loaded
    pub photos: Vec<Photo>,
    /// Contacts, empty unless relations were loaded
    pub contacts: Vec<Contact>,
}

/// Campsite together with the username of the account that posted it
#[derive(Debug, Clone, Serialize)]
pub struct CampsiteDetailed {
    /// The campsite itself
    #[serde(flatten)]
    pub campsite: Campsite,
    /// Username of the posting account
    pub username: String,
}

/// Review of a campsite
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Review {
    /// Unique identifier for the review
    pub review_id: i32,
    /// Rating between 1 and 5
    pub rating: i32,
    /// Optional comment
    pub comment: Option<String>,
    /// Account that wrote the review
    pub user_account_id: i32,
    /// Campsite under review
    pub campsite_id: i32,
}

/// Review together with its author's username
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewWithUsername {
    /// The review itself
    #[serde(flatten)]
    pub review: Review,
    /// Username of the author
    pub username: String,
}

/// Profile attached to a credential
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Account {
    /// Unique identifier for the account
    pub user_account_id: i32,
    /// Credential the account belongs to
    pub user_id: i32,
    /// First name
    pub user_firstname: String,
    /// Last name
    pub user_lastname: String,
    /// Email address
    pub user_email: String,
    /// Experience points
    pub xp: i32,
    /// Account type, `NORMAL` by default
    pub user_type: String,
    /// Whether the user allowed camera access
    pub camera_permission: bool,
}

/// Photo supplied when creating a campsite
#[derive(Debug, Deserialize, Validate)]
pub struct NewPhoto {
    /// Location of the photo
    #[validate(length(min = 1, message = "should have at least 1 character"))]
    pub campsite_photo_url: String,
}

/// Contact supplied when creating a campsite
#[derive(Debug, Deserialize, Validate)]
pub struct NewContact {
    /// Contact name
    #[validate(length(min = 1, message = "should have at least 1 character"))]
    pub campsite_contact_name: String,
    /// Contact phone number
    #[validate(length(min = 1, message = "should have at least 1 character"))]
    pub campsite_contact_phone: String,
    /// Contact email
    #[validate(email(message = "should be a valid email address"))]
    pub campsite_contact_email: Option<String>,
}

/// Request structure for creating a campsite
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCampsiteRequest {
    /// Account posting the campsite
    pub user_account_id: i32,

    /// Name of the campsite
    #[validate(length(min = 1, max = 255, message = "should have between 1 and 255 characters"))]
    pub campsite_name: String,

    /// Longitude in degrees
    #[validate(range(min = -180.0, max = 180.0, message = "should be between -180 and 180"))]
    pub campsite_longitude: f64,

    /// Latitude in degrees
    #[validate(range(min = -90.0, max = 90.0, message = "should be between -90 and 90"))]
    pub campsite_latitude: f64,

    /// Category of the campsite
    pub category_id: i32,

    /// Parking cost
    #[validate(range(min = 0.0, message = "should be greater than or equal to 0"))]
    pub parking_cost: Option<f64>,

    /// Facilities cost
    #[validate(range(min = 0.0, message = "should be greater than or equal to 0"))]
    pub facilities_cost: Option<f64>,

    /// Month the campsite opens
    pub opening_month: Option<String>,

    /// Month the campsite closes
    pub closing_month: Option<String>,

    /// Free-text description
    pub description: Option<String>,

    /// Photos to attach
    #[serde(default)]
    #[validate(nested)]
    pub photos: Vec<NewPhoto>,

    /// Contacts to attach
    #[serde(default)]
    #[validate(nested)]
    pub contacts: Vec<NewContact>,
}

impl CreateCampsiteRequest {
    /// Field names in declaration order, used to order validation messages.
    pub const FIELDS: &'static [&'static str] = &[
        "user_account_id",
        "campsite_name",
        "campsite_longitude",
        "campsite_latitude",
        "category_id",
        "parking_cost",
        "facilities_cost",
        "opening_month",
        "closing_month",
        "description",
        "photos",
        "contacts",
    ];
}

/// Query parameters for listing campsites
#[derive(Debug, Default, Deserialize)]
pub struct ListCampsitesQuery {
    /// Number of campsites to skip
    pub skip: Option<i64>,
    /// Maximum number of campsites to return
    pub limit: Option<i64>,
}

/// Request structure for posting a review
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    /// Rating between 1 and 5
    #[validate(range(min = 1, max = 5, message = "should be between 1 and 5"))]
    pub rating: i32,

    /// Account writing the review
    pub user_account_id: i32,

    /// Optional comment
    #[validate(length(max = 350, message = "should have at most 350 characters"))]
    pub comment: Option<String>,
}

impl CreateReviewRequest {
    /// Field names in declaration order, used to order validation messages.
    pub const FIELDS: &'static [&'static str] = &["rating", "user_account_id", "comment"];
}

/// Request structure for updating a review
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    /// New rating
    #[validate(range(min = 1, max = 5, message = "should be between 1 and 5"))]
    pub rating: Option<i32>,

    /// New comment; an empty comment leaves the old one in place
    #[validate(length(max = 350, message = "should have at most 350 characters"))]
    pub comment: Option<String>,
}

impl UpdateReviewRequest {
    /// Field names in declaration order, used to order validation messages.
    pub const FIELDS: &'static [&'static str] = &["rating", "comment"];
}

/// Changes applied to a stored review
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReviewChanges {
    /// Replacement rating
    pub rating: Option<i32>,
    /// Replacement comment
    pub comment: Option<String>,
}

/// Request structure for provisioning the caller's account
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ProvisionAccountRequest {
    /// First name
    #[validate(length(max = 100, message = "should have at most 100 characters"))]
    pub user_firstname: Option<String>,

    /// Last name
    #[validate(length(max = 100, message = "should have at most 100 characters"))]
    pub user_lastname: Option<String>,

    /// Email address
    #[validate(email(message = "should be a valid email address"))]
    pub user_email: Option<String>,

    /// Whether the user allowed camera access
    pub camera_permission: Option<bool>,
}

impl ProvisionAccountRequest {
    /// Field names in declaration order, used to order validation messages.
    pub const FIELDS: &'static [&'static str] = &[
        "user_firstname",
        "user_lastname",
        "user_email",
        "camera_permission",
    ];
}

/// Account row to insert, with defaults already applied
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    /// Credential the account belongs to
    pub user_id: i32,
    /// First name
    pub user_firstname: String,
    /// Last name
    pub user_lastname: String,
    /// Email address
    pub user_email: String,
    /// Whether the user allowed camera access
    pub camera_permission: bool,
}

impl NewAccount {
    /// Placeholder stored for profile fields the user left out.
    pub const PLACEHOLDER: &'static str = "n/a";

    /// Builds the row for `user_id` from a provisioning request.
    pub fn from_request(user_id: i32, request: ProvisionAccountRequest) -> Self {
        let or_placeholder =
            |value: Option<String>| value.unwrap_or_else(|| Self::PLACEHOLDER.to_string());

        Self {
            user_id,
            user_firstname: or_placeholder(request.user_firstname),
            user_lastname: or_placeholder(request.user_lastname),
            user_email: or_placeholder(request.user_email),
            camera_permission: request.camera_permission.unwrap_or(false),
        }
    }
}

/// Custom error type for campsite, review and account operations
#[derive(thiserror::Error, Debug)]
pub enum CampsiteError {
    /// Campsite not found
    #[error("404 - Campsite Not Found!")]
    CampsiteNotFound,

    /// Review not found
    #[error("404 - Review Not Found!")]
    ReviewNotFound,

    /// No account for the given user
    #[error("404 - User Account Not Found!")]
    AccountNotFound,

    /// The category referenced by a new campsite does not exist
    #[error("Category ID does not exist!")]
    CategoryNotFound,

    /// The account posting a campsite has no username
    #[error("Username not found for this campsite.")]
    CampsiteOwnerNotFound,

    /// The account writing a review has no username
    #[error("Username not found for this review.")]
    ReviewerNotFound,

    /// The user already has an account
    #[error("Account already exists.")]
    AccountExists,

    /// The campsite is already one of the user's favourites
    #[error("Campsite already in favourites.")]
    FavouriteExists,

    /// The campsite is not one of the user's favourites
    #[error("404 - Campsite Not Found In User's Favourites!")]
    FavouriteNotFound,

    /// The XP delta is not an integer or overflows the running total
    #[error("400 - Invalid XP Value")]
    InvalidXp,

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
